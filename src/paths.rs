//! Lexical path helpers shared by resolution and rewriting.

use std::path::{Component, Path, PathBuf};

/// Make a path absolute against the current directory and collapse `.`/`..`
/// without touching the filesystem (the path may not exist yet).
///
/// # Errors
///
/// Returns `Error::Io` if the current directory cannot be determined.
pub fn absolutize(path: &Path) -> Result<PathBuf, crate::error::Error> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    return Ok(normalize_path(&joined));
}

/// Whether a file name ends in `.md` or `.mdx`, case-insensitively.
pub fn has_doc_extension(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|e| return e.eq_ignore_ascii_case("mdx") || e.eq_ignore_ascii_case("md"));
}

/// Whether a link target (no fragment) names an `.md`/`.mdx` file.
pub fn is_doc_target(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    return lower.ends_with(".mdx") || lower.ends_with(".md");
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            let can_pop = matches!(
                components.last(),
                Some(c) if matches!(c, Component::Normal(_))
            );
            if can_pop {
                components.pop();
            } else if !matches!(components.last(), Some(Component::RootDir | Component::Prefix(_))) {
                components.push(component);
            }
        },
        other => components.push(other),
    }
}

/// Relative path from directory `from_dir` to `to`, both absolute and normalized.
/// Uses forward slashes regardless of platform.
pub fn relative_path(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let target: Vec<Component<'_>> = to.components().collect();
    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| return a == b)
        .count();

    let ups = from.len().saturating_sub(common);
    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), ups).collect();
    parts.extend(
        target
            .iter()
            .skip(common)
            .map(|c| return c.as_os_str().to_string_lossy().into_owned()),
    );
    return parts.join("/");
}

/// Render a relative path with forward slashes.
pub fn to_slash(path: &Path) -> String {
    return path
        .components()
        .map(|c| return c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_parent_components() {
        assert_eq!(normalize_path(Path::new("/a/b/../c/./d.mdx")), PathBuf::from("/a/c/d.mdx"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn relative_path_between_siblings_and_cousins() {
        assert_eq!(relative_path(Path::new("/r/a"), Path::new("/r/a/x.mdx")), "x.mdx");
        assert_eq!(relative_path(Path::new("/r/a/b"), Path::new("/r/c/x.mdx")), "../../c/x.mdx");
    }

    #[test]
    fn doc_extensions_are_case_insensitive() {
        assert!(has_doc_extension(Path::new("A.MDX")));
        assert!(has_doc_extension(Path::new("a.md")));
        assert!(!has_doc_extension(Path::new("a.json")));
        assert!(is_doc_target("./Quick%20Start.mdx"));
        assert!(!is_doc_target("./image.png"));
    }
}
