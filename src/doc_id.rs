//! Document ids: the canonical path-derived identifier used by routes and sidebars.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::paths;

/// Highest ordering prefix (`99-`) editors put in front of file and directory names.
pub const MAX_ORDER_PREFIX: u8 = 99;

/// Bounded sequence of on-disk names an id may be stored under (without extension).
///
/// Yields the id itself, then the last segment prefixed `01-`..`99-`, then each
/// earlier segment prefixed the same way, one segment at a time.
#[derive(Debug, Clone)]
pub struct Candidates {
    /// Prefix counter for the segment currently being varied.
    next_prefix: u8,
    /// Order in which segment positions get prefixed.
    order: Vec<usize>,
    /// Index into `order`.
    position: usize,
    segments: Vec<String>,
    /// Whether the unprefixed id has been yielded.
    started: bool,
}

impl Iterator for Candidates {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            return Some(self.segments.join("/"));
        }

        loop {
            let segment_index = *self.order.get(self.position)?;
            if self.next_prefix > MAX_ORDER_PREFIX {
                self.position = self.position.saturating_add(1);
                self.next_prefix = 1;
                continue;
            }
            let prefix = self.next_prefix;
            self.next_prefix = self.next_prefix.saturating_add(1);

            let mut parts = self.segments.clone();
            if let Some(part) = parts.get_mut(segment_index) {
                *part = format!("{prefix:02}-{part}");
            }
            return Some(parts.join("/"));
        }
    }
}

/// Id → file map for one instance directory, built once per run.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    by_id: HashMap<String, PathBuf>,
}

impl IdIndex {
    /// Walk `dir` and index every `.md`/`.mdx` file by its document id.
    /// Files are visited in name order, so the first file claiming an id keeps it.
    pub fn build(dir: &Path, config: &Config) -> Self {
        let mut by_id = HashMap::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| return e.depth() == 0 || !e.file_type().is_dir() || !skipped(e, config))
            .filter_map(Result::ok)
            .filter(|e| return e.file_type().is_file() && paths::has_doc_extension(e.path()));

        for entry in walker {
            if let Some(id) = id_of(dir, entry.path()) {
                by_id.entry(id).or_insert_with(|| return entry.path().to_path_buf());
            }
        }
        tracing::debug!(dir = %dir.display(), documents = by_id.len(), "indexed instance");
        return Self { by_id };
    }

    /// File whose id is `doc_id`.
    pub fn get(&self, doc_id: &str) -> Option<&Path> {
        return self.by_id.get(doc_id).map(PathBuf::as_path);
    }
}

/// Whether a walked directory is on the config's skip list.
fn skipped(entry: &walkdir::DirEntry, config: &Config) -> bool {
    return entry.file_name().to_str().is_some_and(|n| return config.skips_dir(n));
}

/// Candidate on-disk names for `doc_id`, tried in order by the resolver.
pub fn candidate_filenames(doc_id: &str) -> Candidates {
    let segments: Vec<String> = doc_id.split('/').filter(|s| return !s.is_empty()).map(String::from).collect();
    let mut order = Vec::with_capacity(segments.len());
    if let Some(last) = segments.len().checked_sub(1) {
        order.push(last);
        order.extend(0..last);
    }
    return Candidates { next_prefix: 1, order, position: 0, segments, started: false };
}

/// Canonical form of an id written in a link or sidebar: every segment passed
/// through the same rules as file names, without an extension to strip.
pub fn canonical_id(doc_id: &str) -> String {
    return doc_id
        .replace('\\', "/")
        .split('/')
        .filter(|s| return !s.is_empty())
        .map(segment_id)
        .collect::<Vec<_>>()
        .join("/");
}

/// Document id of `file` inside instance directory `dir`.
pub fn id_of(dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(dir).ok()?;
    return Some(to_id(&paths::to_slash(relative)));
}

/// Normalize an id as written in a route: lowercase, `%20`/spaces to hyphens,
/// backslashes to slashes, and a trailing `.mdx`/`.md`/`.html` removed.
pub fn normalize_link_id(raw: &str) -> String {
    let lowered = raw.to_lowercase().replace("%20", "-").replace(' ', "-").replace('\\', "/");
    for ext in [".mdx", ".md", ".html"] {
        if let Some(stripped) = lowered.strip_suffix(ext) {
            return stripped.trim_matches('/').to_string();
        }
    }
    return lowered.trim_matches('/').to_string();
}

/// Apply the id rules to a single path segment.
fn segment_id(segment: &str) -> String {
    let replaced = segment.to_lowercase().replace("%20", "-").replace([' ', '_'], "-");
    return strip_order_prefix(&replaced).to_string();
}

/// Remove a trailing `.md`/`.mdx`, case-insensitively.
fn strip_doc_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    for ext in [".mdx", ".md"] {
        if lower.ends_with(ext) {
            let end = name.len().saturating_sub(ext.len());
            return name.get(..end).unwrap_or(name);
        }
    }
    return name;
}

/// Drop a leading `NN-` ordering prefix unless nothing would remain.
fn strip_order_prefix(segment: &str) -> &str {
    let digits = segment.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return segment;
    }
    let rest = segment.get(digits..).and_then(|r| return r.strip_prefix('-'));
    return match rest {
        Some(r) if !r.is_empty() => r,
        _ => segment,
    };
}

/// Forward transform from a path relative to its instance directory to a document id.
pub fn to_id(relative_file_path: &str) -> String {
    let normalized = relative_file_path.replace('\\', "/");
    let segments: Vec<&str> = normalized.split('/').filter(|s| return !s.is_empty()).collect();
    let last = segments.len().saturating_sub(1);

    return segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i == last {
                return segment_id(strip_doc_extension(s));
            }
            return segment_id(s);
        })
        .collect::<Vec<_>>()
        .join("/");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transform() {
        assert_eq!(to_id("Quick Start.mdx"), "quick-start");
        assert_eq!(to_id("API reference/Update_Agent Instance.MDX"), "api-reference/update-agent-instance");
        assert_eq!(to_id("01-Guide/02-Install%20SDK.md"), "guide/install-sdk");
        assert_eq!(to_id("docs\\Intro.mdx"), "docs/intro");
    }

    #[test]
    fn ids_have_no_uppercase_spaces_or_underscores() {
        for name in ["A B_C.mdx", "Über Cool.mdx", "X_Y/Z Z.md", "99-Final Notes.mdx", "___.mdx"] {
            let id = to_id(name);
            assert!(!id.chars().any(|c| c.is_ascii_uppercase()), "{id}");
            assert!(!id.contains(' ') && !id.contains('_'), "{id}");
        }
    }

    #[test]
    fn order_prefix_needs_a_remainder() {
        assert_eq!(to_id("01-.mdx"), "01-");
        assert_eq!(to_id("2024-release-notes.mdx"), "release-notes");
        assert_eq!(to_id("v2-notes.mdx"), "v2-notes");
    }

    #[test]
    fn candidates_are_bounded_and_ordered() {
        let all: Vec<String> = candidate_filenames("guide/install").collect();
        assert_eq!(all.len(), 1 + 2 * usize::from(MAX_ORDER_PREFIX));
        assert_eq!(all.first().map(String::as_str), Some("guide/install"));
        assert_eq!(all.get(1).map(String::as_str), Some("guide/01-install"));
        assert_eq!(all.get(99).map(String::as_str), Some("guide/99-install"));
        assert_eq!(all.get(100).map(String::as_str), Some("01-guide/install"));
        assert_eq!(all.last().map(String::as_str), Some("99-guide/install"));
    }

    #[test]
    fn candidates_of_single_segment() {
        let all: Vec<String> = candidate_filenames("intro").collect();
        assert_eq!(all.len(), 100);
        assert_eq!(all.get(5).map(String::as_str), Some("05-intro"));
    }

    #[test]
    fn link_ids_are_normalized() {
        assert_eq!(normalize_link_id("Quick%20Start.html"), "quick-start");
        assert_eq!(normalize_link_id("faq/Connect.mdx"), "faq/connect");
        assert_eq!(canonical_id("01-guide/Quick Start"), "guide/quick-start");
    }

    #[test]
    fn index_maps_ids_to_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("01-Guide")).unwrap();
        std::fs::write(dir.path().join("01-Guide/Quick Start.mdx"), "# Hi").unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("node_modules/skip.mdx"), "").unwrap();

        let index = IdIndex::build(dir.path(), &Config::default());
        assert_eq!(index.get("guide/quick-start"), Some(dir.path().join("01-Guide/Quick Start.mdx").as_path()));
        assert!(index.get("node_modules/skip").is_none());
    }
}
