//! Document discovery and reference extraction from Markdown and MDX text.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use walkdir::WalkDir;

use crate::classify::classify;
use crate::config::Config;
use crate::fence::FenceTracker;
use crate::paths;
use crate::types::{Construct, Reference};

/// Bare `http(s)://` URL in prose.
#[allow(clippy::expect_used, reason = "hardcoded regex is a compile-time invariant")]
static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"https?://[^\s'"<>()\[\]]+"#).expect("valid regex");
});

/// `href` attribute of an `<a>` tag.
#[allow(clippy::expect_used, reason = "hardcoded regex is a compile-time invariant")]
static HTML_HREF: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"<a\s[^>]*?\bhref\s*=\s*["']([^"']+)["'][^>]*>"#).expect("valid regex");
});

/// `import X from '...'`, `import { X } from "..."`, `import X, { Y } from '...'`.
#[allow(clippy::expect_used, reason = "hardcoded regex is a compile-time invariant")]
static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"\bimport\s+(?:\{[^}]*\}|[\w$]+(?:\s*,\s*\{[^}]*\})?)\s+from\s+['"]([^'"]+)['"]"#)
        .expect("valid regex");
});

/// `[text](target)` or `![alt](src)`; group 1 is the image marker.
/// Link text may hold one level of `![alt](src)`, so a linked image yields its
/// outer target. Deeper bracket nesting is not matched.
#[allow(clippy::expect_used, reason = "hardcoded regex is a compile-time invariant")]
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(!?)\[(?:[^\[\]]|!\[[^\]]*\]\([^)]*\))*\]\(([^)]*)\)").expect("valid regex");
});

/// Walk `dir` for `.md`/`.mdx` documents that the config allows, in name order.
/// Paths are filtered by their location relative to `root`.
pub fn documents(dir: &Path, root: &Path, config: &Config) -> Vec<PathBuf> {
    return WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            return e.depth() == 0
                || !e.file_type().is_dir()
                || !e.file_name().to_str().is_some_and(|n| return config.skips_dir(n));
        })
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && paths::has_doc_extension(e.path()))
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            let relative = p.strip_prefix(root).unwrap_or(p);
            return config.should_scan(&paths::to_slash(relative));
        })
        .collect();
}

/// Extract every reference in a document, skipping fenced code blocks.
pub fn extract_references(content: &str, source: &Path) -> Vec<Reference> {
    let mut references = Vec::new();
    let mut fences = FenceTracker::default();

    for (index, line) in content.lines().enumerate() {
        if fences.is_code(line) {
            continue;
        }
        let line_number = u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX);
        extract_references_from_line(line, line_number, source, &mut references);
    }
    return references;
}

/// Extract references from a single line. Bare URLs already covered by a
/// Markdown link or `<a>` tag are not reported twice.
fn extract_references_from_line(line: &str, line_number: u32, source: &Path, out: &mut Vec<Reference>) {
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut push = |raw: &str, column: usize, construct: Construct| {
        out.push(Reference {
            column,
            construct,
            kind: classify(raw, construct),
            line: line_number,
            line_content: line.trim().to_string(),
            raw: raw.to_string(),
            source: source.to_path_buf(),
        });
    };

    for cap in MARKDOWN_LINK.captures_iter(line) {
        if let Some(whole) = cap.get(0) {
            claimed.push(whole.range());
        }
        if let Some((raw, column)) = markdown_link_target(&cap) {
            push(raw, column, Construct::MarkdownLink);
        }
    }

    for cap in HTML_HREF.captures_iter(line) {
        if let Some(whole) = cap.get(0) {
            claimed.push(whole.range());
        }
        if let Some(href) = cap.get(1) {
            push(href.as_str(), href.start(), Construct::HtmlAnchor);
        }
    }

    for m in BARE_URL.find_iter(line) {
        let overlaps = claimed.iter().any(|r| return r.start < m.end() && m.start() < r.end);
        if overlaps {
            continue;
        }
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        push(url, m.start(), Construct::BareUrl);
    }

    for cap in IMPORT.captures_iter(line) {
        if let Some(path) = cap.get(1) {
            push(path.as_str(), path.start(), Construct::Import);
        }
    }
}

/// Target token of a Markdown link capture and its byte column.
/// Images, empty targets, and the optional `"title"` part are dropped.
fn markdown_link_target<'l>(cap: &Captures<'l>) -> Option<(&'l str, usize)> {
    if cap.get(1).is_some_and(|m| return !m.as_str().is_empty()) {
        return None;
    }
    let inner = cap.get(2)?;
    let text = inner.as_str();
    let trimmed = text.trim_start();
    let start = inner.start().saturating_add(text.len().saturating_sub(trimmed.len()));

    // `<...>` destinations may contain spaces.
    if let Some(bracketed) = trimmed.strip_prefix('<').and_then(|t| return t.split_once('>')).map(|(t, _)| return t) {
        return (!bracketed.is_empty()).then_some((bracketed, start.saturating_add(1)));
    }
    let token = trimmed.split_whitespace().next()?;
    return Some((token, start));
}

/// Read a document, logging and returning `None` on failure so one bad file
/// never aborts a scan.
pub fn read_document(path: &Path) -> Option<String> {
    return match std::fs::read_to_string(path) {
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document");
            None
        },
        Ok(content) => Some(content),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReferenceKind;

    fn refs(line: &str) -> Vec<Reference> {
        return extract_references(line, Path::new("docs/a.mdx"));
    }

    #[test]
    fn markdown_link_with_title_and_column() {
        let line = "See [guide](./Quick%20Start.mdx \"Title\") now.";
        let found = refs(line);
        assert_eq!(found.len(), 1);
        let r = &found[0];
        assert_eq!(r.raw, "./Quick%20Start.mdx");
        assert_eq!(r.kind, ReferenceKind::RelativeLocal);
        assert_eq!(&line[r.column..r.column + r.raw.len()], r.raw);
    }

    #[test]
    fn images_are_not_references() {
        assert!(refs("![logo](/img/logo.png)").is_empty());
    }

    #[test]
    fn angle_bracket_target_keeps_spaces() {
        let line = "See [start](<./Quick Start.mdx#init> \"Title\").";
        let found = refs(line);
        assert_eq!(found.len(), 1);
        let r = &found[0];
        assert_eq!(r.raw, "./Quick Start.mdx#init");
        assert_eq!(r.kind, ReferenceKind::RelativeLocal);
        assert_eq!(&line[r.column..r.column + r.raw.len()], r.raw);
        assert!(refs("[empty](<>)").is_empty());
    }

    #[test]
    fn linked_image_yields_outer_target() {
        let line = "[![logo](/img/logo.png)](./Guide.mdx)";
        let found = refs(line);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "./Guide.mdx");
        assert_eq!(found[0].kind, ReferenceKind::RelativeLocal);
        assert_eq!(found[0].column, line.find("./Guide.mdx").unwrap());
    }

    #[test]
    fn bare_url_inside_link_is_not_duplicated() {
        let found = refs("[https://a.com](https://a.com) and https://b.com/x.");
        let raws: Vec<&str> = found.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(raws, vec!["https://a.com", "https://b.com/x"]);
        assert_eq!(found[1].construct, Construct::BareUrl);
    }

    #[test]
    fn html_anchor_and_import() {
        let found = refs("import Content from '/snippets/Common.mdx'\n<a href=\"/x/y\" target=\"_blank\">x</a>");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].construct, Construct::Import);
        assert_eq!(found[0].kind, ReferenceKind::Import);
        assert_eq!(found[0].line, 1);
        assert_eq!(found[1].construct, Construct::HtmlAnchor);
        assert_eq!(found[1].kind, ReferenceKind::RootRelative);
        assert_eq!(found[1].line, 2);
    }

    #[test]
    fn named_imports_are_matched() {
        let found = refs("import { Tabs, Tab } from \"./parts/tabs.mdx\"");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "./parts/tabs.mdx");
    }

    #[test]
    fn code_blocks_are_skipped() {
        let found = refs("```js\nimport x from '/a.mdx'\n[a](./b.mdx)\n```\n[c](./c.mdx)");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw, "./c.mdx");
        assert_eq!(found[0].line, 5);
    }

    #[test]
    fn documents_respect_skip_dirs_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/node_modules")).unwrap();
        std::fs::create_dir_all(dir.path().join("docs/old")).unwrap();
        std::fs::write(dir.path().join("docs/a.mdx"), "").unwrap();
        std::fs::write(dir.path().join("docs/b.md"), "").unwrap();
        std::fs::write(dir.path().join("docs/c.json"), "").unwrap();
        std::fs::write(dir.path().join("docs/node_modules/d.mdx"), "").unwrap();
        std::fs::write(dir.path().join("docs/old/e.mdx"), "").unwrap();

        let config = Config::parse("exclude = [\"docs/old\"]").unwrap();
        let found = documents(&dir.path().join("docs"), dir.path(), &config);
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mdx", "b.md"]);
    }
}
