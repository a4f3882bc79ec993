//! Classification of raw link targets into reference kinds.

use crate::paths;
use crate::types::{Construct, ReferenceKind, split_fragment};

/// Classify a target by its text and the construct it came from.
///
/// Checks run in order and the first match wins: `#...` is anchor-only,
/// `./`/`../` to an `.md`/`.mdx` file is relative-local, `/...` is
/// root-relative, `http(s)://` is external. Everything else is unclassified
/// and never reported, since much of what the link patterns match is prose.
pub fn classify(raw: &str, construct: Construct) -> ReferenceKind {
    match construct {
        Construct::BareUrl => {
            if is_http(raw) {
                return ReferenceKind::External;
            }
            return ReferenceKind::Unclassified;
        },
        Construct::Import => {
            let (path, _) = split_fragment(raw);
            if paths::is_doc_target(path) {
                return ReferenceKind::Import;
            }
            return ReferenceKind::Unclassified;
        },
        Construct::SidebarEntry => return ReferenceKind::SidebarDoc,
        Construct::HtmlAnchor | Construct::MarkdownLink => {},
    }

    if raw.starts_with('#') {
        return ReferenceKind::AnchorOnly;
    }
    if raw.starts_with("./") || raw.starts_with("../") {
        if paths::is_doc_target(strip_query(split_fragment(raw).0)) {
            return ReferenceKind::RelativeLocal;
        }
        return ReferenceKind::Unclassified;
    }
    // Protocol-relative URLs are not site routes.
    if raw.starts_with("//") {
        return ReferenceKind::Unclassified;
    }
    if raw.starts_with('/') {
        return ReferenceKind::RootRelative;
    }
    if is_http(raw) {
        return ReferenceKind::External;
    }
    return ReferenceKind::Unclassified;
}

/// Whether a target is an `http://` or `https://` URL.
pub fn is_http(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    return lower.starts_with("http://") || lower.starts_with("https://");
}

/// Drop a `?query` suffix.
pub fn strip_query(target: &str) -> &str {
    return target.split_once('?').map_or(target, |(path, _)| return path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_of_checks() {
        let md = Construct::MarkdownLink;
        assert_eq!(classify("#intro", md), ReferenceKind::AnchorOnly);
        assert_eq!(classify("./a.mdx", md), ReferenceKind::RelativeLocal);
        assert_eq!(classify("../API%20reference/Update.mdx#top", md), ReferenceKind::RelativeLocal);
        assert_eq!(classify("/aiagent-server/quick-start", md), ReferenceKind::RootRelative);
        assert_eq!(classify("https://example.com", md), ReferenceKind::External);
        assert_eq!(classify("HTTP://EXAMPLE.COM", md), ReferenceKind::External);
    }

    #[test]
    fn prose_and_assets_are_unclassified() {
        let md = Construct::MarkdownLink;
        assert_eq!(classify("./image.png", md), ReferenceKind::Unclassified);
        assert_eq!(classify("mailto:a@b.c", md), ReferenceKind::Unclassified);
        assert_eq!(classify("some words", md), ReferenceKind::Unclassified);
        assert_eq!(classify("//cdn.example.com/x.js", md), ReferenceKind::Unclassified);
    }

    #[test]
    fn construct_decides_imports_and_bare_urls() {
        assert_eq!(classify("/snippets/common.mdx", Construct::Import), ReferenceKind::Import);
        assert_eq!(classify("@site/src/Widget", Construct::Import), ReferenceKind::Unclassified);
        assert_eq!(classify("https://x.y/z", Construct::BareUrl), ReferenceKind::External);
        assert_eq!(classify("./a.mdx", Construct::HtmlAnchor), ReferenceKind::RelativeLocal);
        assert_eq!(classify("quick-start", Construct::SidebarEntry), ReferenceKind::SidebarDoc);
    }
}
