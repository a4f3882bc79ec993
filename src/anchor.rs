//! Anchor extraction from headings and explicit `<a id>` tags.
//!
//! Two comparison modes exist. The exact mode compares a requested anchor with
//! the normalized heading anchors verbatim. The loose mode, tried only after the
//! exact one fails, drops hyphens and whitespace and lowercases everything, so
//! `#hello-world` still finds `## Hello World` after editors tweak headings.

use std::sync::LazyLock;

use regex::Regex;

use crate::fence::FenceTracker;

/// `<a id="...">` or `<a name="...">`, anywhere in a document.
#[allow(clippy::expect_used, reason = "hardcoded regex is a compile-time invariant")]
static EXPLICIT_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"<a\s[^>]*?\b(?:id|name)\s*=\s*["']([^"']+)["']"#).expect("valid regex");
});

/// ATX heading line: up to three spaces, one to six `#`, whitespace, text.
#[allow(clippy::expect_used, reason = "hardcoded regex is a compile-time invariant")]
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^ {0,3}#{1,6}[ \t]+(.*\S)").expect("valid regex");
});

/// Whether a document offers `anchor`: exact match first, loose match second.
pub fn has_anchor(document: &str, anchor: &str) -> bool {
    if anchor.is_empty() {
        return true;
    }
    let available = headings(document);
    if available.iter().any(|a| return a == anchor) {
        return true;
    }
    let wanted = loose_anchor(anchor);
    return available.iter().any(|a| return loose_anchor(a) == wanted);
}

/// Normalize heading text to its anchor: whitespace, colons, and parentheses are
/// deleted (parenthesized text is kept), ASCII letters are lowercased, and every
/// other character is left alone.
pub fn heading_to_anchor(text: &str) -> String {
    return text
        .chars()
        .filter(|c| return !c.is_whitespace() && !matches!(c, ':' | '：' | '(' | ')' | '（' | '）'))
        .map(|c| return c.to_ascii_lowercase())
        .collect();
}

/// Every anchor a document offers: heading anchors after the frontmatter
/// (outside code fences), then explicit anchor ids taken verbatim.
pub fn headings(document: &str) -> Vec<String> {
    let mut anchors = Vec::new();
    let mut fences = FenceTracker::default();

    for line in body_lines(document) {
        if fences.is_code(line) {
            continue;
        }
        if let Some(text) = HEADING.captures(line).and_then(|c| return c.get(1)) {
            let heading = text.as_str().trim_end_matches('#').trim_end();
            anchors.push(heading_to_anchor(heading));
        }
    }

    anchors.extend(
        EXPLICIT_ANCHOR
            .captures_iter(document)
            .filter_map(|c| return c.get(1))
            .map(|m| return m.as_str().to_string()),
    );
    return anchors;
}

/// Lines after a leading `---` frontmatter block. An unclosed block is treated
/// as ordinary text.
fn body_lines(document: &str) -> impl Iterator<Item = &str> {
    let lines: Vec<&str> = document.lines().collect();
    let skip = match lines.first() {
        Some(first) if first.trim_end() == "---" => lines
            .iter()
            .skip(1)
            .position(|l| return l.trim_end() == "---")
            .map_or(0, |end| return end.saturating_add(2)),
        _ => 0,
    };
    return lines.into_iter().skip(skip);
}

/// Loose comparison key: hyphens and whitespace removed, fully lowercased.
pub fn loose_anchor(anchor: &str) -> String {
    return anchor
        .chars()
        .filter(|c| return *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_space_is_stripped_and_lowercased() {
        assert_eq!(headings("# Hello World"), vec!["helloworld"]);
    }

    #[test]
    fn full_width_parens_and_colon_are_removed() {
        assert_eq!(headings("## API（测试）：说明"), vec!["api测试说明"]);
        assert_eq!(heading_to_anchor("Step 1: Init (Android)"), "step1initandroid");
    }

    #[test]
    fn non_ascii_letters_keep_their_case() {
        assert_eq!(heading_to_anchor("Ä Über"), "ÄÜber");
    }

    #[test]
    fn frontmatter_and_code_fences_are_skipped() {
        let doc = "---\ntitle: x\n# not a heading\n---\n# Real\n```bash\n# comment\n```\n### Last ###";
        assert_eq!(headings(doc), vec!["real", "last"]);
    }

    #[test]
    fn unclosed_frontmatter_is_body() {
        assert_eq!(headings("---\n# Title"), vec!["title"]);
    }

    #[test]
    fn explicit_anchor_ids_are_verbatim() {
        let doc = "## 3.1.0 版本 <a id=\"3.1.0\"></a>\n\nText <a name='Custom_ID'></a>";
        let anchors = headings(doc);
        assert!(anchors.contains(&"3.1.0".to_string()));
        assert!(anchors.contains(&"Custom_ID".to_string()));
    }

    #[test]
    fn exact_comparison() {
        let doc = "## Quick Start\n";
        assert!(has_anchor(doc, "quickstart"));
        assert!(!has_anchor(doc, "quick-stop"));
    }

    #[test]
    fn loose_comparison_tolerates_hyphens_and_case() {
        let doc = "## Quick Start\n<a id=\"Error-Codes\"></a>";
        assert!(has_anchor(doc, "quick-start"));
        assert!(has_anchor(doc, "Quick-Start"));
        assert!(has_anchor(doc, "errorcodes"));
        assert_eq!(loose_anchor("Quick-Start Now"), "quickstartnow");
    }

    #[test]
    fn empty_anchor_always_matches() {
        assert!(has_anchor("", ""));
    }
}
