//! Core domain types for mdxref references and resolution results.

use std::fmt;
use std::path::PathBuf;

/// Syntactic construct a reference was extracted from.
/// The same target text means different things depending on where it appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Construct {
    /// Bare `http(s)://` URL in prose.
    BareUrl,
    /// `<a href="...">` tag.
    HtmlAnchor,
    /// `import X from '...'` statement.
    Import,
    /// `[text](target)` link.
    MarkdownLink,
    /// `"id"` of a doc entry in `sidebars.json`.
    SidebarEntry,
}

impl Construct {
    /// Short tag printed next to a reported reference.
    pub const fn tag(self) -> &'static str {
        return match self {
            Self::BareUrl => "plain-text",
            Self::HtmlAnchor => "html",
            Self::Import => "mdx-import",
            Self::MarkdownLink => "markdown",
            Self::SidebarEntry => "sidebar",
        };
    }
}

/// Document locale. Every instance belongs to exactly one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English site.
    En,
    /// Chinese site.
    Zh,
}

impl Locale {
    /// Lowercase code used in config file names (`docuo.config.<code>.json`).
    pub const fn code(self) -> &'static str {
        return match self {
            Self::En => "en",
            Self::Zh => "zh",
        };
    }

    /// Parse a locale code, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        return match code.to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "zh" => Some(Self::Zh),
            _ => None,
        };
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.code());
    }
}

/// A link target found in a document, with enough context to rewrite it in place.
#[derive(Debug, Clone)]
pub struct Reference {
    /// Byte offset of `raw` within the line.
    pub column: usize,
    /// Construct the target was extracted from.
    pub construct: Construct,
    /// Classification of the target text.
    pub kind: ReferenceKind,
    /// One-based line number.
    pub line: u32,
    /// Trimmed text of the whole line, for reports.
    pub line_content: String,
    /// The target text exactly as written.
    pub raw: String,
    /// Document (or sidebar file) containing the reference.
    pub source: PathBuf,
}

impl Reference {
    /// Target without its `#fragment`, and the URL-decoded fragment if any.
    pub fn split_fragment(&self) -> (&str, Option<String>) {
        return split_fragment(&self.raw);
    }
}

/// Split `path#fragment`, URL-decoding the fragment.
pub fn split_fragment(raw: &str) -> (&str, Option<String>) {
    let Some((path, fragment)) = raw.split_once('#') else {
        return (raw, None);
    };
    let decoded = urlencoding::decode(fragment)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_err| return fragment.to_string());
    return (path, Some(decoded));
}

/// What a reference's target text denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `#fragment` within the same document.
    AnchorOnly,
    /// `http(s)://` URL.
    External,
    /// Path of an MDX content-reuse import.
    Import,
    /// `./` or `../` path to an `.md`/`.mdx` file.
    RelativeLocal,
    /// `/routeBasePath/doc-id` site route.
    RootRelative,
    /// Doc id inside a `sidebars.json` tree.
    SidebarDoc,
    /// Not a reference this engine validates (prose, assets, mail links).
    Unclassified,
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    /// The reference that was resolved.
    pub reference: Reference,
    /// File the reference resolved to, when one was found.
    pub resolved_path: Option<PathBuf>,
    /// Resolution status.
    pub status: Status,
}

/// Resolution status of a reference. Variant order is report order.
#[allow(clippy::arbitrary_source_item_ordering, reason = "derived Ord sorts report sections")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// A link to the other locale's public site.
    MixedLanguage,
    /// Target file does not exist.
    FileNotFound,
    /// Target file exists but the `#fragment` names no heading or anchor in it.
    AnchorNotFound,
    /// No instance's `routeBasePath` prefixes the route.
    InstanceNotFound,
    /// External server answered 404.
    ExternalNotFound,
    /// External server could not be reached; validity unknown.
    ExternalUnreachable,
    /// External URL that was not checked in this run.
    ExternalPending,
    /// The reference resolves.
    Valid,
}

impl Status {
    /// Whether this status belongs in the problem report.
    pub const fn is_problem(self) -> bool {
        return !matches!(self, Self::Valid | Self::ExternalPending);
    }

    /// Human-readable heading for report sections.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::AnchorNotFound => "anchor not found",
            Self::ExternalNotFound => "external link returns 404",
            Self::ExternalPending => "external link not checked",
            Self::ExternalUnreachable => "external link unreachable",
            Self::FileNotFound => "file not found",
            Self::InstanceNotFound => "no instance for route",
            Self::MixedLanguage => "mixed-language link",
            Self::Valid => "valid",
        };
    }

    /// Stable machine-readable name used in JSON output.
    pub const fn slug(self) -> &'static str {
        return match self {
            Self::AnchorNotFound => "anchor-not-found",
            Self::ExternalNotFound => "external-not-found",
            Self::ExternalPending => "external-pending",
            Self::ExternalUnreachable => "external-unreachable",
            Self::FileNotFound => "file-not-found",
            Self::InstanceNotFound => "instance-not-found",
            Self::MixedLanguage => "mixed-language",
            Self::Valid => "valid",
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_is_url_decoded() {
        let (path, fragment) = split_fragment("./a.mdx#%E6%B5%8B%E8%AF%95");
        assert_eq!(path, "./a.mdx");
        assert_eq!(fragment.as_deref(), Some("测试"));
    }

    #[test]
    fn pending_and_valid_are_not_problems() {
        assert!(!Status::Valid.is_problem());
        assert!(!Status::ExternalPending.is_problem());
        assert!(Status::ExternalUnreachable.is_problem());
        assert!(Status::AnchorNotFound.is_problem());
    }
}
