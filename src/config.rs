//! `.mdxref.toml` loading: scan filters, skipped directories, locale domains, and external probe settings.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::Error;
use crate::types::Locale;

/// Name of the optional tool config file at the repository root.
pub const CONFIG_FILE: &str = ".mdxref.toml";

/// Default per-request timeout for external probes, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Tool configuration loaded from `.mdxref.toml`.
/// Include/exclude patterns are repo-relative path prefixes applied to documents.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public domains per locale, used for mixed-language detection.
    domains: BTreeMap<Locale, Vec<String>>,
    exclude: Vec<String>,
    /// Settings for `--external` reachability checks.
    pub external: ExternalSettings,
    include: Vec<String>,
    skip_dirs: Vec<String>,
}

/// Raw TOML structure for `.mdxref.toml`.
#[derive(serde::Deserialize)]
struct MdxrefTomlConfig {
    #[serde(default)]
    domains: Option<BTreeMap<Locale, Vec<String>>>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    external: Option<RawExternal>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    skip_dirs: Option<Vec<String>>,
}

/// Raw `[external]` table.
#[derive(serde::Deserialize)]
struct RawExternal {
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

/// How external URLs are probed.
#[derive(Debug, Clone)]
pub struct ExternalSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header sent with each probe.
    pub user_agent: String,
}

impl Default for ExternalSettings {
    fn default() -> Self {
        return Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("mdxref/{}", env!("CARGO_PKG_VERSION")),
        };
    }
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            domains: default_domains(),
            exclude: Vec::new(),
            external: ExternalSettings::default(),
            include: Vec::new(),
            skip_dirs: ["node_modules", ".git", "__pycache__"].map(String::from).to_vec(),
        };
    }
}

/// Public domains of the two documentation sites.
fn default_domains() -> BTreeMap<Locale, Vec<String>> {
    return BTreeMap::from([
        (Locale::En, vec!["zegocloud.com".to_string()]),
        (Locale::Zh, vec!["zego.im".to_string()]),
    ]);
}

impl Config {
    /// Locale whose public domain hosts `host`, if any.
    pub fn domain_locale(&self, host: &str) -> Option<Locale> {
        let host = host.to_ascii_lowercase();
        return self
            .domains
            .iter()
            .find(|(_, domains)| {
                return domains.iter().any(|d| {
                    let d = d.to_ascii_lowercase();
                    return host == d || host.ends_with(&format!(".{d}"));
                });
            })
            .map(|(locale, _)| return *locale);
    }

    /// Load config from `.mdxref.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist. Never falls back to defaults
    /// when the file exists but is malformed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML text, filling unspecified keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: MdxrefTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let mut external = defaults.external;
        if let Some(ext) = raw.external {
            if let Some(secs) = ext.timeout_secs {
                external.timeout = Duration::from_secs(secs);
            }
            if let Some(agent) = ext.user_agent {
                external.user_agent = agent;
            }
        }

        return Ok(Self {
            domains: raw.domains.unwrap_or(defaults.domains),
            exclude: raw.exclude,
            external,
            include: raw.include,
            skip_dirs: raw.skip_dirs.unwrap_or(defaults.skip_dirs),
        });
    }

    /// Check whether a document path (relative to the repository root) should be scanned.
    ///
    /// A path is included if no include patterns are set, or if it starts with
    /// at least one include pattern. An included path is then excluded if it
    /// starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// Whether a directory with this name is never walked.
    pub fn skips_dir(&self, name: &str) -> bool {
        return self.skip_dirs.iter().any(|d| return d == name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.should_scan("core_products/a.mdx"));
        assert!(config.skips_dir("node_modules"));
        assert_eq!(config.external.timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "include = [").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn include_then_exclude_prefixes() {
        let config = Config::parse(
            "include = [\"core_products/\"]\nexclude = [\"core_products/old/\"]\n",
        )
        .unwrap();
        assert!(config.should_scan("core_products/aiagent/a.mdx"));
        assert!(!config.should_scan("core_products/old/a.mdx"));
        assert!(!config.should_scan("general/a.mdx"));
    }

    #[test]
    fn domain_matches_subdomains() {
        let config = Config::default();
        assert_eq!(config.domain_locale("example.zegocloud.com"), Some(Locale::En));
        assert_eq!(config.domain_locale("doc-zh.zego.im"), Some(Locale::Zh));
        assert_eq!(config.domain_locale("zego.im"), Some(Locale::Zh));
        assert_eq!(config.domain_locale("notzego.im"), None);
        assert_eq!(config.domain_locale("github.com"), None);
    }

    #[test]
    fn domains_and_timeout_are_configurable() {
        let config = Config::parse(
            "[domains]\nen = [\"example.com\"]\n\n[external]\ntimeout_secs = 2\n",
        )
        .unwrap();
        assert_eq!(config.domain_locale("docs.example.com"), Some(Locale::En));
        assert_eq!(config.domain_locale("zego.im"), None);
        assert_eq!(config.external.timeout, Duration::from_secs(2));
    }
}
