//! Documentation instances loaded from `docuo.config*.json`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::Locale;

/// File-name prefix shared by every instance config file.
pub const CONFIG_PREFIX: &str = "docuo.config";

/// How many directory levels `find_repo_root` climbs before giving up.
const MAX_ROOT_SEARCH_DEPTH: usize = 10;

/// Group an instance is listed under in the site navigation.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Group {
    /// Group identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// A named, locale-scoped documentation subtree.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Unique instance id.
    pub id: String,
    /// Display label, if configured.
    pub label: Option<String>,
    /// Locale of every document in this instance.
    pub locale: Locale,
    /// Navigation metadata, if configured.
    pub navigation: NavigationInfo,
    /// Public URL prefix with surrounding slashes removed. May contain `/`.
    pub route_base_path: String,
    /// Where the instance's documents live.
    pub target: InstanceTarget,
}

impl Instance {
    /// Absolute directory holding the documents, or `None` for external instances.
    pub fn dir(&self) -> Option<&Path> {
        return match &self.target {
            InstanceTarget::External(_) => None,
            InstanceTarget::Local(dir) => Some(dir.as_path()),
        };
    }

    /// Label with the platform appended, as shown in instance listings.
    pub fn display_name(&self) -> String {
        let label = self.label.clone().unwrap_or_else(|| return self.id.clone());
        return match &self.navigation.platform {
            Some(platform) if !platform.is_empty() => format!("{label} ({platform})"),
            _ => label,
        };
    }

    /// Route base split into its non-empty segments.
    fn route_segments(&self) -> Vec<&str> {
        return self.route_base_path.split('/').filter(|s| return !s.is_empty()).collect();
    }

    /// Public route of a document id in this instance.
    pub fn route_for(&self, doc_id: &str) -> String {
        if self.route_base_path.is_empty() {
            return format!("/{doc_id}");
        }
        return format!("/{}/{doc_id}", self.route_base_path);
    }
}

/// Filesystem location of an instance.
#[derive(Debug, Clone)]
pub enum InstanceTarget {
    /// Hosted elsewhere; routed to but never scanned.
    External(String),
    /// Absolute directory under the repository root.
    Local(PathBuf),
}

/// Navigation metadata of an instance.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct NavigationInfo {
    /// Navigation group.
    #[serde(default)]
    pub group: Option<Group>,
    /// Platform shown next to the label.
    #[serde(default)]
    pub platform: Option<String>,
}

/// Raw JSON shape of a config file.
#[derive(serde::Deserialize)]
struct RawConfig {
    #[serde(default)]
    instances: Vec<RawInstance>,
}

/// Raw JSON shape of one instance entry.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstance {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    navigation_info: Option<NavigationInfo>,
    path: String,
    route_base_path: String,
}

/// All instances of a run, in load order. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct InstanceSet {
    instances: Vec<Instance>,
}

impl InstanceSet {
    /// Locate the config for a locale: `docuo.config.<locale>.json`, falling
    /// back to `docuo.config.json`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` naming the locale-specific path if neither exists.
    pub fn find_config(root: &Path, locale: Locale) -> Result<PathBuf, Error> {
        let localized = root.join(format!("{CONFIG_PREFIX}.{}.json", locale.code()));
        if localized.is_file() {
            return Ok(localized);
        }
        let shared = root.join(format!("{CONFIG_PREFIX}.json"));
        if shared.is_file() {
            return Ok(shared);
        }
        return Err(Error::ConfigNotFound { path: localized });
    }

    /// Instance with the given id.
    pub fn get(&self, id: &str) -> Option<&Instance> {
        return self.instances.iter().find(|i| return i.id == id);
    }

    /// Iterate instances in load order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instance> {
        return self.instances.iter();
    }

    /// Load one config file. Instance paths are resolved against `root`.
    /// Instances without a `locale` take the locale encoded in the file name.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file is absent, or
    /// `Error::ConfigParse` on invalid JSON or an unknown locale.
    pub fn load(root: &Path, config_path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(config_path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: config_path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(root, config_path, &content);
    }

    /// Load every `docuo.config*.json` in `root`, in file-name order.
    /// The first occurrence of an instance id wins.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the root holds no config file,
    /// or any error from loading an individual file.
    pub fn load_all(root: &Path) -> Result<Self, Error> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(root)?
            .filter_map(Result::ok)
            .map(|e| return e.path())
            .filter(|p| return is_config_file_name(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(Error::ConfigNotFound {
                path: root.join(format!("{CONFIG_PREFIX}.json")),
            });
        }

        let mut seen = HashSet::new();
        let mut instances = Vec::new();
        for path in &paths {
            for instance in Self::load(root, path)?.instances {
                if seen.insert(instance.id.clone()) {
                    instances.push(instance);
                }
            }
        }
        return Ok(Self { instances });
    }

    /// Instance whose local directory contains `file`. Nested instance
    /// directories resolve to the innermost one.
    pub fn owning(&self, file: &Path) -> Option<&Instance> {
        return self
            .instances
            .iter()
            .filter_map(|i| return i.dir().filter(|d| return file.starts_with(d)).map(|d| return (i, d)))
            .max_by_key(|(_, d)| return d.components().count())
            .map(|(i, _)| return i);
    }

    /// Parse config JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParse` on invalid JSON or an unknown locale.
    pub fn parse(root: &Path, config_path: &Path, content: &str) -> Result<Self, Error> {
        let raw: RawConfig = serde_json::from_str(content).map_err(|e| {
            return Error::ConfigParse { path: config_path.to_path_buf(), reason: e.to_string() };
        })?;
        let file_locale = locale_from_file_name(config_path);

        let mut instances = Vec::with_capacity(raw.instances.len());
        for entry in raw.instances {
            let locale = match entry.locale.as_deref() {
                Some(code) => Locale::from_code(code),
                None => file_locale,
            };
            let Some(locale) = locale else {
                return Err(Error::ConfigParse {
                    path: config_path.to_path_buf(),
                    reason: format!("instance `{}` has no recognised locale", entry.id),
                });
            };

            let target = if entry.path.starts_with("http://") || entry.path.starts_with("https://") {
                InstanceTarget::External(entry.path)
            } else {
                InstanceTarget::Local(crate::paths::normalize_path(&root.join(&entry.path)))
            };

            instances.push(Instance {
                id: entry.id,
                label: entry.label,
                locale,
                navigation: entry.navigation_info.unwrap_or_default(),
                route_base_path: entry.route_base_path.trim_matches('/').to_string(),
                target,
            });
        }
        return Ok(Self { instances });
    }

    /// Instance whose `routeBasePath` is the longest segment prefix of `link_path`.
    /// Ties go to the instance loaded first.
    pub fn resolve_route(&self, link_path: &str) -> Option<&Instance> {
        return self.resolve_route_in(link_path, None);
    }

    /// `resolve_route` restricted to one locale when `locale` is given.
    pub fn resolve_route_in(&self, link_path: &str, locale: Option<Locale>) -> Option<&Instance> {
        let segments: Vec<&str> = link_path.split('/').filter(|s| return !s.is_empty()).collect();
        let mut best: Option<(&Instance, usize)> = None;

        for instance in &self.instances {
            if locale.is_some_and(|l| return l != instance.locale) {
                continue;
            }
            let base = instance.route_segments();
            if !segments.starts_with(&base) {
                continue;
            }
            let longer = best.is_none_or(|(_, len)| return base.len() > len);
            if longer {
                best = Some((instance, base.len()));
            }
        }
        return best.map(|(i, _)| return i);
    }
}

/// Walk upward from `start` (at most ten levels) to the first directory holding
/// a `docuo.config*.json`, `.git`, or `package.json`. Falls back to `start`.
pub fn find_repo_root(start: &Path) -> PathBuf {
    let mut current = start;
    for _ in 0..MAX_ROOT_SEARCH_DEPTH {
        if has_root_marker(current) {
            return current.to_path_buf();
        }
        let Some(parent) = current.parent() else {
            break;
        };
        current = parent;
    }
    return start.to_path_buf();
}

/// Whether `dir` holds any repository root marker.
fn has_root_marker(dir: &Path) -> bool {
    if dir.join(".git").exists() || dir.join("package.json").exists() {
        return true;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    return entries.filter_map(Result::ok).any(|e| return is_config_file_name(&e.path()));
}

/// Whether a path's file name looks like `docuo.config*.json`.
fn is_config_file_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| return n.to_str()) else {
        return false;
    };
    return name.starts_with(CONFIG_PREFIX) && name.ends_with(".json");
}

/// Locale encoded as `docuo.config.<locale>.json`, if any.
fn locale_from_file_name(path: &Path) -> Option<Locale> {
    let name = path.file_name()?.to_str()?;
    let code = name.strip_prefix(CONFIG_PREFIX)?.strip_prefix('.')?.strip_suffix(".json")?;
    return Locale::from_code(code);
}
