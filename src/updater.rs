//! Reference rewriting after documents move on disk.
//!
//! The updater runs once the files are already at their new paths. It scans
//! every document in the repository, finds references that pointed at an old
//! path, and rewrites them in place. Running it twice for the same moves
//! changes nothing the second time.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::doc_id;
use crate::error::Error;
use crate::paths;
use crate::resolver::Resolver;
use crate::scanner;
use crate::sidebar::{self, SidebarFile};
use crate::types::{Reference, ReferenceKind};
use crate::workspace::Workspace;

/// One document move, both paths absolute and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// Where the document is now.
    pub new: PathBuf,
    /// Where it was before the move.
    pub old: PathBuf,
}

/// A single rewritten reference.
#[derive(Debug, Clone, Serialize)]
pub struct Rewrite {
    /// File that was edited.
    pub file: PathBuf,
    /// One-based line of the edit.
    pub line: u32,
    /// Replacement text.
    pub new: String,
    /// Text that was replaced.
    pub old: String,
}

/// Everything an update changed, by reference kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    /// MDX import paths.
    pub import_refs: Vec<Rewrite>,
    /// Root-relative site routes.
    pub internal_link_refs: Vec<Rewrite>,
    /// `./` and `../` file links.
    pub link_refs: Vec<Rewrite>,
    /// Doc ids in `sidebars.json` files.
    pub sidebar_refs: Vec<Rewrite>,
}

impl UpdateReport {
    /// Number of files written.
    pub fn files_changed(&self) -> usize {
        let mut files: Vec<&Path> = self
            .import_refs
            .iter()
            .chain(&self.internal_link_refs)
            .chain(&self.link_refs)
            .chain(&self.sidebar_refs)
            .map(|r| return r.file.as_path())
            .collect();
        files.sort();
        files.dedup();
        return files.len();
    }

    /// Total number of rewritten references.
    pub fn total(&self) -> usize {
        return self
            .import_refs
            .len()
            .saturating_add(self.internal_link_refs.len())
            .saturating_add(self.link_refs.len())
            .saturating_add(self.sidebar_refs.len());
    }
}

/// Which report list an edit belongs to.
#[derive(Debug, Clone, Copy)]
enum Bucket {
    /// `UpdateReport::import_refs`
    Import,
    /// `UpdateReport::internal_link_refs`
    InternalLink,
    /// `UpdateReport::link_refs`
    Link,
}

/// A pending in-line edit.
struct Edit {
    bucket: Bucket,
    /// Byte offset of `old` in the line.
    column: usize,
    /// One-based line number.
    line: u32,
    new: String,
    old: String,
}

/// Rewrites references for a batch of moves.
pub struct ReferenceUpdater<'w> {
    /// Moved file's new path → old path.
    moved_from: HashMap<PathBuf, PathBuf>,
    /// Old path → new path.
    moved_to: HashMap<PathBuf, PathBuf>,
    resolver: Resolver<'w>,
    workspace: &'w Workspace,
}

impl<'w> ReferenceUpdater<'w> {
    /// Replacement for a reference in `doc`, if it pointed at a moved file.
    fn edit_for(&self, doc: &Path, reference: &Reference) -> Option<(Bucket, String)> {
        return match reference.kind {
            ReferenceKind::Import => self.rewrite_import(doc, reference).map(|raw| return (Bucket::Import, raw)),
            ReferenceKind::RelativeLocal => {
                self.rewrite_relative(doc, reference).map(|raw| return (Bucket::Link, raw))
            },
            ReferenceKind::RootRelative => {
                self.rewrite_route(doc, reference).map(|raw| return (Bucket::InternalLink, raw))
            },
            ReferenceKind::AnchorOnly
            | ReferenceKind::External
            | ReferenceKind::SidebarDoc
            | ReferenceKind::Unclassified => None,
        };
    }

    /// Where a path-like target now lives. A target that names an old path maps
    /// to its new one. For a moved document, a target that no longer exists is
    /// re-read from the document's old directory.
    fn moved_target(&self, doc: &Path, written: &str) -> Option<PathBuf> {
        let current_dir = doc.parent()?;
        let current = paths::normalize_path(&current_dir.join(written));
        if let Some(new) = self.moved_to.get(&current) {
            return Some(new.clone());
        }
        if current.is_file() {
            return None;
        }

        let old_doc = self.moved_from.get(doc)?;
        let from_old = paths::normalize_path(&old_doc.parent()?.join(written));
        let target = self.moved_to.get(&from_old).cloned().unwrap_or(from_old);
        return target.is_file().then_some(target);
    }

    /// Create an updater for a set of completed moves.
    pub fn new(workspace: &'w Workspace, moves: &[Move]) -> Self {
        let moved_to = moves.iter().map(|m| return (m.old.clone(), m.new.clone())).collect();
        let moved_from = moves.iter().map(|m| return (m.new.clone(), m.old.clone())).collect();
        return Self { moved_from, moved_to, resolver: Resolver::new(workspace, None), workspace };
    }

    /// New import path for a reference to a moved file.
    fn rewrite_import(&self, doc: &Path, reference: &Reference) -> Option<String> {
        let raw = reference.raw.as_str();
        let is_relative = raw.starts_with("./") || raw.starts_with("../");
        let target = if is_relative {
            self.moved_target(doc, raw)?
        } else {
            let current = self.resolver.target_path(reference)?;
            self.moved_to.get(&current)?.clone()
        };

        if is_relative {
            return Some(dot_relative(&paths::relative_path(doc.parent()?, &target)));
        }
        let from_root = paths::to_slash(target.strip_prefix(&self.workspace.root).ok()?);
        if raw.starts_with('/') {
            return Some(format!("/{from_root}"));
        }
        return Some(from_root);
    }

    /// New `./`/`../` link for a reference to a moved file, keeping the fragment
    /// and the percent-encoding style of the original. A new path with
    /// whitespace is always encoded, since a bare link target ends at a space.
    fn rewrite_relative(&self, doc: &Path, reference: &Reference) -> Option<String> {
        let (path, fragment) = split_suffix(&reference.raw);
        let decoded = urlencoding::decode(path).map_or_else(|_err| return path.to_string(), |d| return d.into_owned());
        let target = self.moved_target(doc, &decoded)?;

        let mut relative = paths::relative_path(doc.parent()?, &target);
        if path.contains('%') || relative.contains(char::is_whitespace) {
            relative = encode_segments(&relative);
        }
        return Some(format!("{}{fragment}", dot_relative(&relative)));
    }

    /// New root-relative route for a link whose route named a moved document.
    /// Computed from the new file's instance and id, never patched in place.
    fn rewrite_route(&self, doc: &Path, reference: &Reference) -> Option<String> {
        let instances = &self.workspace.instances;
        let locale = instances.owning(doc).map(|i| return i.locale);
        let route = self.resolver.route_target(&reference.raw, locale)?;

        let moved = self.moved_to.iter().find(|(old, _)| {
            let Some(owner) = instances.owning(old) else {
                return false;
            };
            let old_id = owner.dir().and_then(|dir| return doc_id::id_of(dir, old));
            return owner.id == route.instance.id && old_id.as_deref() == Some(route.canonical_id.as_str());
        });
        let (_, new) = moved?;

        let Some(new_instance) = instances.owning(new) else {
            tracing::warn!(
                file = %doc.display(),
                line = reference.line,
                target = %new.display(),
                "moved document has no instance; route left unchanged"
            );
            return None;
        };
        let new_id = doc_id::id_of(new_instance.dir()?, new)?;
        let (_, fragment) = split_suffix(&reference.raw);
        return Some(format!("{}{fragment}", new_instance.route_for(&new_id)));
    }

    /// Rewrite every reference to a moved document across the repository and
    /// update the nearest `sidebars.json` ids.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if an edited file cannot be written, or
    /// `Error::SidebarParse` if a sidebar that needs an update cannot be parsed.
    pub fn update_references(&self) -> Result<UpdateReport, Error> {
        let mut report = UpdateReport::default();
        let root = &self.workspace.root;

        for doc in scanner::documents(root, root, &self.workspace.config) {
            let Some(content) = scanner::read_document(&doc) else {
                continue;
            };
            let edits: Vec<Edit> = scanner::extract_references(&content, &doc)
                .iter()
                .filter_map(|reference| {
                    let (bucket, new) = self.edit_for(&doc, reference)?;
                    return (new != reference.raw).then(|| {
                        return Edit {
                            bucket,
                            column: reference.column,
                            line: reference.line,
                            new,
                            old: reference.raw.clone(),
                        };
                    });
                })
                .collect();
            if edits.is_empty() {
                continue;
            }

            let updated = apply_edits(&content, &edits);
            if updated == content {
                continue;
            }
            std::fs::write(&doc, &updated)?;
            tracing::debug!(file = %doc.display(), edits = edits.len(), "rewrote references");

            for edit in edits {
                let rewrite = Rewrite { file: doc.clone(), line: edit.line, new: edit.new, old: edit.old };
                match edit.bucket {
                    Bucket::Import => report.import_refs.push(rewrite),
                    Bucket::InternalLink => report.internal_link_refs.push(rewrite),
                    Bucket::Link => report.link_refs.push(rewrite),
                }
            }
        }

        report.sidebar_refs = self.update_sidebars()?;
        return Ok(report);
    }

    /// Rename doc ids of moved documents in their nearest `sidebars.json`.
    /// Each sidebar file is written at most once.
    fn update_sidebars(&self) -> Result<Vec<Rewrite>, Error> {
        let root = &self.workspace.root;
        let mut renames: BTreeMap<PathBuf, Vec<(String, String)>> = BTreeMap::new();

        for (old, new) in &self.moved_to {
            let old_sidebar = old.parent().and_then(|dir| return sidebar::nearest(dir, root));
            let new_sidebar = new.parent().and_then(|dir| return sidebar::nearest(dir, root));
            let (Some(old_sidebar), Some(new_sidebar)) = (old_sidebar, new_sidebar) else {
                continue;
            };
            if old_sidebar != new_sidebar {
                tracing::warn!(
                    old = %old.display(),
                    new = %new.display(),
                    "document moved to another sidebar; sidebar entry left unchanged"
                );
                continue;
            }
            let Some(dir) = old_sidebar.parent() else {
                continue;
            };
            let (Some(old_id), Some(new_id)) = (doc_id::id_of(dir, old), doc_id::id_of(dir, new)) else {
                continue;
            };
            if old_id != new_id {
                renames.entry(old_sidebar).or_default().push((old_id, new_id));
            }
        }

        let mut rewrites = Vec::new();
        for (path, pairs) in renames {
            let mut file = SidebarFile::load(&path)?;
            let mut changed = false;
            for (old_id, new_id) in pairs {
                if file.rename_id(&old_id, &new_id) > 0 {
                    changed = true;
                    rewrites.push(Rewrite { file: path.clone(), line: 0, new: new_id, old: old_id });
                }
            }
            if changed {
                file.save()?;
                tracing::debug!(file = %path.display(), "updated sidebar ids");
            }
        }
        return Ok(rewrites);
    }
}

/// Apply edits to a document, each replacing its reference's raw text at its
/// recorded column. Line endings are kept as they were.
fn apply_edits(content: &str, edits: &[Edit]) -> String {
    let mut lines: Vec<String> = content.split('\n').map(String::from).collect();
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    // Right to left so earlier columns stay valid.
    ordered.sort_by(|a, b| return b.line.cmp(&a.line).then(b.column.cmp(&a.column)));

    for edit in ordered {
        let index = usize::try_from(edit.line).unwrap_or(0).saturating_sub(1);
        let Some(line) = lines.get_mut(index) else {
            continue;
        };
        let end = edit.column.saturating_add(edit.old.len());
        if line.get(edit.column..end) == Some(edit.old.as_str()) {
            line.replace_range(edit.column..end, &edit.new);
        }
    }
    return lines.join("\n");
}

/// Prefix `./` unless the path already climbs with `../`.
fn dot_relative(relative: &str) -> String {
    if relative.starts_with("../") {
        return relative.to_string();
    }
    return format!("./{relative}");
}

/// Percent-encode each segment of a slash-separated path.
fn encode_segments(relative: &str) -> String {
    return relative
        .split('/')
        .map(|segment| {
            if segment == ".." || segment == "." {
                return segment.to_string();
            }
            return urlencoding::encode(segment).into_owned();
        })
        .collect::<Vec<_>>()
        .join("/");
}

/// Split a target into its path and the `?query#fragment` suffix, kept verbatim.
fn split_suffix(raw: &str) -> (&str, &str) {
    let cut = raw.find(['?', '#']).unwrap_or(raw.len());
    return (raw.get(..cut).unwrap_or(raw), raw.get(cut..).unwrap_or(""));
}
