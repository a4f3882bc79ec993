//! Typed model of `sidebars.json` navigation trees.
//!
//! Nodes keep every field they were read with, in the original order, so a
//! rewrite only ever changes `id` values.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::Error;
use crate::types::{Construct, Reference, ReferenceKind};

/// File name of a navigation tree.
pub const SIDEBAR_FILE: &str = "sidebars.json";

/// One named sidebar: a top-level key and its node list.
#[derive(Debug, Clone)]
pub struct Sidebar {
    /// Top-level key, such as `mySidebar`.
    pub name: String,
    /// Root nodes in file order.
    pub nodes: Vec<SidebarNode>,
}

/// A parsed `sidebars.json` file.
#[derive(Debug, Clone)]
pub struct SidebarFile {
    /// Location of the file.
    pub path: PathBuf,
    /// Sidebars in file order.
    pub sidebars: Vec<Sidebar>,
    /// Text the file was parsed from, for line lookups.
    source: String,
}

/// A node of a sidebar tree. `fields` holds the complete JSON object,
/// including the `id`/`items` keys mirrored in the typed fields.
#[derive(Debug, Clone)]
pub enum SidebarNode {
    /// `"type": "category"` with nested `items`.
    Category {
        /// The node object as read.
        fields: Map<String, Value>,
        /// Child nodes.
        items: Vec<SidebarNode>,
    },
    /// `"type": "doc"` pointing at a document id.
    Doc {
        /// The node object as read.
        fields: Map<String, Value>,
        /// Document id, relative to the sidebar's directory.
        id: String,
    },
    /// `"type": "link"` to an arbitrary URL.
    Link {
        /// The node object as read.
        fields: Map<String, Value>,
    },
    /// Anything else, kept verbatim.
    Other(Value),
}

impl SidebarNode {
    /// Collect doc ids depth-first.
    fn collect_ids<'n>(&'n self, out: &mut Vec<&'n str>) {
        match self {
            Self::Category { items, .. } => {
                for item in items {
                    item.collect_ids(out);
                }
            },
            Self::Doc { id, .. } => out.push(id),
            Self::Link { .. } | Self::Other(_) => {},
        }
    }

    /// Build a node from its JSON value.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(fields) = value else {
            return Self::Other(value);
        };
        let kind = fields.get("type").and_then(Value::as_str);
        return match kind {
            Some("category") => {
                let items = match fields.get("items") {
                    Some(Value::Array(values)) => values.iter().cloned().map(Self::from_value).collect(),
                    _ => Vec::new(),
                };
                Self::Category { fields, items }
            },
            Some("doc") => match fields.get("id").and_then(Value::as_str) {
                Some(id) => {
                    let id = id.to_string();
                    Self::Doc { fields, id }
                },
                None => Self::Other(Value::Object(fields)),
            },
            Some("link") => Self::Link { fields },
            _ => Self::Other(Value::Object(fields)),
        };
    }

    /// Replace doc id `old` with `new` throughout the subtree. Returns how many changed.
    fn rename_id(&mut self, old: &str, new: &str) -> usize {
        return match self {
            Self::Category { items, .. } => items.iter_mut().map(|item| return item.rename_id(old, new)).sum(),
            Self::Doc { id, .. } if id == old => {
                *id = new.to_string();
                1
            },
            Self::Doc { .. } | Self::Link { .. } | Self::Other(_) => 0,
        };
    }

    /// Convert back to JSON, writing typed fields into their original slots.
    pub fn to_value(&self) -> Value {
        return match self {
            Self::Category { fields, items } => {
                let mut fields = fields.clone();
                if fields.contains_key("items") || !items.is_empty() {
                    fields.insert("items".to_string(), Value::Array(items.iter().map(Self::to_value).collect()));
                }
                Value::Object(fields)
            },
            Self::Doc { fields, id } => {
                let mut fields = fields.clone();
                fields.insert("id".to_string(), Value::String(id.clone()));
                Value::Object(fields)
            },
            Self::Link { fields } => Value::Object(fields.clone()),
            Self::Other(value) => value.clone(),
        };
    }
}

impl SidebarFile {
    /// Every doc id in file order, depth-first.
    pub fn doc_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for sidebar in &self.sidebars {
            for node in &sidebar.nodes {
                node.collect_ids(&mut ids);
            }
        }
        return ids;
    }

    /// Read and parse a sidebar file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, or
    /// `Error::SidebarParse` if it is not a JSON object of node arrays.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        return Self::parse(path, &content);
    }

    /// Parse sidebar JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Error::SidebarParse` if the text is not a JSON object whose
    /// values are arrays.
    pub fn parse(path: &Path, content: &str) -> Result<Self, Error> {
        let parse_error = |reason: String| return Error::SidebarParse { path: path.to_path_buf(), reason };

        let value: Value = serde_json::from_str(content).map_err(|e| return parse_error(e.to_string()))?;
        let Value::Object(top) = value else {
            return Err(parse_error("top level is not an object".to_string()));
        };

        let mut sidebars = Vec::with_capacity(top.len());
        for (name, body) in top {
            let Value::Array(values) = body else {
                return Err(parse_error(format!("sidebar `{name}` is not an array")));
            };
            let nodes = values.into_iter().map(SidebarNode::from_value).collect();
            sidebars.push(Sidebar { name, nodes });
        }
        return Ok(Self { path: path.to_path_buf(), sidebars, source: content.to_string() });
    }

    /// Doc ids as `SidebarEntry` references, each pointing at the line that holds it.
    pub fn references(&self) -> Vec<Reference> {
        let mut cursor = 0usize;
        let mut references = Vec::new();

        for id in self.doc_ids() {
            let quoted = serde_json::to_string(id).unwrap_or_else(|_err| return format!("\"{id}\""));
            let at = locate_id(&self.source, &quoted, cursor).unwrap_or(cursor);
            cursor = at.saturating_add(quoted.len());

            let before = self.source.get(..at).unwrap_or("");
            let line_start = before.rfind('\n').map_or(0, |i| return i.saturating_add(1));
            let line_end = self.source.get(at..).and_then(|rest| return rest.find('\n')).map_or(self.source.len(), |i| {
                return at.saturating_add(i);
            });
            let line_number = before.matches('\n').count().saturating_add(1);

            references.push(Reference {
                column: at.saturating_sub(line_start).saturating_add(1),
                construct: Construct::SidebarEntry,
                kind: ReferenceKind::SidebarDoc,
                line: u32::try_from(line_number).unwrap_or(u32::MAX),
                line_content: self.source.get(line_start..line_end).unwrap_or("").trim().to_string(),
                raw: id.to_string(),
                source: self.path.clone(),
            });
        }
        return references;
    }

    /// Replace doc id `old` with `new` everywhere. Returns how many entries changed.
    pub fn rename_id(&mut self, old: &str, new: &str) -> usize {
        if old == new {
            return 0;
        }
        return self
            .sidebars
            .iter_mut()
            .flat_map(|s| return s.nodes.iter_mut())
            .map(|node| return node.rename_id(old, new))
            .sum();
    }

    /// Write the file back with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns `Error::SidebarParse` if serialization fails, or `Error::Io` on write failure.
    pub fn save(&self) -> Result<(), Error> {
        let mut text = self.to_json_string()?;
        text.push('\n');
        std::fs::write(&self.path, &text)?;
        return Ok(());
    }

    /// Serialize the whole file as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::SidebarParse` if serialization fails.
    pub fn to_json_string(&self) -> Result<String, Error> {
        let mut top = Map::new();
        for sidebar in &self.sidebars {
            top.insert(sidebar.name.clone(), Value::Array(sidebar.nodes.iter().map(SidebarNode::to_value).collect()));
        }
        return serde_json::to_string_pretty(&Value::Object(top))
            .map_err(|e| return Error::SidebarParse { path: self.path.clone(), reason: e.to_string() });
    }
}

/// Byte offset of the next `"id": <quoted>` value at or after `from`.
fn locate_id(source: &str, quoted: &str, from: usize) -> Option<usize> {
    let mut start = from;
    while let Some(offset) = source.get(start..)?.find(quoted) {
        let at = start.saturating_add(offset);
        let key = source
            .get(..at)
            .map(str::trim_end)
            .and_then(|b| return b.strip_suffix(':'))
            .map(str::trim_end);
        if key.is_some_and(|k| return k.ends_with("\"id\"")) {
            return Some(at);
        }
        start = at.saturating_add(quoted.len());
    }
    return None;
}

/// Nearest `sidebars.json` in `start` or one of its ancestors, stopping at `root`.
pub fn nearest(start: &Path, root: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(SIDEBAR_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir == root || !dir.starts_with(root) {
            return None;
        }
        current = dir.parent();
    }
    return None;
}
