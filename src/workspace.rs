//! The explicit context threaded through every command: root, tool config, instances.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::doc_id;
use crate::instance::{Instance, InstanceSet};

/// Repository root plus everything loaded from it at the start of a run.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Tool configuration from `.mdxref.toml`.
    pub config: Config,
    /// Instances in load order.
    pub instances: InstanceSet,
    /// Absolute repository root.
    pub root: PathBuf,
}

/// Where a document lives on the public site.
#[derive(Debug, Clone)]
pub struct DocumentRoute<'w> {
    /// Document id relative to the instance directory.
    pub id: String,
    /// Instance owning the document.
    pub instance: &'w Instance,
    /// Public route, `/{routeBasePath}/{id}`.
    pub route: String,
}

impl Workspace {
    /// Bundle an already-loaded config and instance set with the root.
    pub const fn new(root: PathBuf, config: Config, instances: InstanceSet) -> Self {
        return Self { config, instances, root };
    }

    /// Route of a document, derived from its owning instance and path.
    pub fn route_of(&self, file: &Path) -> Option<DocumentRoute<'_>> {
        let instance = self.instances.owning(file)?;
        let id = doc_id::id_of(instance.dir()?, file)?;
        let route = instance.route_for(&id);
        return Some(DocumentRoute { id, instance, route });
    }
}
