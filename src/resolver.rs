//! Resolution of classified references against the filesystem and instance config.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::anchor;
use crate::classify::{is_http, strip_query};
use crate::config::Config;
use crate::doc_id::{self, IdIndex};
use crate::external::Prober;
use crate::instance::Instance;
use crate::paths;
use crate::scanner;
use crate::types::{Locale, Reference, ReferenceKind, ResolutionResult, Status, split_fragment};
use crate::workspace::Workspace;

/// Resolves references for one run. Instance id indexes are built on first use
/// and dropped with the resolver.
pub struct Resolver<'w> {
    /// Id indexes keyed by directory.
    indexes: RefCell<HashMap<PathBuf, Rc<IdIndex>>>,
    /// Present only when external links should be probed.
    prober: Option<Prober>,
    /// Root, config, and instances of the run.
    workspace: &'w Workspace,
}

/// A root-relative route split into its instance and the canonical id below it.
pub struct RouteTarget<'w> {
    /// Canonical document id (may be empty for the instance root).
    pub canonical_id: String,
    /// Instance whose `routeBasePath` matched.
    pub instance: &'w Instance,
    /// Id as written in the link, normalized but with ordering prefixes kept.
    pub link_id: String,
}

impl<'w> Resolver<'w> {
    /// Verify a `#fragment` against a target document.
    fn check_anchor(target: &Path, fragment: Option<&str>) -> Status {
        let Some(fragment) = fragment.filter(|f| return !f.is_empty()) else {
            return Status::Valid;
        };
        let Some(content) = scanner::read_document(target) else {
            return Status::FileNotFound;
        };
        if anchor::has_anchor(&content, fragment) {
            return Status::Valid;
        }
        return Status::AnchorNotFound;
    }

    /// Verify an anchor against the referencing document itself.
    fn check_anchor_in(document: &str, fragment: Option<&str>) -> Status {
        let Some(fragment) = fragment.filter(|f| return !f.is_empty()) else {
            return Status::Valid;
        };
        if anchor::has_anchor(document, fragment) {
            return Status::Valid;
        }
        return Status::AnchorNotFound;
    }

    /// Find the document an id refers to inside `dir`: the id index first, then
    /// the bounded candidate-name search. Never guesses a near match.
    pub fn find_document(&self, dir: &Path, link_id: &str) -> Option<PathBuf> {
        let index = self.index_for(dir);
        if let Some(found) = index.get(&doc_id::canonical_id(link_id)) {
            return Some(found.to_path_buf());
        }

        for candidate in doc_id::candidate_filenames(link_id) {
            for ext in ["mdx", "md"] {
                let path = dir.join(format!("{candidate}.{ext}"));
                if path.is_file() {
                    return Some(path);
                }
            }
        }
        return None;
    }

    /// Id index for a directory, built on first request.
    fn index_for(&self, dir: &Path) -> Rc<IdIndex> {
        if let Some(index) = self.indexes.borrow().get(dir) {
            return Rc::clone(index);
        }
        let index = Rc::new(IdIndex::build(dir, &self.workspace.config));
        self.indexes.borrow_mut().insert(dir.to_path_buf(), Rc::clone(&index));
        return index;
    }

    /// Whether an absolute URL points at another locale's public domain.
    fn is_mixed_language(&self, raw: &str, locale: Option<Locale>) -> bool {
        let Some(own) = locale else {
            return false;
        };
        return url_locale(&self.workspace.config, raw).is_some_and(|l| return l != own);
    }

    /// Locale of the instance owning a file.
    fn locale_of(&self, file: &Path) -> Option<Locale> {
        return self.workspace.instances.owning(file).map(|i| return i.locale);
    }

    /// Create a resolver. Pass a prober to check external links over the network.
    pub fn new(workspace: &'w Workspace, prober: Option<Prober>) -> Self {
        return Self { indexes: RefCell::new(HashMap::new()), prober, workspace };
    }

    /// Resolve one reference. `document` is the referencing file's content.
    pub fn resolve(&self, reference: &Reference, document: &str) -> ResolutionResult {
        let (status, resolved_path) = self.resolve_status(reference, document);
        return ResolutionResult { reference: reference.clone(), resolved_path, status };
    }

    /// `http(s)` link: site links of the document's own locale are accepted,
    /// others are probed when a prober is configured.
    fn resolve_external(&self, raw: &str, locale: Option<Locale>) -> Status {
        if locale.is_some() && url_locale(&self.workspace.config, raw) == locale {
            return Status::Valid;
        }
        return match &self.prober {
            None => Status::ExternalPending,
            Some(prober) => prober.probe(raw),
        };
    }

    /// Root-relative route: instance by longest prefix, then document, then anchor.
    fn resolve_route(&self, reference: &Reference, locale: Option<Locale>) -> (Status, Option<PathBuf>) {
        let (_, fragment) = reference.split_fragment();
        let Some(route) = self.route_target(&reference.raw, locale) else {
            return (Status::InstanceNotFound, None);
        };
        let Some(dir) = route.instance.dir() else {
            // External instances are routed to but never verified.
            return (Status::Valid, None);
        };
        if route.link_id.is_empty() {
            return (Status::Valid, Some(dir.to_path_buf()));
        }
        let Some(file) = self.find_document(dir, &route.link_id) else {
            return (Status::FileNotFound, None);
        };
        let status = Self::check_anchor(&file, fragment.as_deref());
        return (status, Some(file));
    }

    /// Doc id from a sidebar, looked up in the sidebar's own directory.
    fn resolve_sidebar_id(&self, reference: &Reference) -> (Status, Option<PathBuf>) {
        let Some(dir) = reference.source.parent() else {
            return (Status::FileNotFound, None);
        };
        return match self.find_document(dir, &doc_id::normalize_link_id(&reference.raw)) {
            None => (Status::FileNotFound, None),
            Some(file) => (Status::Valid, Some(file)),
        };
    }

    /// Dispatch on the reference kind after the mixed-language check.
    fn resolve_status(&self, reference: &Reference, document: &str) -> (Status, Option<PathBuf>) {
        let locale = self.locale_of(&reference.source);

        if reference.kind != ReferenceKind::AnchorOnly && self.is_mixed_language(&reference.raw, locale) {
            return (Status::MixedLanguage, None);
        }

        return match reference.kind {
            ReferenceKind::AnchorOnly => {
                let (_, fragment) = reference.split_fragment();
                (Self::check_anchor_in(document, fragment.as_deref()), None)
            },
            ReferenceKind::External => (self.resolve_external(&reference.raw, locale), None),
            ReferenceKind::Import => {
                let target = self.target_path(reference);
                match target {
                    Some(path) if path.is_file() => (Status::Valid, Some(path)),
                    _ => (Status::FileNotFound, None),
                }
            },
            ReferenceKind::RelativeLocal => {
                let Some(target) = self.target_path(reference).filter(|p| return p.is_file()) else {
                    return (Status::FileNotFound, None);
                };
                let (_, fragment) = reference.split_fragment();
                (Self::check_anchor(&target, fragment.as_deref()), Some(target))
            },
            ReferenceKind::RootRelative => self.resolve_route(reference, locale),
            ReferenceKind::SidebarDoc => self.resolve_sidebar_id(reference),
            ReferenceKind::Unclassified => (Status::Valid, None),
        };
    }

    /// Split a root-relative link into its instance and id. Prefers instances of
    /// `locale` and falls back to every instance when the locale has no match.
    pub fn route_target(&self, raw: &str, locale: Option<Locale>) -> Option<RouteTarget<'w>> {
        let (path, _) = split_fragment(raw);
        let path = strip_query(path);
        let instances = &self.workspace.instances;
        let instance = instances
            .resolve_route_in(path, locale)
            .or_else(|| return locale.and_then(|_| return instances.resolve_route(path)))?;

        let base_len = instance.route_base_path.split('/').filter(|s| return !s.is_empty()).count();
        let remainder = path
            .split('/')
            .filter(|s| return !s.is_empty())
            .skip(base_len)
            .collect::<Vec<_>>()
            .join("/");
        let decoded = urlencoding::decode(&remainder).map_or_else(|_err| return remainder.clone(), Cow::into_owned);
        let link_id = doc_id::normalize_link_id(&decoded);
        let canonical_id = doc_id::canonical_id(&link_id);
        return Some(RouteTarget { canonical_id, instance, link_id });
    }

    /// File a path-based reference points at, computed without touching the disk.
    /// Route references are looked up in the instance index instead.
    pub fn target_path(&self, reference: &Reference) -> Option<PathBuf> {
        let (path, _) = reference.split_fragment();
        let path = strip_query(path);
        let source_dir = reference.source.parent().unwrap_or(&self.workspace.root);

        return match reference.kind {
            ReferenceKind::Import => {
                if path.starts_with("./") || path.starts_with("../") {
                    return Some(paths::normalize_path(&source_dir.join(path)));
                }
                Some(paths::normalize_path(&self.workspace.root.join(path.trim_start_matches('/'))))
            },
            ReferenceKind::RelativeLocal => {
                let decoded = urlencoding::decode(path).map_or_else(|_err| return path.to_string(), Cow::into_owned);
                Some(paths::normalize_path(&source_dir.join(decoded)))
            },
            ReferenceKind::RootRelative => {
                let route = self.route_target(&reference.raw, self.locale_of(&reference.source))?;
                self.find_document(route.instance.dir()?, &route.link_id)
            },
            ReferenceKind::AnchorOnly
            | ReferenceKind::External
            | ReferenceKind::SidebarDoc
            | ReferenceKind::Unclassified => None,
        };
    }
}

/// Locale owning the host of an absolute URL, if any.
fn url_locale(config: &Config, raw: &str) -> Option<Locale> {
    if !is_http(raw) {
        return None;
    }
    let parsed = url::Url::parse(raw).ok()?;
    return config.domain_locale(parsed.host_str()?);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceSet;
    use crate::scanner::extract_references;

    /// Two-locale fixture site in a temp dir.
    fn site() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let write = |rel: &str, body: &str| {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        };
        write(
            "docuo.config.zh.json",
            r#"{"instances": [
                {"id": "aiagent-server-zh", "routeBasePath": "aiagent-server", "path": "core_products/aiagent/zh/server"},
                {"id": "ext", "routeBasePath": "external-docs", "path": "https://example.com/docs"}
            ]}"#,
        );
        write(
            "docuo.config.en.json",
            r#"{"instances": [
                {"id": "aiagent-server-en", "routeBasePath": "aiagent-server", "path": "core_products/aiagent/en/server"}
            ]}"#,
        );
        write("core_products/aiagent/zh/server/Quick Start.mdx", "# 快速开始\n\n## Step 1: Init\n");
        write("core_products/aiagent/zh/server/01-Guide/02-Install SDK.mdx", "## Install\n");
        write("core_products/aiagent/en/server/Quick Start.mdx", "# Quick Start\n");
        write("snippets/Common.mdx", "shared\n");

        let instances = InstanceSet::load_all(root).unwrap();
        let workspace = Workspace::new(root.to_path_buf(), Config::default(), instances);
        return (dir, workspace);
    }

    fn resolve_line(workspace: &Workspace, rel_source: &str, line: &str) -> Status {
        let source = workspace.root.join(rel_source);
        let refs = extract_references(line, &source);
        assert_eq!(refs.len(), 1, "expected one reference in {line}");
        let resolver = Resolver::new(workspace, None);
        return resolver.resolve(&refs[0], line).status;
    }

    const ZH_DOC: &str = "core_products/aiagent/zh/server/Quick Start.mdx";
    const EN_DOC: &str = "core_products/aiagent/en/server/Quick Start.mdx";

    #[test]
    fn root_relative_round_trip() {
        let (_dir, ws) = site();
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server/quick-start)"), Status::Valid);
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server/guide/install-sdk)"), Status::Valid);
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server/01-guide/02-install-sdk)"), Status::Valid);
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server/missing)"), Status::FileNotFound);
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/unknown-base/page)"), Status::InstanceNotFound);
    }

    #[test]
    fn every_document_resolves_by_its_own_route() {
        let (_dir, ws) = site();
        let resolver = Resolver::new(&ws, None);
        for instance in ws.instances.iter() {
            let Some(dir) = instance.dir() else { continue };
            for doc in scanner::documents(dir, &ws.root, &ws.config) {
                let route = ws.route_of(&doc).unwrap().route;
                let line = format!("[x]({route})");
                let refs = extract_references(&line, &doc);
                let result = resolver.resolve(&refs[0], &line);
                assert_eq!(result.status, Status::Valid, "{route}");
                assert_eq!(result.resolved_path.as_deref(), Some(doc.as_path()));
            }
        }
    }

    #[test]
    fn bare_instance_route_is_valid() {
        let (_dir, ws) = site();
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server)"), Status::Valid);
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server/)"), Status::Valid);
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server-old)"), Status::InstanceNotFound);
    }

    #[test]
    fn route_anchor_is_checked_in_target() {
        let (_dir, ws) = site();
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server/quick-start#step-1-init)"), Status::Valid);
        assert_eq!(resolve_line(&ws, ZH_DOC, "[a](/aiagent-server/quick-start#nope)"), Status::AnchorNotFound);
    }

    #[test]
    fn relative_links_are_decoded_and_anchor_checked() {
        let (_dir, ws) = site();
        let doc = "core_products/aiagent/zh/server/01-Guide/02-Install SDK.mdx";
        assert_eq!(resolve_line(&ws, doc, "[a](../Quick%20Start.mdx)"), Status::Valid);
        assert_eq!(resolve_line(&ws, doc, "[a](../Quick%20Start.mdx#step1init)"), Status::Valid);
        assert_eq!(resolve_line(&ws, doc, "[a](../Quick%20Start.mdx#install)"), Status::AnchorNotFound);
        assert_eq!(resolve_line(&ws, doc, "[a](./sibling.mdx)"), Status::FileNotFound);
    }

    #[test]
    fn anchor_only_uses_referencing_document() {
        let (_dir, ws) = site();
        let line = "## Setup\nSee [below](#setup) and [gone](#teardown).";
        let source = ws.root.join(ZH_DOC);
        let refs = extract_references(line, &source);
        let resolver = Resolver::new(&ws, None);
        let statuses: Vec<Status> = refs.iter().map(|r| resolver.resolve(r, line).status).collect();
        assert_eq!(statuses, vec![Status::Valid, Status::AnchorNotFound]);
    }

    #[test]
    fn imports_resolve_from_repo_root() {
        let (_dir, ws) = site();
        assert_eq!(resolve_line(&ws, ZH_DOC, "import C from '/snippets/Common.mdx'"), Status::Valid);
        assert_eq!(resolve_line(&ws, ZH_DOC, "import C from '/snippets/Missing.mdx'"), Status::FileNotFound);
    }

    #[test]
    fn mixed_language_depends_on_document_locale() {
        let (_dir, ws) = site();
        let line = "[x](https://example.zegocloud.com/docs/page)";
        assert_eq!(resolve_line(&ws, ZH_DOC, line), Status::MixedLanguage);
        assert_eq!(resolve_line(&ws, EN_DOC, line), Status::Valid);
        assert_eq!(resolve_line(&ws, EN_DOC, "see https://doc-zh.zego.im/article/1"), Status::MixedLanguage);
    }

    #[test]
    fn other_external_links_are_pending_without_prober() {
        let (_dir, ws) = site();
        assert_eq!(resolve_line(&ws, ZH_DOC, "[x](https://github.com/a/b)"), Status::ExternalPending);
    }

    #[test]
    fn routes_prefer_document_locale() {
        let (_dir, ws) = site();
        let resolver = Resolver::new(&ws, None);
        let zh = resolver.route_target("/aiagent-server/quick-start", Some(Locale::Zh)).unwrap();
        let en = resolver.route_target("/aiagent-server/quick-start", Some(Locale::En)).unwrap();
        assert_eq!(zh.instance.id, "aiagent-server-zh");
        assert_eq!(en.instance.id, "aiagent-server-en");
    }

    #[test]
    fn external_instances_are_not_verified() {
        let (_dir, ws) = site();
        assert_eq!(resolve_line(&ws, ZH_DOC, "[x](/external-docs/anything)"), Status::Valid);
    }
}
