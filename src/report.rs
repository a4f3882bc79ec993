//! Scanning instances for broken references and presenting the results.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Error;
use crate::external::Prober;
use crate::instance::Instance;
use crate::resolver::Resolver;
use crate::scanner;
use crate::sidebar::{SIDEBAR_FILE, SidebarFile};
use crate::types::{ResolutionResult, Status};
use crate::workspace::Workspace;

/// JSON form of a report.
#[derive(Serialize)]
struct JsonReport<'r> {
    files_checked: usize,
    problems: Vec<JsonProblem<'r>>,
}

/// JSON form of one problem.
#[derive(Serialize)]
struct JsonProblem<'r> {
    construct: &'static str,
    file: &'r Path,
    kind: &'static str,
    line: u32,
    line_content: &'r str,
    resolved_path: Option<&'r Path>,
    target: &'r str,
}

/// How `check` prints its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One JSON object on stdout.
    Json,
    /// Grouped human-readable listing.
    #[default]
    Text,
}

/// Outcome of checking one or more instances.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Documents scanned.
    pub files_checked: usize,
    /// Results that need attention, in scan order.
    pub problems: Vec<ResolutionResult>,
}

impl Report {
    /// Whether anything was reported.
    pub fn is_clean(&self) -> bool {
        return self.problems.is_empty();
    }
}

/// Drives extraction and resolution over instances.
pub struct Reporter<'w> {
    resolver: Resolver<'w>,
    workspace: &'w Workspace,
}

impl<'w> Reporter<'w> {
    /// Check several instances. Each document is checked as part of its
    /// innermost owning instance, so nested instances never double-report.
    pub fn check(&self, instances: &[&Instance]) -> Report {
        let mut report = Report::default();
        for instance in instances {
            if instance.dir().is_none() {
                tracing::debug!(instance = %instance.id, "skipping external instance");
                continue;
            }
            tracing::info!(instance = %instance.id, "checking instance");
            report.files_checked = report.files_checked.saturating_add(self.owned_documents(instance).len());
            report.problems.extend(self.scan(instance));
        }
        return report;
    }

    /// Create a reporter. Pass a prober to check external links.
    pub fn new(workspace: &'w Workspace, prober: Option<Prober>) -> Self {
        return Self { resolver: Resolver::new(workspace, prober), workspace };
    }

    /// Documents under the instance directory that no nested instance claims.
    fn owned_documents(&self, instance: &Instance) -> Vec<PathBuf> {
        let Some(dir) = instance.dir() else {
            return Vec::new();
        };
        let instances = &self.workspace.instances;
        return scanner::documents(dir, &self.workspace.root, &self.workspace.config)
            .into_iter()
            .filter(|doc| return instances.owning(doc).is_some_and(|owner| return owner.id == instance.id))
            .collect();
    }

    /// Every problem in one instance's documents and sidebar.
    pub fn scan(&self, instance: &Instance) -> Vec<ResolutionResult> {
        let Some(dir) = instance.dir() else {
            return Vec::new();
        };
        let mut problems = self.scan_documents(&self.owned_documents(instance));
        problems.extend(self.scan_sidebar(dir));
        return problems;
    }

    /// Resolve every reference in the given documents, keeping the problems.
    /// Unreadable documents are logged and skipped.
    fn scan_documents(&self, documents: &[PathBuf]) -> Vec<ResolutionResult> {
        let mut problems = Vec::new();
        for doc in documents {
            let Some(content) = scanner::read_document(doc) else {
                continue;
            };
            let references = scanner::extract_references(&content, doc);
            tracing::debug!(file = %doc.display(), references = references.len(), "scanned document");

            problems.extend(
                references
                    .iter()
                    .map(|r| return self.resolver.resolve(r, &content))
                    .filter(|result| return result.status.is_problem()),
            );
        }
        return problems;
    }

    /// Check doc ids of the instance's `sidebars.json`, if it has one.
    fn scan_sidebar(&self, dir: &Path) -> Vec<ResolutionResult> {
        let path = dir.join(SIDEBAR_FILE);
        if !path.is_file() {
            return Vec::new();
        }
        let file = match SidebarFile::load(&path) {
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable sidebar");
                return Vec::new();
            },
            Ok(file) => file,
        };
        return file
            .references()
            .iter()
            .map(|r| return self.resolver.resolve(r, ""))
            .filter(|result| return result.status.is_problem())
            .collect();
    }
}

/// Problems grouped by status, in report order.
pub fn group_by_kind(results: &[ResolutionResult]) -> BTreeMap<Status, Vec<&ResolutionResult>> {
    let mut groups: BTreeMap<Status, Vec<&ResolutionResult>> = BTreeMap::new();
    for result in results {
        groups.entry(result.status).or_default().push(result);
    }
    return groups;
}

/// Serialize a report for `--format json`.
///
/// # Errors
///
/// Returns `Error::JsonSer` if serialization fails.
pub fn render_json(report: &Report) -> Result<String, Error> {
    let problems = report
        .problems
        .iter()
        .map(|p| {
            return JsonProblem {
                construct: p.reference.construct.tag(),
                file: &p.reference.source,
                kind: p.status.slug(),
                line: p.reference.line,
                line_content: &p.reference.line_content,
                resolved_path: p.resolved_path.as_deref(),
                target: &p.reference.raw,
            };
        })
        .collect();
    let json = JsonReport { files_checked: report.files_checked, problems };
    return Ok(serde_json::to_string_pretty(&json)?);
}

/// Render a report as text: counts per kind, then each problem as a
/// `"path":line` location line followed by the target and the line content.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let groups = group_by_kind(&report.problems);

    let _ = writeln!(out, "Checked {} documents.", report.files_checked);
    if groups.is_empty() {
        out.push_str("No broken references found.\n");
        return out;
    }

    out.push_str("\nSummary:\n");
    for (status, items) in &groups {
        let _ = writeln!(out, "  {}: {}", status.label(), items.len());
    }

    for (status, items) in &groups {
        let _ = writeln!(out, "\n{} ({}):", status.label(), items.len());
        for item in items {
            let reference = &item.reference;
            let _ = writeln!(out, "\"{}\":{}", reference.source.display(), reference.line);
            let _ = writeln!(out, "    [{}] {}", reference.construct.tag(), reference.raw);
            let _ = writeln!(out, "    {}", reference.line_content);
        }
    }
    return out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::instance::InstanceSet;

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
            r#"{"instances": [{"id": "server", "routeBasePath": "server", "path": "docs"}]}"#,
        );
        write(
            "docs/sidebars.json",
            r#"{"s": [{"type": "doc", "id": "intro"}, {"type": "doc", "id": "gone"}]}"#,
        );
        write(
            "docs/Intro.mdx",
            "# Intro\n\n[ok](/server/intro)\n[bad](/server/nothing)\n[ext](https://github.com)\n[mix](https://www.zegocloud.com/x)\n",
        );
        let instances = InstanceSet::load_all(root).unwrap();
        let workspace = Workspace::new(root.to_path_buf(), Config::default(), instances);
        return (dir, workspace);
    }

    #[test]
    fn scan_reports_only_problems() {
        let (_dir, ws) = site();
        let reporter = Reporter::new(&ws, None);
        let instance = ws.instances.get("server").unwrap();
        let problems = reporter.scan(instance);
        let statuses: Vec<Status> = problems.iter().map(|p| p.status).collect();
        assert_eq!(statuses, vec![Status::FileNotFound, Status::MixedLanguage, Status::FileNotFound]);
        assert_eq!(problems[2].reference.raw, "gone");
        assert_eq!(problems[2].reference.line, 1);
    }

    #[test]
    fn groups_follow_report_order() {
        let (_dir, ws) = site();
        let report = Reporter::new(&ws, None).check(&ws.instances.iter().collect::<Vec<_>>());
        let groups = group_by_kind(&report.problems);
        let keys: Vec<Status> = groups.keys().copied().collect();
        assert_eq!(keys, vec![Status::MixedLanguage, Status::FileNotFound]);
        assert_eq!(groups[&Status::FileNotFound].len(), 2);
    }

    #[test]
    fn text_output_has_clickable_locations() {
        let (_dir, ws) = site();
        let report = Reporter::new(&ws, None).check(&ws.instances.iter().collect::<Vec<_>>());
        let text = render_text(&report);
        let location = format!("\"{}\":4", ws.root.join("docs/Intro.mdx").display());
        assert!(text.contains(&location), "{text}");
        assert!(text.contains("    [markdown] /server/nothing"));
        assert!(text.contains("  file not found: 2"));
    }

    #[test]
    fn clean_report_says_so() {
        let report = Report { files_checked: 3, problems: Vec::new() };
        assert!(report.is_clean());
        assert!(render_text(&report).ends_with("No broken references found.\n"));
    }

    #[test]
    fn json_output_names_every_field() {
        let (_dir, ws) = site();
        let report = Reporter::new(&ws, None).check(&ws.instances.iter().collect::<Vec<_>>());
        let value: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
        assert_eq!(value["files_checked"], 1);
        let first = &value["problems"][0];
        assert_eq!(first["kind"], "file-not-found");
        assert_eq!(first["target"], "/server/nothing");
        assert_eq!(first["construct"], "markdown");
        assert_eq!(first["line"], 4);
        assert!(first["resolved_path"].is_null());
    }
}
