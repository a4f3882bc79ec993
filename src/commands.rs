//! CLI commands for mdxref: check, instances, id, anchors, mv, rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::anchor;
use crate::config::Config;
use crate::error::Error;
use crate::external::Prober;
use crate::instance::{Instance, InstanceSet, InstanceTarget};
use crate::paths;
use crate::rename::{self, RenamePlan};
use crate::report::{self, OutputFormat, Reporter};
use crate::types::Locale;
use crate::updater::{Rewrite, UpdateReport};
use crate::workspace::Workspace;

/// Group heading for instances without `navigationInfo.group.name`.
const UNGROUPED: &str = "Ungrouped";

/// Options of `mdxref check`.
#[derive(Debug, Clone, clap::Args)]
pub struct CheckArgs {
    /// Instance config file (defaults to `docuo.config.<locale>.json` at the root)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Probe external links over the network
    #[arg(long)]
    pub external: bool,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Only check these instance ids (repeatable)
    #[arg(long = "instance", value_name = "ID")]
    pub instances: Vec<String>,
    /// Site locale to check
    #[arg(long, value_enum)]
    pub locale: Option<Locale>,
    /// Report problems but exit 0
    #[arg(long)]
    pub warn_only: bool,
}

/// Print every anchor a document offers, one per line.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read.
pub fn anchors(file: &Path) -> Result<(), Error> {
    let content = std::fs::read_to_string(file)?;
    for anchor in anchor::headings(&content) {
        println!("{anchor}");
    }
    return Ok(());
}

/// Check the selected instances and print the report.
/// Exit code 1 when problems were found, unless `warn_only` is set.
///
/// # Errors
///
/// Returns config errors, `Error::UnknownInstance` for a bad `--instance`,
/// and `Error::HttpClient` if `--external` cannot set up its client.
pub fn check(root: &Path, args: &CheckArgs) -> Result<ExitCode, Error> {
    let config = Config::load(root)?;
    let instances = load_instances(root, args.locale, args.config.as_deref())?;
    let workspace = Workspace::new(root.to_path_buf(), config, instances);

    let selected = select_instances(&workspace.instances, &args.instances, args.locale)?;
    let prober = if args.external {
        Some(Prober::new(&workspace.config.external)?)
    } else {
        None
    };

    let report = Reporter::new(&workspace, prober).check(&selected);
    tracing::info!(files = report.files_checked, problems = report.problems.len(), "check finished");

    match args.format {
        OutputFormat::Json => println!("{}", report::render_json(&report)?),
        OutputFormat::Text => print!("{}", report::render_text(&report)),
    }

    if report.is_clean() || args.warn_only {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(1));
}

/// Print the owning instance, document id, and public route of a file.
/// Exit code 1 when no instance contains the file.
///
/// # Errors
///
/// Returns config errors, or `Error::Io` if the current directory is unavailable.
pub fn id(root: &Path, file: &Path) -> Result<ExitCode, Error> {
    let workspace = Workspace::new(root.to_path_buf(), Config::load(root)?, InstanceSet::load_all(root)?);
    let file = paths::absolutize(file)?;

    let Some(route) = workspace.route_of(&file) else {
        eprintln!("{} is not inside any local instance", file.display());
        return Ok(ExitCode::from(1));
    };
    println!("instance: {}", route.instance.id);
    println!("locale:   {}", route.instance.locale);
    println!("id:       {}", route.id);
    println!("route:    {}", route.route);
    return Ok(ExitCode::SUCCESS);
}

/// List instances grouped by navigation group.
///
/// # Errors
///
/// Returns config errors.
pub fn instances(root: &Path, locale: Option<Locale>, config: Option<&Path>) -> Result<(), Error> {
    let set = load_instances(root, locale, config)?;
    let mut groups: BTreeMap<String, Vec<&Instance>> = BTreeMap::new();
    let mut ungrouped: Vec<&Instance> = Vec::new();

    for instance in set.iter().filter(|i| return locale.is_none_or(|l| return i.locale == l)) {
        let group = instance.navigation.group.as_ref().and_then(|g| return g.name.clone());
        match group {
            Some(name) => groups.entry(name).or_default().push(instance),
            None => ungrouped.push(instance),
        }
    }

    let mut sections: Vec<(String, Vec<&Instance>)> = groups.into_iter().collect();
    if !ungrouped.is_empty() {
        sections.push((UNGROUPED.to_string(), ungrouped));
    }

    for (name, mut members) in sections {
        members.sort_by_cached_key(|i| return i.display_name());
        println!("{name}");
        for instance in members {
            let location = match &instance.target {
                InstanceTarget::External(url) => url.clone(),
                InstanceTarget::Local(dir) => {
                    paths::to_slash(dir.strip_prefix(root).unwrap_or(dir))
                },
            };
            println!(
                "  {}  [{}]  /{}  {location}",
                instance.display_name(),
                instance.id,
                instance.route_base_path
            );
        }
        println!();
    }
    return Ok(());
}

/// Instances from `--config`, or from the locale's config file at the root.
fn load_instances(root: &Path, locale: Option<Locale>, config: Option<&Path>) -> Result<InstanceSet, Error> {
    let path = match config {
        Some(path) => paths::absolutize(path)?,
        None => InstanceSet::find_config(root, locale.unwrap_or(Locale::Zh))?,
    };
    tracing::debug!(config = %path.display(), "loading instances");
    return InstanceSet::load(root, &path);
}

/// Move a document or directory and fix every reference to it.
///
/// # Errors
///
/// Returns config errors, `Error::OutsideWorkspace`, or I/O errors from the move.
pub fn mv(root: &Path, old: &Path, new: &Path) -> Result<(), Error> {
    let workspace = Workspace::new(root.to_path_buf(), Config::load(root)?, InstanceSet::load_all(root)?);
    let old = paths::absolutize(old)?;
    let new = paths::absolutize(new)?;

    let report = rename::move_path(&workspace, &old, &new)?;
    println!("Moved {} -> {}", old.display(), new.display());
    print_update_report(&report);
    return Ok(());
}

/// Print each rewrite under its kind, then the totals.
fn print_update_report(report: &UpdateReport) {
    let sections: [(&str, &[Rewrite]); 4] = [
        ("imports", &report.import_refs),
        ("relative links", &report.link_refs),
        ("site routes", &report.internal_link_refs),
        ("sidebar ids", &report.sidebar_refs),
    ];
    for (label, rewrites) in sections {
        if rewrites.is_empty() {
            continue;
        }
        println!("\nUpdated {label} ({}):", rewrites.len());
        for rewrite in rewrites {
            if rewrite.line == 0 {
                println!("\"{}\"", rewrite.file.display());
            } else {
                println!("\"{}\":{}", rewrite.file.display(), rewrite.line);
            }
            println!("    {} -> {}", rewrite.old, rewrite.new);
        }
    }
    println!("\n{} references updated in {} files", report.total(), report.files_changed());
}

/// Run a batch rename plan and print a per-target summary.
/// Exit code 1 when any action failed.
///
/// # Errors
///
/// Returns config errors, `Error::InvalidPlan` for a malformed plan, or
/// errors writing the log file.
pub fn rename(root: &Path, plan: Option<&Path>, log: Option<&Path>) -> Result<ExitCode, Error> {
    let plan_path = match plan {
        Some(path) => paths::absolutize(path)?,
        None => root.join(rename::DEFAULT_PLAN),
    };
    let plan = RenamePlan::load(&plan_path)?;
    let workspace = Workspace::new(root.to_path_buf(), Config::load(root)?, InstanceSet::load_all(root)?);

    tracing::info!(plan = %plan_path.display(), targets = plan.target.len(), actions = plan.action.len(), "running plan");
    let result = rename::run_plan(&workspace, &plan)?;

    for (target, entries) in &result.details {
        println!(
            "{target}: {} succeeded, {} failed, {} skipped",
            entries.success.len(),
            entries.failed.len(),
            entries.skipped.len()
        );
        for entry in &entries.failed {
            println!("  failed  {}: {}", entry.action, entry.message);
        }
        for entry in &entries.skipped {
            println!("  skipped {}: {}", entry.action, entry.message);
        }
    }

    if let Some(path) = log {
        result.write(path)?;
        println!("Log written to {}", path.display());
    }

    if result.failed() > 0 {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Instances named with `--instance`, or every local instance of the locale.
fn select_instances<'s>(
    set: &'s InstanceSet,
    ids: &[String],
    locale: Option<Locale>,
) -> Result<Vec<&'s Instance>, Error> {
    if ids.is_empty() {
        return Ok(set
            .iter()
            .filter(|i| return i.dir().is_some() && locale.is_none_or(|l| return i.locale == l))
            .collect());
    }
    return ids
        .iter()
        .map(|id| return set.get(id).ok_or_else(|| return Error::UnknownInstance { id: id.clone() }))
        .collect();
}
