//! Moving documents on disk, and batch rename plans built from such moves.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::Error;
use crate::paths;
use crate::updater::{Move, ReferenceUpdater, UpdateReport};
use crate::workspace::Workspace;

/// Plan file looked up at the repository root when none is given.
pub const DEFAULT_PLAN: &str = "rename.json";

/// One parsed plan action. Paths are relative to the target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `mkdir DIR`
    Mkdir {
        /// Directory to create.
        dir: String,
    },
    /// `mv SRC DST`, a file or a directory.
    Move {
        /// Source path.
        from: String,
        /// Destination path.
        to: String,
    },
    /// `mv-dir SRC DST`, a directory only.
    MoveDir {
        /// Source directory.
        from: String,
        /// Destination directory.
        to: String,
    },
}

impl Action {
    /// Parse an action string. The source is the first word after the command
    /// and the destination is the rest of the line, so only it may contain spaces.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPlan` for unknown commands or wrong argument counts.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| return Error::InvalidPlan { reason: format!("{reason}: `{text}`") };
        let mut parts = text.trim().splitn(3, ' ');
        let command = parts.next().unwrap_or_default();
        let first = parts.next().filter(|s| return !s.is_empty());
        let rest = parts.next().map(str::trim).filter(|s| return !s.is_empty());

        return match (command, first, rest) {
            ("mkdir", Some(dir), None) => Ok(Self::Mkdir { dir: dir.to_string() }),
            ("mkdir", _, _) => Err(invalid("mkdir takes one argument")),
            ("mv", Some(from), Some(to)) => Ok(Self::Move { from: from.to_string(), to: to.to_string() }),
            ("mv-dir", Some(from), Some(to)) => Ok(Self::MoveDir { from: from.to_string(), to: to.to_string() }),
            ("mv" | "mv-dir", _, _) => Err(invalid("move takes a source and a destination")),
            _ => Err(invalid("unknown action")),
        };
    }
}

/// A batch plan: every action applied inside every target directory.
#[derive(Debug, Clone, Deserialize)]
pub struct RenamePlan {
    /// Action strings, such as `mv a.mdx b.mdx`.
    pub action: Vec<String>,
    /// Directories, relative to the repository root, to apply every action in.
    pub target: Vec<String>,
}

impl RenamePlan {
    /// Parse every action string, failing on the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPlan` naming the first malformed action.
    pub fn actions(&self) -> Result<Vec<Action>, Error> {
        return self.action.iter().map(|a| return Action::parse(a)).collect();
    }

    /// Read a plan file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, or `Error::InvalidPlan`
    /// if it is not a JSON object with `target` and `action` arrays.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        return serde_json::from_str(&content).map_err(|e| return Error::InvalidPlan { reason: e.to_string() });
    }
}

/// One logged action result.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// The action string as written in the plan, or `all` for a skipped target.
    pub action: String,
    /// What happened, why it was skipped, or the error.
    pub message: String,
    /// When the action finished.
    pub timestamp: DateTime<Local>,
}

/// Results for one target directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetLog {
    /// Actions that hit an error.
    pub failed: Vec<LogEntry>,
    /// Actions that did not apply, with the reason.
    pub skipped: Vec<LogEntry>,
    /// Actions that completed.
    pub success: Vec<LogEntry>,
}

/// Result of running a plan.
#[derive(Debug, Clone)]
pub struct RenameLog {
    /// Per-target results, keyed by the target as written in the plan.
    pub details: BTreeMap<String, TargetLog>,
    /// When the last action finished.
    pub end_time: DateTime<Local>,
    /// When the plan started.
    pub start_time: DateTime<Local>,
}

/// Totals written at the top of a log file.
#[derive(Serialize)]
struct Summary {
    end_time: DateTime<Local>,
    start_time: DateTime<Local>,
    total_failed: usize,
    total_skipped: usize,
    total_success: usize,
    total_targets: usize,
}

/// On-disk shape of a log file.
#[derive(Serialize)]
struct LogFile<'l> {
    details: &'l BTreeMap<String, TargetLog>,
    summary: Summary,
}

impl RenameLog {
    /// Sum one list across all targets.
    fn count(&self, list: impl Fn(&TargetLog) -> usize) -> usize {
        return self.details.values().map(list).sum();
    }

    /// Number of failed actions.
    pub fn failed(&self) -> usize {
        return self.count(|t| return t.failed.len());
    }

    /// Number of skipped actions.
    pub fn skipped(&self) -> usize {
        return self.count(|t| return t.skipped.len());
    }

    /// Number of successful actions.
    pub fn succeeded(&self) -> usize {
        return self.count(|t| return t.success.len());
    }

    /// Write the log as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::JsonSer` if serialization fails or `Error::Io` if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let file = LogFile {
            details: &self.details,
            summary: Summary {
                end_time: self.end_time,
                start_time: self.start_time,
                total_failed: self.failed(),
                total_skipped: self.skipped(),
                total_success: self.succeeded(),
                total_targets: self.details.len(),
            },
        };
        let mut text = serde_json::to_string_pretty(&file)?;
        text.push('\n');
        std::fs::write(path, text)?;
        return Ok(());
    }
}

/// How one action ended.
enum Outcome {
    /// Not applied, with the reason.
    Skipped(String),
    /// Applied, with a description.
    Success(String),
}

/// Move a document or a directory of documents, then rewrite every reference
/// to the moved documents. Both paths must be absolute and inside the root.
///
/// # Errors
///
/// Returns `Error::OutsideWorkspace` if either path is outside the root,
/// `Error::Io` if the source is missing, the destination exists, or the move
/// fails, and any error from the reference update.
pub fn move_path(workspace: &Workspace, old: &Path, new: &Path) -> Result<UpdateReport, Error> {
    for path in [old, new] {
        if !path.starts_with(&workspace.root) {
            return Err(Error::OutsideWorkspace { path: path.to_path_buf() });
        }
    }
    if !old.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", old.display()),
        )));
    }
    if new.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", new.display()),
        )));
    }

    let moves = planned_moves(old, new);
    if let Some(parent) = new.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::rename(old, new)?;
    tracing::info!(from = %old.display(), to = %new.display(), documents = moves.len(), "moved");

    if moves.is_empty() {
        return Ok(UpdateReport::default());
    }
    return ReferenceUpdater::new(workspace, &moves).update_references();
}

/// Document moves implied by moving `old` to `new`: the file itself, or every
/// document below a directory.
fn planned_moves(old: &Path, new: &Path) -> Vec<Move> {
    if old.is_file() {
        if !paths::has_doc_extension(old) {
            return Vec::new();
        }
        return vec![Move { new: new.to_path_buf(), old: old.to_path_buf() }];
    }
    return WalkDir::new(old)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && paths::has_doc_extension(e.path()))
        .filter_map(|e| {
            let relative = e.path().strip_prefix(old).ok()?;
            return Some(Move { new: new.join(relative), old: e.path().to_path_buf() });
        })
        .collect();
}

/// Run a plan against the workspace. Every action is validated before any runs.
///
/// # Errors
///
/// Returns `Error::InvalidPlan` if any action string is malformed. Failures of
/// individual actions are recorded in the log instead.
pub fn run_plan(workspace: &Workspace, plan: &RenamePlan) -> Result<RenameLog, Error> {
    let actions = plan.actions()?;
    let start_time = Local::now();
    let mut details: BTreeMap<String, TargetLog> = BTreeMap::new();

    for target in &plan.target {
        let log = details.entry(target.clone()).or_default();
        let dir = paths::normalize_path(&workspace.root.join(target));
        if !dir.is_dir() {
            log.skipped.push(entry("all", format!("target directory does not exist: {target}")));
            tracing::warn!(target = %target, "skipping missing target directory");
            continue;
        }

        for (text, action) in plan.action.iter().zip(&actions) {
            match apply(workspace, &dir, action) {
                Err(e) => {
                    tracing::warn!(target = %target, action = %text, error = %e, "action failed");
                    log.failed.push(entry(text, e.to_string()));
                },
                Ok(Outcome::Skipped(reason)) => log.skipped.push(entry(text, reason)),
                Ok(Outcome::Success(message)) => log.success.push(entry(text, message)),
            }
        }
    }

    return Ok(RenameLog { details, end_time: Local::now(), start_time });
}

/// Apply one action inside `dir`.
fn apply(workspace: &Workspace, dir: &Path, action: &Action) -> Result<Outcome, Error> {
    match action {
        Action::Mkdir { dir: name } => {
            let path = dir.join(name);
            if path.exists() {
                return Ok(Outcome::Skipped(format!("directory already exists: {name}")));
            }
            std::fs::create_dir_all(&path)?;
            return Ok(Outcome::Success(format!("created directory {name}")));
        },
        Action::Move { from, to } | Action::MoveDir { from, to } => {
            let old = paths::normalize_path(&dir.join(from));
            let new = paths::normalize_path(&dir.join(to));
            if !old.exists() {
                return Ok(Outcome::Skipped(format!("source does not exist: {from}")));
            }
            if matches!(action, Action::MoveDir { .. }) && !old.is_dir() {
                return Ok(Outcome::Skipped(format!("source is not a directory: {from}")));
            }
            if new.exists() {
                return Ok(Outcome::Skipped(format!("destination already exists: {to}")));
            }
            let report = move_path(workspace, &old, &new)?;
            return Ok(Outcome::Success(format!(
                "moved {from} -> {to}, updated {} references",
                report.total()
            )));
        },
    }
}

/// Build a log entry stamped with the current time.
fn entry(action: &str, message: String) -> LogEntry {
    return LogEntry { action: action.to_string(), message, timestamp: Local::now() };
}
