mod anchor;
mod classify;
mod commands;
mod config;
mod diagnostics;
mod doc_id;
mod error;
mod external;
mod fence;
mod instance;
mod logging;
mod paths;
mod rename;
mod report;
mod resolver;
mod scanner;
mod sidebar;
mod types;
mod updater;
mod workspace;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::CheckArgs;
use crate::error::Error;
use crate::report::OutputFormat;
use crate::types::Locale;

/// Global flags plus the chosen subcommand.
#[derive(Parser)]
#[command(
    name = "mdxref",
    version,
    about = "Check and maintain cross-references in multi-instance MDX documentation"
)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Only print errors
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Repository root (defaults to the nearest directory with a docuo config, .git, or package.json)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Print debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the anchors a document offers
    Anchors {
        /// Document to read
        file: PathBuf,
    },
    /// Report broken references across instances
    Check(CheckArgs),
    /// Show the instance, document id, and route of a file
    Id {
        /// Document inside an instance
        file: PathBuf,
    },
    /// List configured instances by navigation group
    Instances {
        /// Instance config file (defaults to `docuo.config.<locale>.json` at the root)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only list instances of this locale
        #[arg(long, value_enum)]
        locale: Option<Locale>,
    },
    /// Move a document or directory and update every reference to it
    Mv {
        /// Current path
        old: PathBuf,
        /// Destination path
        new: PathBuf,
    },
    /// Run a batch rename plan against several instance directories
    Rename {
        /// Write a JSON log of every action to this file
        #[arg(long, value_name = "FILE")]
        log: Option<PathBuf>,
        /// Plan file (defaults to `rename.json` at the root)
        plan: Option<PathBuf>,
    },
}

impl Commands {
    /// Whether stdout carries machine-readable output that logging must not disturb.
    fn is_machine_output(&self) -> bool {
        return matches!(self, Self::Check(args) if matches!(args.format, OutputFormat::Json));
    }
}

/// Parse flags, run the command, and map fatal errors to exit code 2.
fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(logging::level_for(cli.verbose, cli.quiet, cli.command.is_machine_output()));

    return match run(cli) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}

/// Repository root: `--root` if given, else found by climbing from the current directory.
///
/// # Errors
///
/// Returns `Error::Io` if the current directory cannot be determined.
fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    if let Some(root) = explicit {
        return paths::absolutize(root);
    }
    let cwd = paths::absolutize(Path::new("."))?;
    return Ok(instance::find_repo_root(&cwd));
}

/// Dispatch the parsed command.
///
/// # Errors
///
/// Returns any fatal error from the command; reported problems are exit codes, not errors.
fn run(cli: Cli) -> Result<ExitCode, Error> {
    let root = resolve_root(cli.root.as_deref())?;
    tracing::debug!(root = %root.display(), "repository root");

    return match cli.command {
        Commands::Anchors { file } => commands::anchors(&file).map(|()| return ExitCode::SUCCESS),
        Commands::Check(args) => commands::check(&root, &args),
        Commands::Id { file } => commands::id(&root, &file),
        Commands::Instances { config, locale } => {
            commands::instances(&root, locale, config.as_deref()).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Mv { old, new } => commands::mv(&root, &old, &new).map(|()| return ExitCode::SUCCESS),
        Commands::Rename { log, plan } => commands::rename(&root, plan.as_deref(), log.as_deref()),
    };
}
