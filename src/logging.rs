//! Logging initialization.
//!
//! Diagnostics go to stderr through a `tracing` fmt subscriber so stdout only
//! ever carries command output.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pick the log level from the global flags. Machine-readable output drops to
/// errors only unless `--verbose` was given explicitly.
pub const fn level_for(verbose: bool, quiet: bool, machine_output: bool) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    if quiet || machine_output {
        return Level::ERROR;
    }
    return Level::WARN;
}

/// Install the global subscriber. Safe to call once per process; a second
/// call leaves the first subscriber in place.
pub fn init(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging already initialized: {e}");
    }
}
