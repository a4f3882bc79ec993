//! Crate-level error types for mdxref diagnostics.

use std::path::PathBuf;

/// Fatal errors that abort a command. Per-reference failures are not errors;
/// they are `Status` values collected into the report.
/// Each variant names the file or value that caused the failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No instance config file could be found.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path that was expected to hold the config.
        path: PathBuf,
    },

    /// An instance config file exists but is not valid JSON of the expected shape.
    #[error("config parse error: {}: {reason}", path.display())]
    ConfigParse {
        /// Config file that failed to parse.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The blocking HTTP client for external checks could not be built.
    #[error("http client: {reason}")]
    HttpClient {
        /// Description of the client setup failure.
        reason: String,
    },

    /// A rename plan is malformed.
    #[error("invalid rename plan: {reason}")]
    InvalidPlan {
        /// What is wrong with the plan.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of a report or rename log failed.
    #[error("json serialize: {0}")]
    JsonSer(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A path given on the command line lies outside the repository root.
    #[error("path is outside the repository root: {}", path.display())]
    OutsideWorkspace {
        /// The offending path.
        path: PathBuf,
    },

    /// A `sidebars.json` file cannot be parsed or serialized.
    #[error("sidebar parse error: {}: {reason}", path.display())]
    SidebarParse {
        /// Sidebar file that failed.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// TOML deserialization of `.mdxref.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// No configured instance has the requested id.
    #[error("unknown instance: `{id}`")]
    UnknownInstance {
        /// Instance id that was not found.
        id: String,
    },
}
