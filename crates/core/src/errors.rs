//! Error types for the prlabeler core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. The CLI
//! wraps them in `anyhow` with context.

use thiserror::Error;

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from GitHub REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Authentication token is missing or invalid.
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    /// The addressed resource does not exist (e.g. removing an absent label).
    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    /// A request URL could not be built or a response could not be decoded.
    #[error("GitHub response parse error: {0}")]
    ParseError(String),
}

impl GitHubError {
    /// True for a 404 from the API.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ---------------------------------------------------------------------------
// Reconciliation errors
// ---------------------------------------------------------------------------

/// A failure while reconciling one pull request.
///
/// Every variant names the pull request so a batch report can be read
/// without the surrounding log context.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to fetch timeline for {repo}#{number}: {source}")]
    TimelineFetch {
        repo: String,
        number: u64,
        #[source]
        source: GitHubError,
    },

    #[error("failed to list labels on {repo}#{number}: {source}")]
    LabelFetch {
        repo: String,
        number: u64,
        #[source]
        source: GitHubError,
    },

    #[error("failed to query mergeability of {repo}#{number}: {source}")]
    Mergeability {
        repo: String,
        number: u64,
        #[source]
        source: GitHubError,
    },

    #[error("failed to add label '{label}' to {repo}#{number}: {source}")]
    LabelWrite {
        repo: String,
        number: u64,
        label: String,
        #[source]
        source: GitHubError,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite repository list.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed { version: u32, detail: String },

    /// Generic I/O error (e.g. file permissions).
    #[error("database I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
