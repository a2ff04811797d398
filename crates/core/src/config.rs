//! TOML-based configuration for prlabeler.
//!
//! The GitHub token is never stored in the file: `github.token_env` names the
//! environment variable holding it, and [`AppConfig::resolve_env_vars`] reads
//! it at runtime. A `.env` file can supply it; see [`load_dotenv`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::models::{PrState, RepoRef};
use crate::name_filter::ALGORITHMS_LABEL;
use crate::reconciler::{LabelPolicy, MERGE_CONFLICT_LABEL, NEEDS_REVIEW_LABEL};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub API and organization settings.
    pub github: GitHubConfig,

    /// Label names used by each job.
    #[serde(default)]
    pub labels: LabelsConfig,

    /// Where the list of repositories comes from.
    #[serde(default)]
    pub repos: ReposConfig,

    /// Per-run behaviour.
    #[serde(default)]
    pub run: RunConfig,
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API base URL (default `https://api.github.com`).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Organization (or user) that owns the repositories.
    pub owner: String,

    /// Environment variable holding the access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "AUTH_KEY".into()
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// Applied when new commits land after the last label.
    #[serde(default = "default_needs_review")]
    pub needs_review: String,

    /// Added to reviewed pull requests that cannot be merged.
    #[serde(default = "default_merge_conflict")]
    pub merge_conflict: String,

    /// Applied by the title-matching job.
    #[serde(default = "default_name_match")]
    pub name_match: String,
}

fn default_needs_review() -> String {
    NEEDS_REVIEW_LABEL.into()
}
fn default_merge_conflict() -> String {
    MERGE_CONFLICT_LABEL.into()
}
fn default_name_match() -> String {
    ALGORITHMS_LABEL.into()
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            needs_review: default_needs_review(),
            merge_conflict: default_merge_conflict(),
            name_match: default_name_match(),
        }
    }
}

// ---------------------------------------------------------------------------
// Repository selection
// ---------------------------------------------------------------------------

/// Where the reconciliation job gets its repository list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepoSource {
    /// Enumerate every repository of `github.owner`.
    #[default]
    Organization,
    /// Use `repos.names`.
    List,
    /// Read the `repos` table of `repos.database_path`.
    Database,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReposConfig {
    #[serde(default)]
    pub source: RepoSource,

    /// Repository names; bare names are qualified with `github.owner`.
    #[serde(default)]
    pub names: Vec<String>,

    /// SQLite database holding a `repos` table.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Run behaviour
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Which pull requests the reconciliation job visits.
    #[serde(default)]
    pub pr_state: PrState,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log decisions without writing labels.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pr_state: PrState::default(),
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `github.token_env`. A missing variable only logs a warning;
    /// use [`require_token`](Self::require_token) where a token is mandatory.
    pub fn resolve_env_vars(&mut self) {
        self.github.token = resolve_optional_env(&self.github.token_env, "github.token_env");
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.owner.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.owner".into(),
                detail: "owner must not be empty".into(),
            });
        }
        if self.github.owner.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "github.owner".into(),
                detail: "owner is an organization or user name, not 'owner/repo'".into(),
            });
        }

        let labels = [
            ("labels.needs_review", &self.labels.needs_review),
            ("labels.merge_conflict", &self.labels.merge_conflict),
            ("labels.name_match", &self.labels.name_match),
        ];
        for (field, value) in labels {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "label name must not be empty".into(),
                });
            }
        }
        if self.labels.needs_review == self.labels.merge_conflict {
            return Err(ConfigError::InvalidValue {
                field: "labels.merge_conflict".into(),
                detail: "must differ from labels.needs_review".into(),
            });
        }

        match self.repos.source {
            RepoSource::List if self.repos.names.is_empty() => {
                return Err(ConfigError::InvalidValue {
                    field: "repos.names".into(),
                    detail: "at least one repository is required when source = \"list\"".into(),
                });
            }
            RepoSource::Database if self.repos.database_path.is_none() => {
                return Err(ConfigError::InvalidValue {
                    field: "repos.database_path".into(),
                    detail: "required when source = \"database\"".into(),
                });
            }
            _ => {}
        }
        self.configured_repos()?;

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// The resolved token, or an error naming the variable to set.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.github
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: self.github.token_env.clone(),
                field: "github.token_env".into(),
            })
    }

    /// `repos.names` qualified with `github.owner`, deduplicated in order.
    pub fn configured_repos(&self) -> Result<Vec<RepoRef>, ConfigError> {
        self.qualify_repos(&self.repos.names)
    }

    /// Qualify bare repository names with `github.owner`, dropping repeats.
    pub fn qualify_repos<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<RepoRef>, ConfigError> {
        let mut seen = HashSet::new();
        let mut repos = Vec::new();
        for name in names {
            let repo = RepoRef::qualify(name.as_ref(), &self.github.owner)?;
            if seen.insert(repo.clone()) {
                repos.push(repo);
            }
        }
        Ok(repos)
    }

    /// The reconciler's label policy.
    pub fn label_policy(&self) -> LabelPolicy {
        LabelPolicy {
            stale_label: self.labels.needs_review.clone(),
            conflict_label: self.labels.merge_conflict.clone(),
            dry_run: self.run.dry_run,
        }
    }
}

/// Load `KEY=value` pairs from the nearest `.env` (working directory or a
/// parent) into the process environment. Variables already set win.
/// Returns the file that was read, or `None` when there is none.
pub fn load_dotenv() -> Result<Option<PathBuf>, ConfigError> {
    match dotenvy::dotenv() {
        Ok(path) => {
            info!(path = %path.display(), "loaded .env");
            Ok(Some(path))
        }
        Err(e) if e.not_found() => {
            debug!("no .env file found");
            Ok(None)
        }
        Err(e) => Err(ConfigError::ParseError(format!(".env: {e}"))),
    }
}

/// Like [`load_dotenv`] for an explicit file.
pub fn load_env_file<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    dotenvy::from_path(path)
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "loaded env file");
    Ok(())
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
