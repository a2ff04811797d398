//! prlabeler command-line tool.
//!
//! Runs label reconciliation and title-based labeling against a GitHub
//! organization, manages the optional repository database, and generates /
//! validates configuration files.

mod report;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use prlabeler_core::config::{load_dotenv, AppConfig, RepoSource};
use prlabeler_core::db::Database;
use prlabeler_core::{GitHubClient, NameFilterLabeler, ReconcileBatch, Reconciler, RepoSelection};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Pull-request label reconciliation for GitHub organizations.
#[derive(Parser, Debug)]
#[command(
    name = "prlabeler",
    version,
    about = "Keep pull-request review labels in step with commit activity"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "./prlabeler.toml")]
    config: String,

    /// Log level (overrides `[run].log_level`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile review and conflict labels.
    Reconcile {
        /// Only these repositories (`name` or `owner/name`); repeatable.
        #[arg(long = "repo")]
        repos: Vec<String>,

        /// Log decisions without changing any label.
        #[arg(long)]
        dry_run: bool,
    },

    /// Label every pull request whose title contains NEEDLE.
    LabelByName {
        /// Case-sensitive substring to look for in titles.
        needle: String,

        /// Label to apply (default: `[labels].name_match`).
        #[arg(long)]
        label: Option<String>,

        /// List matches without labeling them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage the repository database.
    Repos {
        #[command(subcommand)]
        action: ReposAction,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./prlabeler.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(Subcommand, Debug)]
enum ReposAction {
    /// List repository names stored in the database.
    List,
    /// Add repository names in one transaction.
    Add {
        /// Repository names (`name` or `owner/name`).
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Remove a repository name.
    Remove {
        /// Repository name exactly as stored.
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    load_dotenv().context("failed to read .env")?;
    let config_path = expand_tilde(&cli.config);

    match cli.command {
        Commands::Init { output } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_init(&output)
        }
        Commands::Validate => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            cmd_validate(&config_path)
        }
        command => {
            let config = load_config(&config_path)?;
            init_logging(
                cli.log_level
                    .as_deref()
                    .unwrap_or(config.run.log_level.as_str()),
            );

            match command {
                Commands::Reconcile { repos, dry_run } => {
                    cmd_reconcile(&config, &repos, dry_run).await
                }
                Commands::LabelByName {
                    needle,
                    label,
                    dry_run,
                } => cmd_label_by_name(&config, &needle, label, dry_run).await,
                Commands::Repos { action } => cmd_repos(&config, action),
                Commands::Init { .. } | Commands::Validate => unreachable!(),
            }
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn github_client(config: &AppConfig) -> Result<GitHubClient> {
    let token = config
        .require_token()
        .context("a GitHub token is required")?;
    GitHubClient::new(&config.github.api_url, token).context("failed to build GitHub client")
}

fn repo_database_path(config: &AppConfig) -> Result<PathBuf> {
    let path = config
        .repos
        .database_path
        .as_ref()
        .context("[repos].database_path is not set")?;
    Ok(expand_tilde(&path.to_string_lossy()))
}

/// Repositories a reconcile run visits: `--repo` flags first, then the
/// configured source.
fn resolve_selection(config: &AppConfig, cli_repos: &[String]) -> Result<RepoSelection> {
    if !cli_repos.is_empty() {
        let repos = config
            .qualify_repos(cli_repos)
            .context("invalid --repo value")?;
        return Ok(RepoSelection::Explicit(repos));
    }

    let selection = match config.repos.source {
        RepoSource::Organization => RepoSelection::Organization(config.github.owner.clone()),
        RepoSource::List => RepoSelection::Explicit(config.configured_repos()?),
        RepoSource::Database => {
            let path = repo_database_path(config)?;
            let db = Database::open_read_only(&path).with_context(|| {
                format!("failed to open repository database {}", path.display())
            })?;
            let names = db
                .list_repo_names()
                .context("failed to read repository names")?;
            RepoSelection::Explicit(
                config
                    .qualify_repos(&names)
                    .context("invalid repository name in database")?,
            )
        }
    };
    Ok(selection)
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_reconcile(config: &AppConfig, repos: &[String], dry_run: bool) -> Result<()> {
    let selection = resolve_selection(config, repos)?;
    let client = github_client(config)?;

    let mut policy = config.label_policy();
    policy.dry_run |= dry_run;
    if policy.dry_run {
        println!("{}", style::warn("Dry run: no labels will be changed"));
    }

    let reconciler = Reconciler::new(&client, &client, &client, policy);
    let report = ReconcileBatch::new(&client, reconciler, config.run.pr_state)
        .run(&selection)
        .await;

    report::print_batch(&report);
    info!(clean = report.is_clean(), "reconcile finished");
    Ok(())
}

async fn cmd_label_by_name(
    config: &AppConfig,
    needle: &str,
    label: Option<String>,
    dry_run: bool,
) -> Result<()> {
    if needle.is_empty() {
        anyhow::bail!("NEEDLE must not be empty");
    }
    let client = github_client(config)?;
    let label = label.unwrap_or_else(|| config.labels.name_match.clone());
    let dry_run = dry_run || config.run.dry_run;
    if dry_run {
        println!("{}", style::warn("Dry run: no labels will be changed"));
    }

    let report = NameFilterLabeler::new(&client, &client, label.as_str())
        .dry_run(dry_run)
        .run(&config.github.owner, needle)
        .await
        .with_context(|| format!("failed to list repositories of {}", config.github.owner))?;

    report::print_name_matches(&report, &label);
    Ok(())
}

fn cmd_repos(config: &AppConfig, action: ReposAction) -> Result<()> {
    let db = Database::new(repo_database_path(config)?)
        .context("failed to open repository database")?;
    db.initialize()
        .context("failed to initialize repository database")?;

    match action {
        ReposAction::List => {
            let names = db
                .list_repo_names()
                .context("failed to read repository names")?;
            if names.is_empty() {
                println!("No repositories stored.");
            }
            for name in names {
                println!("{}", name);
            }
        }
        ReposAction::Add { names } => {
            // Reject names that could never be qualified.
            config.qualify_repos(&names)?;
            let added = db.add_repos(&names).context("failed to add repositories")?;
            println!(
                "{}",
                style::success(&format!(
                    "Added {} of {} repositories ({} already stored)",
                    added,
                    names.len(),
                    names.len() - added
                ))
            );
        }
        ReposAction::Remove { name } => {
            if db
                .remove_repo(&name)
                .context("failed to remove repository")?
            {
                println!("{}", style::success(&format!("Removed {}", name)));
            } else {
                anyhow::bail!("{} is not stored", name);
            }
        }
    }
    Ok(())
}

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# prlabeler configuration

[github]
api_url = "https://api.github.com"
owner = "your-org"
# Environment variable holding a token with repo scope.
token_env = "AUTH_KEY"

[labels]
needs_review = "needs review"
merge_conflict = "merge conflict"
name_match = "algorithms"

[repos]
# organization | list | database
source = "organization"
# names = ["repo-a", "other-org/repo-b"]
# database_path = "repos.db"

[run]
# open | closed | all
pr_state = "open"
log_level = "info"
dry_run = false
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Set [github].owner to your organization");
    println!("  2. Export the token variable (AUTH_KEY by default)");
    println!(
        "  3. Validate with: prlabeler validate --config {}",
        output.display()
    );
    println!(
        "  4. Preview with:  prlabeler reconcile --dry-run --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config.resolve_env_vars();
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  API URL       : {}", config.github.api_url);
    println!("  Owner         : {}", config.github.owner);
    println!(
        "  Token ({})  : {}",
        config.github.token_env,
        if config.github.token.is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!(
        "  Labels        : {:?} / {:?} / {:?}",
        config.labels.needs_review, config.labels.merge_conflict, config.labels.name_match
    );
    match config.repos.source {
        RepoSource::Organization => println!("  Repositories  : all of {}", config.github.owner),
        RepoSource::List => println!("  Repositories  : {} listed", config.repos.names.len()),
        RepoSource::Database => {
            if let Some(path) = &config.repos.database_path {
                println!("  Repositories  : database {}", path.display());
            }
        }
    }
    println!("  PR state      : {}", config.run.pr_state);
    println!("  Dry run       : {}", config.run.dry_run);
    println!();
    println!("Configuration is valid.");

    Ok(())
}
