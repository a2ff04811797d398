//! prlabeler core library.
//!
//! Reconciles pull-request labels across a GitHub organization: a pull
//! request whose newest commit postdates its newest label is relabeled for
//! review, and a reviewed pull request that can no longer merge is flagged
//! as conflicting. Also provides title-based bulk labeling, the GitHub REST
//! client, configuration, and an optional SQLite repository list.

pub mod batch;
pub mod config;
pub mod db;
pub mod errors;
pub mod github;
pub mod models;
pub mod name_filter;
pub mod reconciler;
pub mod sources;

#[cfg(test)]
mod test_support;

// Re-exports for convenience.
pub use batch::{BatchReport, ReconcileBatch, RepoSelection};
pub use config::AppConfig;
pub use db::Database;
pub use github::GitHubClient;
pub use name_filter::NameFilterLabeler;
pub use reconciler::{LabelPolicy, Reconciler};
