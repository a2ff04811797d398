//! Collaborator interfaces consumed by the reconciler.
//!
//! [`GitHubClient`](crate::github::GitHubClient) implements all three traits
//! against the REST API. Tests implement them with in-memory doubles.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::GitHubError;
use crate::models::{Mergeable, PrState, PullRequest, RepoRef};

/// Supplies repositories and their pull requests.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Every repository owned by `org`.
    async fn list_repositories(&self, org: &str) -> Result<Vec<RepoRef>, GitHubError>;

    /// Every pull request of `repo` in the given state.
    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        state: PrState,
    ) -> Result<Vec<PullRequest>, GitHubError>;

    /// Current mergeability of one pull request.
    async fn mergeable(&self, repo: &RepoRef, number: u64) -> Result<Mergeable, GitHubError>;
}

/// Supplies the timestamps the reconciler compares.
///
/// Both methods return `Ok(None)` when there is no relevant history; an
/// `Err` always means the data could not be fetched.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// When a label was last applied to the pull request.
    async fn last_label_date(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<DateTime<Utc>>, GitHubError>;

    /// Committer date of the pull request's most recent commit.
    async fn last_commit_date(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<DateTime<Utc>>, GitHubError>;
}

/// Reads and mutates the labels on a pull request.
#[async_trait]
pub trait LabelStore: Send + Sync {
    async fn list_labels(&self, repo: &RepoRef, number: u64)
        -> Result<BTreeSet<String>, GitHubError>;

    async fn add_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError>;

    /// Removing a label that is not present yields [`GitHubError::NotFound`].
    async fn remove_label(&self, repo: &RepoRef, number: u64, label: &str)
        -> Result<(), GitHubError>;
}
