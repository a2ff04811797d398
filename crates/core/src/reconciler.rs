//! Label reconciliation for a single pull request.
//!
//! Decides whether a pull request's labels are stale relative to its commit
//! history and applies the correction through a [`LabelStore`]:
//!
//! - no commits                              -> no-op
//! - no label ever applied, or newer commits -> clear all labels, apply the
//!   stale label
//! - labels current, stale label present, PR not mergeable, conflict label
//!   absent                                  -> add the conflict label
//! - otherwise                               -> no-op

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ReconcileError;
use crate::models::{Mergeable, PullRequest, ReconciliationDecision, RepoRef};
use crate::sources::{LabelStore, PullRequestSource, TimelineSource};

pub const NEEDS_REVIEW_LABEL: &str = "needs review";
pub const MERGE_CONFLICT_LABEL: &str = "merge conflict";

/// Which labels the reconciler manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPolicy {
    /// Applied when commits postdate the last label.
    pub stale_label: String,
    /// Added to reviewed-but-unmergeable pull requests.
    pub conflict_label: String,
    /// Compute decisions without writing labels.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for LabelPolicy {
    fn default() -> Self {
        Self {
            stale_label: NEEDS_REVIEW_LABEL.into(),
            conflict_label: MERGE_CONFLICT_LABEL.into(),
            dry_run: false,
        }
    }
}

/// Outcome of comparing the last commit against the last label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Nothing to compare against.
    NoCommits,
    /// No label yet, or a commit landed after the last label.
    Stale,
    /// The last label is at least as recent as the last commit.
    Current,
}

impl Staleness {
    /// Strict comparison at millisecond resolution; a tie counts as current.
    pub fn assess(
        last_commit: Option<DateTime<Utc>>,
        last_label: Option<DateTime<Utc>>,
    ) -> Self {
        match (last_commit, last_label) {
            (None, _) => Self::NoCommits,
            (Some(_), None) => Self::Stale,
            (Some(commit), Some(label)) => {
                if commit.timestamp_millis() > label.timestamp_millis() {
                    Self::Stale
                } else {
                    Self::Current
                }
            }
        }
    }
}

/// Reconciles one pull request at a time against its collaborators.
pub struct Reconciler<'a> {
    prs: &'a dyn PullRequestSource,
    timeline: &'a dyn TimelineSource,
    labels: &'a dyn LabelStore,
    policy: LabelPolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        prs: &'a dyn PullRequestSource,
        timeline: &'a dyn TimelineSource,
        labels: &'a dyn LabelStore,
        policy: LabelPolicy,
    ) -> Self {
        Self {
            prs,
            timeline,
            labels,
            policy,
        }
    }

    pub fn policy(&self) -> &LabelPolicy {
        &self.policy
    }

    /// Reconcile the labels of `pr`.
    ///
    /// Any fetch failure is returned before a label is touched. Failing to
    /// remove an existing label is logged and skipped.
    pub async fn reconcile(
        &self,
        repo: &RepoRef,
        pr: &PullRequest,
    ) -> Result<ReconciliationDecision, ReconcileError> {
        let number = pr.number;
        let timeline_err = |source| ReconcileError::TimelineFetch {
            repo: repo.to_string(),
            number,
            source,
        };

        let last_commit = self
            .timeline
            .last_commit_date(repo, number)
            .await
            .map_err(timeline_err)?;
        if last_commit.is_none() {
            info!(repo = %repo, pr_number = number, "no commits found, nothing to compare");
            return Ok(ReconciliationDecision::NoOp);
        }

        let last_label = self
            .timeline
            .last_label_date(repo, number)
            .await
            .map_err(timeline_err)?;

        debug!(
            repo = %repo,
            pr_number = number,
            last_commit = ?last_commit,
            last_label = ?last_label,
            "compared timeline"
        );

        match Staleness::assess(last_commit, last_label) {
            Staleness::NoCommits => Ok(ReconciliationDecision::NoOp),
            Staleness::Stale => self.replace_labels(repo, number).await,
            Staleness::Current => self.check_conflict(repo, pr).await,
        }
    }

    async fn replace_labels(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<ReconciliationDecision, ReconcileError> {
        let stale = &self.policy.stale_label;
        let decision = ReconciliationDecision::ReplaceWith(stale.clone());

        let current = self
            .labels
            .list_labels(repo, number)
            .await
            .map_err(|source| ReconcileError::LabelFetch {
                repo: repo.to_string(),
                number,
                source,
            })?;

        if self.policy.dry_run {
            info!(
                repo = %repo,
                pr_number = number,
                removing = ?current,
                label = %stale,
                "dry run: would replace labels"
            );
            return Ok(decision);
        }

        for label in &current {
            if let Err(e) = self.labels.remove_label(repo, number, label).await {
                warn!(
                    repo = %repo,
                    pr_number = number,
                    label = %label,
                    error = %e,
                    "failed to remove label, continuing"
                );
            }
        }

        self.add_label(repo, number, stale).await?;
        info!(
            repo = %repo,
            pr_number = number,
            label = %stale,
            "commits postdate last label, marked for review"
        );
        Ok(decision)
    }

    async fn check_conflict(
        &self,
        repo: &RepoRef,
        pr: &PullRequest,
    ) -> Result<ReconciliationDecision, ReconcileError> {
        let number = pr.number;
        let conflict = &self.policy.conflict_label;

        if !pr.has_label(&self.policy.stale_label) {
            debug!(repo = %repo, pr_number = number, "labels are current");
            return Ok(ReconciliationDecision::NoOp);
        }

        let mergeable = self
            .prs
            .mergeable(repo, number)
            .await
            .map_err(|source| ReconcileError::Mergeability {
                repo: repo.to_string(),
                number,
                source,
            })?;

        if mergeable != Mergeable::No || pr.has_label(conflict) {
            debug!(
                repo = %repo,
                pr_number = number,
                %mergeable,
                "labels are current"
            );
            return Ok(ReconciliationDecision::NoOp);
        }

        if self.policy.dry_run {
            info!(repo = %repo, pr_number = number, label = %conflict, "dry run: would flag conflict");
        } else {
            self.add_label(repo, number, conflict).await?;
            info!(repo = %repo, pr_number = number, label = %conflict, "flagged merge conflict");
        }
        Ok(ReconciliationDecision::AddConflictLabel(conflict.clone()))
    }

    async fn add_label(
        &self,
        repo: &RepoRef,
        number: u64,
        label: &str,
    ) -> Result<(), ReconcileError> {
        self.labels
            .add_labels(repo, number, &[label.to_string()])
            .await
            .map_err(|source| ReconcileError::LabelWrite {
                repo: repo.to_string(),
                number,
                label: label.to_string(),
                source,
            })
    }
}
