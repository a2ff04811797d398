//! Batch reconciliation across repositories.
//!
//! Walks every selected repository and every pull request in it, strictly in
//! order, and reconciles each one. A failure on one pull request or one
//! repository listing is recorded in the [`BatchReport`] and the walk
//! continues.

use tracing::{error, info, warn};

use crate::errors::{GitHubError, ReconcileError};
use crate::models::{PrState, ReconciliationDecision, RepoRef};
use crate::reconciler::Reconciler;
use crate::sources::PullRequestSource;

/// Which repositories a batch visits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSelection {
    /// Every repository owned by the organization.
    Organization(String),
    /// A fixed list (from config or the repository database).
    Explicit(Vec<RepoRef>),
}

/// Result of reconciling one pull request.
#[derive(Debug)]
pub struct PrOutcome {
    pub repo: RepoRef,
    pub number: u64,
    pub title: String,
    pub result: Result<ReconciliationDecision, ReconcileError>,
}

/// A repository (or organization) whose listing failed.
#[derive(Debug)]
pub struct RepoFailure {
    pub target: String,
    pub error: GitHubError,
}

/// Everything a batch run did.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub repos_visited: usize,
    pub outcomes: Vec<PrOutcome>,
    pub repo_failures: Vec<RepoFailure>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&PrOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    pub fn relabeled(&self) -> usize {
        self.count(|o| matches!(o.result, Ok(ReconciliationDecision::ReplaceWith(_))))
    }

    pub fn conflicts_flagged(&self) -> usize {
        self.count(|o| matches!(o.result, Ok(ReconciliationDecision::AddConflictLabel(_))))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o.result, Ok(ReconciliationDecision::NoOp)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| o.result.is_err())
    }

    /// True when nothing at all went wrong.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.repo_failures.is_empty()
    }
}

/// Drives a [`Reconciler`] over a [`RepoSelection`].
pub struct ReconcileBatch<'a> {
    prs: &'a dyn PullRequestSource,
    reconciler: Reconciler<'a>,
    pr_state: PrState,
}

impl<'a> ReconcileBatch<'a> {
    pub fn new(
        prs: &'a dyn PullRequestSource,
        reconciler: Reconciler<'a>,
        pr_state: PrState,
    ) -> Self {
        Self {
            prs,
            reconciler,
            pr_state,
        }
    }

    pub async fn run(&self, selection: &RepoSelection) -> BatchReport {
        let mut report = BatchReport::default();

        let repos = match selection {
            RepoSelection::Explicit(repos) => repos.clone(),
            RepoSelection::Organization(org) => match self.prs.list_repositories(org).await {
                Ok(repos) => repos,
                Err(e) => {
                    error!(org = %org, error = %e, "failed to list organization repositories");
                    report.repo_failures.push(RepoFailure {
                        target: org.clone(),
                        error: e,
                    });
                    return report;
                }
            },
        };

        info!(
            repos = repos.len(),
            state = %self.pr_state,
            dry_run = self.reconciler.policy().dry_run,
            "starting reconciliation batch"
        );

        for repo in &repos {
            report.repos_visited += 1;
            let prs = match self.prs.list_pull_requests(repo, self.pr_state).await {
                Ok(prs) => prs,
                Err(e) => {
                    warn!(repo = %repo, error = %e, "failed to list pull requests, skipping repository");
                    report.repo_failures.push(RepoFailure {
                        target: repo.to_string(),
                        error: e,
                    });
                    continue;
                }
            };

            info!(repo = %repo, count = prs.len(), "reconciling pull requests");
            for pr in prs {
                let result = self.reconciler.reconcile(repo, &pr).await;
                match &result {
                    Ok(decision) => {
                        info!(repo = %repo, pr_number = pr.number, decision = %decision, "reconciled");
                    }
                    Err(e) => {
                        error!(repo = %repo, pr_number = pr.number, error = %e, "reconciliation failed");
                    }
                }
                report.outcomes.push(PrOutcome {
                    repo: repo.clone(),
                    number: pr.number,
                    title: pr.title,
                    result,
                });
            }
        }

        info!(
            relabeled = report.relabeled(),
            conflicts = report.conflicts_flagged(),
            unchanged = report.unchanged(),
            failed = report.failed(),
            repo_failures = report.repo_failures.len(),
            "reconciliation batch complete"
        );
        report
    }
}
