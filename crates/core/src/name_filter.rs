//! Title-based bulk labeling.
//!
//! Scans every pull request in every repository of an organization and
//! applies one fixed label to those whose title contains a given substring.
//! Runs independently of timestamp reconciliation.

use tracing::{info, warn};

use crate::errors::GitHubError;
use crate::models::{PrState, RepoRef};
use crate::sources::{LabelStore, PullRequestSource};

pub const ALGORITHMS_LABEL: &str = "algorithms";

/// A pull request whose title matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPullRequest {
    pub repo: RepoRef,
    pub number: u64,
    pub title: String,
    /// False when the label add failed or the run was a dry run.
    pub labeled: bool,
}

#[derive(Debug, Default)]
pub struct NameFilterReport {
    pub matches: Vec<MatchedPullRequest>,
    pub repo_failures: Vec<(String, GitHubError)>,
}

pub struct NameFilterLabeler<'a> {
    prs: &'a dyn PullRequestSource,
    labels: &'a dyn LabelStore,
    label: String,
    pr_state: PrState,
    dry_run: bool,
}

impl<'a> NameFilterLabeler<'a> {
    /// Labels matches with `label`, scanning pull requests in every state.
    pub fn new(
        prs: &'a dyn PullRequestSource,
        labels: &'a dyn LabelStore,
        label: impl Into<String>,
    ) -> Self {
        Self {
            prs,
            labels,
            label: label.into(),
            pr_state: PrState::All,
            dry_run: false,
        }
    }

    pub fn with_state(mut self, pr_state: PrState) -> Self {
        self.pr_state = pr_state;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Label every pull request in `org` whose title contains `needle`.
    ///
    /// Only a failure to enumerate the organization is returned as an error;
    /// per-repository and per-label failures are logged and reported.
    pub async fn run(&self, org: &str, needle: &str) -> Result<NameFilterReport, GitHubError> {
        let repos = self.prs.list_repositories(org).await?;
        info!(org, needle, repos = repos.len(), label = %self.label, "scanning pull request titles");

        let mut report = NameFilterReport::default();
        for repo in &repos {
            let prs = match self.prs.list_pull_requests(repo, self.pr_state).await {
                Ok(prs) => prs,
                Err(e) => {
                    warn!(repo = %repo, error = %e, "failed to list pull requests, skipping repository");
                    report.repo_failures.push((repo.to_string(), e));
                    continue;
                }
            };

            let matching: Vec<_> = prs
                .into_iter()
                .filter(|pr| pr.title.contains(needle))
                .collect();
            info!(repo = %repo, count = matching.len(), "found matching pull requests");

            for pr in matching {
                let labeled = if self.dry_run {
                    info!(repo = %repo, pr_number = pr.number, label = %self.label, "dry run: would add label");
                    false
                } else {
                    match self
                        .labels
                        .add_labels(repo, pr.number, &[self.label.clone()])
                        .await
                    {
                        Ok(()) => {
                            info!(repo = %repo, pr_number = pr.number, label = %self.label, "added label");
                            true
                        }
                        Err(e) => {
                            warn!(repo = %repo, pr_number = pr.number, error = %e, "failed to add label");
                            false
                        }
                    }
                };
                report.matches.push(MatchedPullRequest {
                    repo: repo.clone(),
                    number: pr.number,
                    title: pr.title,
                    labeled,
                });
            }
        }

        Ok(report)
    }
}
