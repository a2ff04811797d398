//! GitHub REST API client.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::paginate::{Paginator, DEFAULT_PER_PAGE};
use crate::errors::GitHubError;
use crate::models::{
    self, CommitRecord, LabelEvent, Mergeable, PrState, PullRequest, RepoRef,
};
use crate::sources::{LabelStore, PullRequestSource, TimelineSource};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub name: String,
    pub owner: GitHubOwner,
    #[serde(default)]
    pub archived: bool,
}

impl From<GitHubRepository> for RepoRef {
    fn from(repo: GitHubRepository) -> Self {
        RepoRef::new(repo.owner.login, repo.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

/// A pull request from the list or detail endpoint.
///
/// `mergeable` is only present on the detail endpoint, and even there it is
/// `null` while GitHub is still computing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubPullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub mergeable: Option<bool>,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            title: pr.title,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            mergeable: Mergeable::from(pr.mergeable),
        }
    }
}

/// An entry from `GET /repos/{owner}/{repo}/issues/{number}/events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssueEvent {
    pub event: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub label: Option<GitHubLabel>,
}

impl GitHubIssueEvent {
    /// `Some` only for `labeled` events.
    pub fn into_label_event(self) -> Option<LabelEvent> {
        if self.event != "labeled" {
            return None;
        }
        Some(LabelEvent {
            label: self.label.map(|l| l.name).unwrap_or_default(),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub commit: GitHubCommitDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitDetail {
    pub message: String,
    pub committer: Option<GitHubGitActor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubGitActor {
    pub name: String,
    pub email: String,
    pub date: Option<DateTime<Utc>>,
}

impl GitHubCommit {
    /// `None` when the commit carries no committer date.
    pub fn to_record(&self) -> Option<CommitRecord> {
        let committed_at = self.commit.committer.as_ref()?.date?;
        Some(CommitRecord {
            sha: self.sha.clone(),
            committed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Asynchronous GitHub REST API client.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let token = token.into();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("prlabeler/0.1"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        info!(api_url = %api_url, "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    // -- Lazy listings --------------------------------------------------------

    /// Pages of repositories owned by an organization.
    pub fn org_repository_pages(&self, org: &str) -> Paginator<GitHubRepository> {
        let url = format!("{}/orgs/{}/repos", self.api_url, org);
        Paginator::new(self.clone(), url, Vec::new(), DEFAULT_PER_PAGE)
    }

    /// Pages of pull requests on a repository.
    pub fn pull_request_pages(
        &self,
        repo: &RepoRef,
        state: PrState,
    ) -> Paginator<GitHubPullRequest> {
        let url = format!("{}/repos/{}/pulls", self.api_url, repo);
        let query = vec![("state".to_string(), state.as_str().to_string())];
        Paginator::new(self.clone(), url, query, DEFAULT_PER_PAGE)
    }

    /// Pages of issue events on a pull request.
    pub fn issue_event_pages(&self, repo: &RepoRef, number: u64) -> Paginator<GitHubIssueEvent> {
        let url = format!("{}/repos/{}/issues/{}/events", self.api_url, repo, number);
        Paginator::new(self.clone(), url, Vec::new(), DEFAULT_PER_PAGE)
    }

    /// Pages of labels currently applied to an issue or pull request.
    pub fn issue_label_pages(&self, repo: &RepoRef, number: u64) -> Paginator<GitHubLabel> {
        let url = format!("{}/repos/{}/issues/{}/labels", self.api_url, repo, number);
        Paginator::new(self.clone(), url, Vec::new(), DEFAULT_PER_PAGE)
    }

    /// Pages of commits on a pull request.
    pub fn pr_commit_pages(&self, repo: &RepoRef, number: u64) -> Paginator<GitHubCommit> {
        let url = format!("{}/repos/{}/pulls/{}/commits", self.api_url, repo, number);
        Paginator::new(self.clone(), url, Vec::new(), DEFAULT_PER_PAGE)
    }

    /// Fetch a single page of a collection endpoint.
    #[instrument(skip(self, query))]
    pub(crate) async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
        per_page: u32,
        page: u32,
    ) -> Result<Vec<T>, GitHubError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .await?;
        self.check_response(&resp)?;
        let items: Vec<T> = resp.json().await?;
        debug!(count = items.len(), page, "fetched page");
        Ok(items)
    }

    // -- Single requests ------------------------------------------------------

    /// Get a single pull request by number (includes `mergeable`).
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<GitHubPullRequest, GitHubError> {
        let url = format!("{}/repos/{}/pulls/{}", self.api_url, repo, number);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        self.check_response(&resp)?;
        let pr: GitHubPullRequest = resp.json().await?;
        debug!(number = pr.number, mergeable = ?pr.mergeable, "fetched pull request");
        Ok(pr)
    }

    /// Add labels to an issue or pull request. Pull requests share the issue
    /// number space, so the issues endpoint works for both.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn add_issue_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/issues/{}/labels", self.api_url, repo, number);
        let payload = serde_json::json!({ "labels": labels });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        self.check_response(&resp)?;
        info!(number, ?labels, "added labels");
        Ok(())
    }

    /// Remove one label from an issue or pull request.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn remove_issue_label(
        &self,
        repo: &RepoRef,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError> {
        let mut url = Url::parse(&format!(
            "{}/repos/{}/issues/{}/labels",
            self.api_url, repo, number
        ))
        .map_err(|e| GitHubError::ParseError(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| GitHubError::ParseError(format!("cannot-be-a-base URL: {}", self.api_url)))?
            .push(label);
        let resp = self
            .http
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        self.check_response(&resp)?;
        info!(number, label, "removed label");
        Ok(())
    }

    fn check_response(&self, resp: &reqwest::Response) -> Result<(), GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let rate_limit_reset = || {
            resp.headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string()
        };
        let rate_limit_exhausted = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        match status.as_u16() {
            429 => Err(GitHubError::RateLimited {
                reset_at: rate_limit_reset(),
            }),
            403 if rate_limit_exhausted => Err(GitHubError::RateLimited {
                reset_at: rate_limit_reset(),
            }),
            401 | 403 => Err(GitHubError::AuthenticationFailed(format!("HTTP {}", status))),
            404 => Err(GitHubError::NotFound(resp.url().path().to_string())),
            code => Err(GitHubError::ApiError {
                status: code,
                body: format!("HTTP {}", status),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn list_repositories(&self, org: &str) -> Result<Vec<RepoRef>, GitHubError> {
        let repos = self.org_repository_pages(org).collect_all().await?;
        debug!(org, count = repos.len(), "listed organization repositories");
        Ok(repos.into_iter().map(RepoRef::from).collect())
    }

    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        state: PrState,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let prs = self.pull_request_pages(repo, state).collect_all().await?;
        debug!(repo = %repo, %state, count = prs.len(), "listed pull requests");
        Ok(prs.into_iter().map(PullRequest::from).collect())
    }

    async fn mergeable(&self, repo: &RepoRef, number: u64) -> Result<Mergeable, GitHubError> {
        let pr = self.get_pull_request(repo, number).await?;
        Ok(Mergeable::from(pr.mergeable))
    }
}

#[async_trait]
impl TimelineSource for GitHubClient {
    async fn last_label_date(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<DateTime<Utc>>, GitHubError> {
        let events: Vec<LabelEvent> = self
            .issue_event_pages(repo, number)
            .collect_all()
            .await?
            .into_iter()
            .filter_map(GitHubIssueEvent::into_label_event)
            .collect();
        Ok(models::last_label_date(&events))
    }

    async fn last_commit_date(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<DateTime<Utc>>, GitHubError> {
        let records: Vec<CommitRecord> = self
            .pr_commit_pages(repo, number)
            .collect_all()
            .await?
            .iter()
            .filter_map(GitHubCommit::to_record)
            .collect();
        Ok(models::last_commit_date(&records))
    }
}

#[async_trait]
impl LabelStore for GitHubClient {
    async fn list_labels(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<BTreeSet<String>, GitHubError> {
        let labels = self.issue_label_pages(repo, number).collect_all().await?;
        debug!(repo = %repo, number, count = labels.len(), "listed labels");
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn add_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        self.add_issue_labels(repo, number, labels).await
    }

    async fn remove_label(
        &self,
        repo: &RepoRef,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError> {
        self.remove_issue_label(repo, number, label).await
    }
}
