//! In-memory GitHub double shared by the unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::errors::GitHubError;
use crate::models::{Mergeable, PrState, PullRequest, RepoRef};
use crate::sources::{LabelStore, PullRequestSource, TimelineSource};

pub(crate) fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// A label-store call, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List,
    Add(Vec<String>),
    Remove(String),
}

#[derive(Debug, Clone)]
pub(crate) struct FakePr {
    number: u64,
    title: String,
    open: bool,
    labels: BTreeSet<String>,
    phantom_labels: BTreeSet<String>,
    mergeable: Mergeable,
    commits: Vec<DateTime<Utc>>,
    label_events: Vec<DateTime<Utc>>,
}

impl FakePr {
    pub(crate) fn new(number: u64, title: &str) -> Self {
        Self {
            number,
            title: title.into(),
            open: true,
            labels: BTreeSet::new(),
            phantom_labels: BTreeSet::new(),
            mergeable: Mergeable::Unknown,
            commits: Vec::new(),
            label_events: Vec::new(),
        }
    }

    pub(crate) fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub(crate) fn with_label_events(mut self, events: &[DateTime<Utc>]) -> Self {
        self.label_events = events.to_vec();
        self
    }

    pub(crate) fn with_commits(mut self, commits: &[DateTime<Utc>]) -> Self {
        self.commits = commits.to_vec();
        self
    }

    pub(crate) fn with_mergeable(mut self, mergeable: Mergeable) -> Self {
        self.mergeable = mergeable;
        self
    }

    pub(crate) fn closed(mut self) -> Self {
        self.open = false;
        self
    }

    fn to_pull_request(&self) -> PullRequest {
        PullRequest {
            number: self.number,
            title: self.title.clone(),
            labels: self.labels.clone(),
            mergeable: Mergeable::Unknown,
        }
    }
}

#[derive(Default)]
struct FakeState {
    org_repos: BTreeMap<String, Vec<RepoRef>>,
    prs: BTreeMap<RepoRef, Vec<FakePr>>,
    failing_timelines: BTreeSet<(RepoRef, u64)>,
    failing_listings: BTreeSet<RepoRef>,
    failing_adds: BTreeSet<(RepoRef, u64)>,
    calls: Vec<Call>,
    mergeable_queries: usize,
    clock: DateTime<Utc>,
}

/// Implements every collaborator trait over in-memory state.
///
/// Adding a label records a `labeled` event stamped with a fake clock that
/// starts after every timestamp the tests use and advances one minute per
/// write.
pub(crate) struct FakeGitHub {
    state: Mutex<FakeState>,
}

impl FakeGitHub {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                clock: at(2030, 1, 1, 0),
                ..FakeState::default()
            }),
        }
    }

    pub(crate) fn add_org_repo(&self, org: &str, repo: &RepoRef) {
        let mut state = self.state.lock().unwrap();
        state
            .org_repos
            .entry(org.to_string())
            .or_default()
            .push(repo.clone());
        state.prs.entry(repo.clone()).or_default();
    }

    pub(crate) fn add_pr(&self, repo: &RepoRef, pr: FakePr) {
        self.state
            .lock()
            .unwrap()
            .prs
            .entry(repo.clone())
            .or_default()
            .push(pr);
    }

    pub(crate) fn add_phantom_label(&self, repo: &RepoRef, number: u64, label: &str) {
        let mut state = self.state.lock().unwrap();
        let pr = find_pr(&mut state, repo, number).unwrap();
        pr.phantom_labels.insert(label.to_string());
    }

    pub(crate) fn fail_timeline(&self, repo: &RepoRef, number: u64) {
        let mut state = self.state.lock().unwrap();
        state.failing_timelines.insert((repo.clone(), number));
    }

    pub(crate) fn fail_listing(&self, repo: &RepoRef) {
        self.state
            .lock()
            .unwrap()
            .failing_listings
            .insert(repo.clone());
    }

    pub(crate) fn fail_adds(&self, repo: &RepoRef, number: u64) {
        let mut state = self.state.lock().unwrap();
        state.failing_adds.insert((repo.clone(), number));
    }

    pub(crate) fn pull_request(&self, repo: &RepoRef, number: u64) -> PullRequest {
        let mut state = self.state.lock().unwrap();
        find_pr(&mut state, repo, number).unwrap().to_pull_request()
    }

    pub(crate) fn labels_of(&self, repo: &RepoRef, number: u64) -> Vec<String> {
        let mut state = self.state.lock().unwrap();
        find_pr(&mut state, repo, number)
            .unwrap()
            .labels
            .iter()
            .cloned()
            .collect()
    }

    pub(crate) fn label_calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn mergeable_queries(&self) -> usize {
        self.state.lock().unwrap().mergeable_queries
    }
}

fn find_pr<'s>(state: &'s mut FakeState, repo: &RepoRef, number: u64) -> Option<&'s mut FakePr> {
    state
        .prs
        .get_mut(repo)?
        .iter_mut()
        .find(|pr| pr.number == number)
}

fn not_found(repo: &RepoRef, number: u64) -> GitHubError {
    GitHubError::NotFound(format!("/repos/{repo}/issues/{number}"))
}

fn transport_failure() -> GitHubError {
    GitHubError::ApiError {
        status: 502,
        body: "HTTP 502 Bad Gateway".into(),
    }
}

#[async_trait]
impl PullRequestSource for FakeGitHub {
    async fn list_repositories(&self, org: &str) -> Result<Vec<RepoRef>, GitHubError> {
        let state = self.state.lock().unwrap();
        state
            .org_repos
            .get(org)
            .cloned()
            .ok_or_else(|| GitHubError::NotFound(format!("/orgs/{org}/repos")))
    }

    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        pr_state: PrState,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let state = self.state.lock().unwrap();
        if state.failing_listings.contains(repo) {
            return Err(transport_failure());
        }
        let prs = state.prs.get(repo).cloned().unwrap_or_default();
        Ok(prs
            .iter()
            .filter(|pr| match pr_state {
                PrState::Open => pr.open,
                PrState::Closed => !pr.open,
                PrState::All => true,
            })
            .map(FakePr::to_pull_request)
            .collect())
    }

    async fn mergeable(&self, repo: &RepoRef, number: u64) -> Result<Mergeable, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.mergeable_queries += 1;
        find_pr(&mut state, repo, number)
            .map(|pr| pr.mergeable)
            .ok_or_else(|| not_found(repo, number))
    }
}

#[async_trait]
impl TimelineSource for FakeGitHub {
    async fn last_label_date(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<DateTime<Utc>>, GitHubError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_timelines.contains(&(repo.clone(), number)) {
            return Err(transport_failure());
        }
        let pr = find_pr(&mut state, repo, number).ok_or_else(|| not_found(repo, number))?;
        Ok(pr.label_events.iter().max().copied())
    }

    async fn last_commit_date(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<DateTime<Utc>>, GitHubError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_timelines.contains(&(repo.clone(), number)) {
            return Err(transport_failure());
        }
        let pr = find_pr(&mut state, repo, number).ok_or_else(|| not_found(repo, number))?;
        Ok(pr.commits.iter().max().copied())
    }
}

#[async_trait]
impl LabelStore for FakeGitHub {
    async fn list_labels(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<BTreeSet<String>, GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);
        let pr = find_pr(&mut state, repo, number).ok_or_else(|| not_found(repo, number))?;
        Ok(pr.labels.union(&pr.phantom_labels).cloned().collect())
    }

    async fn add_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Add(labels.to_vec()));
        if state.failing_adds.contains(&(repo.clone(), number)) {
            return Err(transport_failure());
        }
        let now = state.clock;
        state.clock = now + Duration::minutes(1);
        let pr = find_pr(&mut state, repo, number).ok_or_else(|| not_found(repo, number))?;
        for label in labels {
            pr.labels.insert(label.clone());
            pr.label_events.push(now);
        }
        Ok(())
    }

    async fn remove_label(
        &self,
        repo: &RepoRef,
        number: u64,
        label: &str,
    ) -> Result<(), GitHubError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Remove(label.to_string()));
        let pr = find_pr(&mut state, repo, number).ok_or_else(|| not_found(repo, number))?;
        if pr.labels.remove(label) {
            Ok(())
        } else {
            Err(not_found(repo, number))
        }
    }
}
