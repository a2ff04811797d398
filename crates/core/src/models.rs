//! Domain model types used throughout prlabeler.
//!
//! These are the shapes the reconciler reasons about. They are built from the
//! GitHub wire types in [`crate::github::client`] and by the in-memory test
//! doubles; none of them is persisted.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Repository reference
// ---------------------------------------------------------------------------

/// A repository addressed as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`, or qualify a bare `name` with `default_owner`.
    pub fn qualify(raw: &str, default_owner: &str) -> Result<Self, ConfigError> {
        if raw.contains('/') {
            raw.parse()
        } else if raw.trim().is_empty() {
            Err(ConfigError::InvalidValue {
                field: "repos.names".into(),
                detail: "repository name must not be empty".into(),
            })
        } else {
            Ok(Self::new(default_owner, raw.trim()))
        }
    }
}

impl FromStr for RepoRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(ConfigError::InvalidValue {
                field: "repo".into(),
                detail: format!("'{s}' is not in 'owner/repo' format"),
            }),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// Pull requests
// ---------------------------------------------------------------------------

/// Which pull requests a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    #[default]
    Open,
    Closed,
    All,
}

impl PrState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state mergeability as reported by the API.
///
/// GitHub computes mergeability lazily, so `null` is common right after a
/// push; that maps to [`Mergeable::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mergeable {
    Yes,
    No,
    #[default]
    Unknown,
}

impl From<Option<bool>> for Mergeable {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Yes,
            Some(false) => Self::No,
            None => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Mergeable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "true"),
            Self::No => write!(f, "false"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A pull request as seen by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub labels: BTreeSet<String>,
    pub mergeable: Mergeable,
}

impl PullRequest {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

// ---------------------------------------------------------------------------
// Timeline records
// ---------------------------------------------------------------------------

/// A `labeled` event on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEvent {
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// A commit on a pull request, reduced to its committer date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub committed_at: DateTime<Utc>,
}

/// Timestamp of the most recent label application.
pub fn last_label_date(events: &[LabelEvent]) -> Option<DateTime<Utc>> {
    events.iter().map(|e| e.created_at).max()
}

/// Timestamp of the most recent commit.
///
/// Takes the maximum committer date rather than the last element, so the
/// result does not depend on the order the API returned commits in.
pub fn last_commit_date(commits: &[CommitRecord]) -> Option<DateTime<Utc>> {
    commits.iter().map(|c| c.committed_at).max()
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// What the reconciler did (or, in dry-run mode, would do) to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "label", rename_all = "snake_case")]
pub enum ReconciliationDecision {
    /// Label state already reflects the latest commit.
    NoOp,
    /// All labels were cleared and this one applied.
    ReplaceWith(String),
    /// This label was added alongside the existing ones.
    AddConflictLabel(String),
}

impl std::fmt::Display for ReconciliationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOp => write!(f, "no-op"),
            Self::ReplaceWith(label) => write!(f, "replace with '{label}'"),
            Self::AddConflictLabel(label) => write!(f, "add '{label}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, h, 0, 0).unwrap()
    }

    #[test]
    fn test_repo_ref_parse_and_display() {
        let repo: RepoRef = "acme/widgets".parse().unwrap();
        assert_eq!(repo, RepoRef::new("acme", "widgets"));
        assert_eq!(repo.to_string(), "acme/widgets");

        assert!("noslash".parse::<RepoRef>().is_err());
        assert!("/widgets".parse::<RepoRef>().is_err());
        assert!("a/b/c".parse::<RepoRef>().is_err());
    }

    #[test]
    fn test_repo_ref_qualify() {
        assert_eq!(
            RepoRef::qualify("widgets", "acme").unwrap(),
            RepoRef::new("acme", "widgets")
        );
        assert_eq!(
            RepoRef::qualify("other/widgets", "acme").unwrap(),
            RepoRef::new("other", "widgets")
        );
        assert!(RepoRef::qualify("  ", "acme").is_err());
    }

    #[test]
    fn test_mergeable_from_option() {
        assert_eq!(Mergeable::from(Some(true)), Mergeable::Yes);
        assert_eq!(Mergeable::from(Some(false)), Mergeable::No);
        assert_eq!(Mergeable::from(None), Mergeable::Unknown);
    }

    #[test]
    fn test_last_label_date_is_max() {
        let events = vec![
            LabelEvent {
                label: "a".into(),
                created_at: at(9),
            },
            LabelEvent {
                label: "b".into(),
                created_at: at(11),
            },
            LabelEvent {
                label: "c".into(),
                created_at: at(10),
            },
        ];
        assert_eq!(last_label_date(&events), Some(at(11)));
        assert_eq!(last_label_date(&[]), None);
    }

    #[test]
    fn test_last_commit_date_ignores_order() {
        let commits = vec![
            CommitRecord {
                sha: "new".into(),
                committed_at: at(12),
            },
            CommitRecord {
                sha: "old".into(),
                committed_at: at(8),
            },
        ];
        assert_eq!(last_commit_date(&commits), Some(at(12)));
        assert_eq!(last_commit_date(&[]), None);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(ReconciliationDecision::NoOp.to_string(), "no-op");
        assert_eq!(
            ReconciliationDecision::ReplaceWith("needs review".into()).to_string(),
            "replace with 'needs review'"
        );
    }
}
