//! Data models for pull requests moving through the fetch pipeline.
//!
//! [`FetchedPR`] is the unit of data produced by the GraphQL fetcher, stored in
//! the repository cache, and handed to the persistence boundary. It derives
//! `Serialize`/`Deserialize` because the cache stores it verbatim; optional
//! and collection fields default when absent so older cache documents still
//! load. Types prefixed with `Api` are REST deserialisation targets that
//! convert into the public domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Lifecycle state of a pull request as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    /// Open for review.
    Open,
    /// Closed without merging.
    Closed,
    /// Merged into its base branch.
    Merged,
}

impl PullRequestState {
    /// Lower-case label used in summaries and exported records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

/// A pull request with its nested reviews, commits, files and check runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPR {
    /// Pull request number, unique within its repository.
    pub number: u64,
    /// Title.
    pub title: String,
    /// Description body.
    #[serde(default)]
    pub body: Option<String>,
    /// Current state.
    pub state: PullRequestState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp; the ordering and merge key.
    pub updated_at: DateTime<Utc>,
    /// Merge timestamp when merged.
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    /// Close timestamp when closed or merged.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Author login; `None` for deleted ("ghost") accounts.
    #[serde(default)]
    pub author: Option<String>,
    /// Whether the pull request is a draft.
    #[serde(default)]
    pub is_draft: bool,
    /// Lines added across the pull request.
    #[serde(default)]
    pub additions: u64,
    /// Lines removed across the pull request.
    #[serde(default)]
    pub deletions: u64,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Milestone title.
    #[serde(default)]
    pub milestone: Option<String>,
    /// Assignee logins.
    #[serde(default)]
    pub assignees: Vec<String>,
    /// Numbers of issues this pull request closes.
    #[serde(default)]
    pub linked_issues: Vec<u64>,
    /// Submitted reviews, bounded by the per-PR review page size.
    #[serde(default)]
    pub reviews: Vec<FetchedReview>,
    /// Commits in branch order, bounded by the per-PR commit page size.
    #[serde(default)]
    pub commits: Vec<FetchedCommit>,
    /// Changed files, bounded by the per-PR file page size.
    #[serde(default)]
    pub files: Vec<FetchedFile>,
    /// CI check runs for the head commit, filled in by the REST supplement.
    #[serde(default)]
    pub check_runs: Vec<CheckRunResult>,
}

impl FetchedPR {
    /// SHA of the last commit in the fetched commit list.
    #[must_use]
    pub fn head_sha(&self) -> Option<&str> {
        self.commits.last().map(|commit| commit.sha.as_str())
    }
}

/// A submitted pull request review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedReview {
    /// GitHub database identifier when exposed.
    #[serde(default)]
    pub id: Option<u64>,
    /// Reviewer login.
    #[serde(default)]
    pub reviewer: Option<String>,
    /// Review state (`APPROVED`, `CHANGES_REQUESTED`, `COMMENTED`, ...).
    pub state: String,
    /// Review body.
    #[serde(default)]
    pub body: Option<String>,
    /// Submission timestamp; absent for pending reviews.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A commit on the pull request branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedCommit {
    /// Commit SHA.
    pub sha: String,
    /// Commit message.
    #[serde(default)]
    pub message: String,
    /// GitHub login of the author when linked to an account.
    #[serde(default)]
    pub author_login: Option<String>,
    /// Git author name.
    #[serde(default)]
    pub author_name: Option<String>,
    /// Authoring timestamp.
    #[serde(default)]
    pub authored_at: Option<DateTime<Utc>>,
    /// Commit timestamp.
    #[serde(default)]
    pub committed_at: Option<DateTime<Utc>>,
    /// Lines added.
    #[serde(default)]
    pub additions: u64,
    /// Lines removed.
    #[serde(default)]
    pub deletions: u64,
}

/// A file changed by the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedFile {
    /// Repository-relative path.
    pub path: String,
    /// Lines added.
    #[serde(default)]
    pub additions: u64,
    /// Lines removed.
    #[serde(default)]
    pub deletions: u64,
    /// Change type (`ADDED`, `MODIFIED`, `DELETED`, `RENAMED`, ...).
    #[serde(default)]
    pub change_type: String,
}

/// One CI check run reported for a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunResult {
    /// Check run identifier.
    pub id: u64,
    /// Check name.
    pub name: String,
    /// Status (`queued`, `in_progress`, `completed`).
    pub status: String,
    /// Conclusion once completed.
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Start timestamp.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Commit the run belongs to.
    pub head_sha: String,
}

/// Lightweight repository metadata used for change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryMetadata {
    /// `owner/name` as reported by GitHub.
    pub name_with_owner: String,
    /// Last push to any branch; `None` for empty repositories.
    pub pushed_at: Option<DateTime<Utc>>,
}

/// API response for the check-runs-for-ref endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCheckRunList {
    #[serde(default)]
    pub(crate) check_runs: Vec<ApiCheckRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCheckRun {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) status: String,
    pub(crate) conclusion: Option<String>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) head_sha: String,
}

impl From<ApiCheckRun> for CheckRunResult {
    fn from(value: ApiCheckRun) -> Self {
        Self {
            id: value.id,
            name: value.name,
            status: value.status,
            conclusion: value.conclusion,
            started_at: value.started_at,
            completed_at: value.completed_at,
            head_sha: value.head_sha,
        }
    }
}
