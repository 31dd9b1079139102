//! Typed GraphQL response shapes and their conversion into domain models.
//!
//! Every wire type here is private to the fetcher. Nullable connections and
//! null list entries are tolerated; anything GitHub omits for deleted users
//! or inaccessible objects maps to `None` or is skipped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::github::models::{
    FetchedCommit, FetchedFile, FetchedPR, FetchedReview, PullRequestState, RepositoryMetadata,
};
use crate::github::rate_limit::RateLimitInfo;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RepositoryMetadataData {
    pub(super) repository: Option<ApiRepositoryMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiRepositoryMetadata {
    name_with_owner: String,
    pushed_at: Option<DateTime<Utc>>,
}

impl From<ApiRepositoryMetadata> for RepositoryMetadata {
    fn from(value: ApiRepositoryMetadata) -> Self {
        Self {
            name_with_owner: value.name_with_owner,
            pushed_at: value.pushed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PullRequestsData {
    #[serde(default)]
    pub(super) rate_limit: Option<ApiRateLimit>,
    pub(super) repository: Option<ApiRepositoryPullRequests>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiRateLimit {
    #[serde(default)]
    pub(super) cost: Option<u32>,
    remaining: u32,
    reset_at: DateTime<Utc>,
}

impl ApiRateLimit {
    pub(super) fn to_info(&self) -> RateLimitInfo {
        RateLimitInfo::with_reset_time(0, self.remaining, self.reset_at)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiRepositoryPullRequests {
    pub(super) pull_requests: ApiPullRequestConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiPullRequestConnection {
    pub(super) page_info: ApiPageInfo,
    #[serde(default)]
    pub(super) nodes: Vec<Option<ApiPullRequestNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiPageInfo {
    pub(super) has_next_page: bool,
    pub(super) end_cursor: Option<String>,
}

/// A connection truncated to its first (or last) N nodes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiNodes<T> {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> Default for ApiNodes<T> {
    fn default() -> Self {
        Self {
            total_count: None,
            nodes: Vec::new(),
        }
    }
}

impl<T> ApiNodes<T> {
    fn is_truncated(&self) -> bool {
        self.total_count
            .is_some_and(|total| total > u64::try_from(self.nodes.len()).unwrap_or(u64::MAX))
    }

    fn into_items(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

#[derive(Debug, Deserialize)]
struct ApiLogin {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTitle {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiIssueNumber {
    number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ApiPullRequestNode {
    pub(super) number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: PullRequestState,
    #[serde(default)]
    is_draft: bool,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
    #[serde(default)]
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    author: Option<ApiLogin>,
    #[serde(default)]
    labels: Option<ApiNodes<ApiName>>,
    #[serde(default)]
    milestone: Option<ApiTitle>,
    #[serde(default)]
    assignees: Option<ApiNodes<ApiLogin>>,
    #[serde(default)]
    closing_issues_references: Option<ApiNodes<ApiIssueNumber>>,
    #[serde(default)]
    reviews: Option<ApiNodes<ApiReview>>,
    #[serde(default)]
    commits: Option<ApiNodes<ApiCommitNode>>,
    #[serde(default)]
    files: Option<ApiNodes<ApiFile>>,
}

impl ApiPullRequestNode {
    /// Logs nested connections cut short by the per-PR page sizes.
    pub(super) fn log_truncation(&self) {
        let truncated = [
            ("reviews", self.reviews.as_ref().is_some_and(ApiNodes::is_truncated)),
            ("commits", self.commits.as_ref().is_some_and(ApiNodes::is_truncated)),
            ("files", self.files.as_ref().is_some_and(ApiNodes::is_truncated)),
        ];
        for (connection, is_truncated) in truncated {
            if is_truncated {
                debug!(pr = self.number, connection, "nested connection truncated");
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiReview {
    #[serde(default)]
    database_id: Option<u64>,
    state: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    author: Option<ApiLogin>,
}

#[derive(Debug, Deserialize)]
struct ApiCommitNode {
    commit: ApiCommit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCommit {
    oid: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    authored_date: Option<DateTime<Utc>>,
    #[serde(default)]
    committed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    author: Option<ApiGitActor>,
}

#[derive(Debug, Deserialize)]
struct ApiGitActor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    user: Option<ApiLogin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    path: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
    #[serde(default)]
    change_type: String,
}

fn items<T>(connection: Option<ApiNodes<T>>) -> impl Iterator<Item = T> {
    connection.unwrap_or_default().into_items()
}

impl From<ApiReview> for FetchedReview {
    fn from(value: ApiReview) -> Self {
        Self {
            id: value.database_id,
            reviewer: value.author.map(|author| author.login),
            state: value.state,
            body: value.body,
            submitted_at: value.submitted_at,
        }
    }
}

impl From<ApiCommitNode> for FetchedCommit {
    fn from(value: ApiCommitNode) -> Self {
        let commit = value.commit;
        let (author_name, author_login) = commit.author.map_or((None, None), |actor| {
            (actor.name, actor.user.map(|user| user.login))
        });
        Self {
            sha: commit.oid,
            message: commit.message,
            author_login,
            author_name,
            authored_at: commit.authored_date,
            committed_at: commit.committed_date,
            additions: commit.additions,
            deletions: commit.deletions,
        }
    }
}

impl From<ApiFile> for FetchedFile {
    fn from(value: ApiFile) -> Self {
        Self {
            path: value.path,
            additions: value.additions,
            deletions: value.deletions,
            change_type: value.change_type,
        }
    }
}

impl From<ApiPullRequestNode> for FetchedPR {
    fn from(value: ApiPullRequestNode) -> Self {
        Self {
            number: value.number,
            title: value.title,
            body: value.body,
            state: value.state,
            created_at: value.created_at,
            updated_at: value.updated_at,
            merged_at: value.merged_at,
            closed_at: value.closed_at,
            author: value.author.map(|author| author.login),
            is_draft: value.is_draft,
            additions: value.additions,
            deletions: value.deletions,
            labels: items(value.labels).map(|label| label.name).collect(),
            milestone: value.milestone.map(|milestone| milestone.title),
            assignees: items(value.assignees).map(|user| user.login).collect(),
            linked_issues: items(value.closing_issues_references)
                .map(|issue| issue.number)
                .collect(),
            reviews: items(value.reviews).map(FetchedReview::from).collect(),
            commits: items(value.commits).map(FetchedCommit::from).collect(),
            files: items(value.files).map(FetchedFile::from).collect(),
            check_runs: Vec::new(),
        }
    }
}
