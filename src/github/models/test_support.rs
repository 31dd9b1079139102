//! Test helpers for constructing `FetchedPR` fixtures.
//!
//! # Examples
//!
//! ```
//! use prseed::github::models::test_support::{minimal_pr, pr_with_head};
//!
//! let pr = minimal_pr(1, "2025-01-01T00:00:00Z", "2025-01-02T00:00:00Z");
//! assert_eq!(pr.number, 1);
//!
//! let headed = pr_with_head(2, "2025-01-01T00:00:00Z", "abc123");
//! assert_eq!(headed.head_sha(), Some("abc123"));
//! ```

use chrono::{DateTime, Utc};

use super::{CheckRunResult, FetchedCommit, FetchedPR, PullRequestState};

/// Parses an RFC 3339 timestamp, falling back to the Unix epoch.
#[must_use]
pub fn timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Constructs an open pull request with no nested data.
#[must_use]
pub fn minimal_pr(number: u64, created_at: &str, updated_at: &str) -> FetchedPR {
    FetchedPR {
        number,
        title: format!("PR {number}"),
        body: None,
        state: PullRequestState::Open,
        created_at: timestamp(created_at),
        updated_at: timestamp(updated_at),
        merged_at: None,
        closed_at: None,
        author: Some("alice".to_owned()),
        is_draft: false,
        additions: 0,
        deletions: 0,
        labels: Vec::new(),
        milestone: None,
        assignees: Vec::new(),
        linked_issues: Vec::new(),
        reviews: Vec::new(),
        commits: Vec::new(),
        files: Vec::new(),
        check_runs: Vec::new(),
    }
}

/// Constructs a pull request whose single commit is `head_sha`.
#[must_use]
pub fn pr_with_head(number: u64, updated_at: &str, head_sha: &str) -> FetchedPR {
    let mut pr = minimal_pr(number, updated_at, updated_at);
    pr.commits.push(commit(head_sha));
    pr
}

/// Constructs a commit with only the SHA and message set.
#[must_use]
pub fn commit(sha: &str) -> FetchedCommit {
    FetchedCommit {
        sha: sha.to_owned(),
        message: format!("commit {sha}"),
        author_login: None,
        author_name: None,
        authored_at: None,
        committed_at: None,
        additions: 0,
        deletions: 0,
    }
}

/// Constructs a completed, successful check run for `head_sha`.
#[must_use]
pub fn check_run(id: u64, name: &str, head_sha: &str) -> CheckRunResult {
    CheckRunResult {
        id,
        name: name.to_owned(),
        status: "completed".to_owned(),
        conclusion: Some("success".to_owned()),
        started_at: None,
        completed_at: None,
        head_sha: head_sha.to_owned(),
    }
}
