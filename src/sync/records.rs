//! Domain records derived from fetched pull requests.
//!
//! Records borrow from the [`FetchedPR`] they describe; the sink serialises
//! them immediately, so nothing is copied.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::github::models::{
    CheckRunResult, FetchedCommit, FetchedFile, FetchedPR, FetchedReview, PullRequestState,
};

/// One row handed to the persistence boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum SeedRecord<'a> {
    /// The pull request itself, without nested collections.
    PullRequest(PullRequestRecord<'a>),
    /// A review on a pull request.
    Review(ChildRecord<'a, FetchedReview>),
    /// A commit on a pull request branch.
    Commit(ChildRecord<'a, FetchedCommit>),
    /// A file changed by a pull request.
    File(ChildRecord<'a, FetchedFile>),
    /// A check run on a pull request's head commit.
    CheckRun(ChildRecord<'a, CheckRunResult>),
    /// A contributor seen as author, reviewer, committer or assignee.
    TeamMember(TeamMemberRecord<'a>),
}

/// Flat pull request row keyed by repository and number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PullRequestRecord<'a> {
    /// Repository in `owner/name` form.
    pub repository: &'a str,
    /// Pull request number.
    pub number: u64,
    /// Title.
    pub title: &'a str,
    /// Description body.
    pub body: Option<&'a str>,
    /// Current state.
    pub state: PullRequestState,
    /// Author login.
    pub author: Option<&'a str>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Merge timestamp.
    pub merged_at: Option<DateTime<Utc>>,
    /// Close timestamp.
    pub closed_at: Option<DateTime<Utc>>,
    /// Draft flag.
    pub is_draft: bool,
    /// Lines added.
    pub additions: u64,
    /// Lines removed.
    pub deletions: u64,
    /// Label names.
    pub labels: &'a [String],
    /// Milestone title.
    pub milestone: Option<&'a str>,
    /// Assignee logins.
    pub assignees: &'a [String],
    /// Issues closed by the pull request.
    pub linked_issues: &'a [u64],
}

/// Row nested under a pull request; the item's own fields are flattened in.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ChildRecord<'a, T> {
    /// Repository in `owner/name` form.
    pub repository: &'a str,
    /// Owning pull request number.
    pub pr_number: u64,
    /// The nested item.
    #[serde(flatten)]
    pub item: &'a T,
}

impl<T> Clone for ChildRecord<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ChildRecord<'_, T> {}

/// Contributor row, deduplicated by login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamMemberRecord<'a> {
    /// Repository where the contributor was first seen in this run.
    pub repository: &'a str,
    /// GitHub login.
    pub login: &'a str,
}

/// Every record for `pr` except team members, parent row first.
#[must_use]
pub fn pull_request_records<'a>(repository: &'a str, pr: &'a FetchedPR) -> Vec<SeedRecord<'a>> {
    let mut records = Vec::with_capacity(
        1 + pr.reviews.len() + pr.commits.len() + pr.files.len() + pr.check_runs.len(),
    );
    records.push(SeedRecord::PullRequest(PullRequestRecord {
        repository,
        number: pr.number,
        title: &pr.title,
        body: pr.body.as_deref(),
        state: pr.state,
        author: pr.author.as_deref(),
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        merged_at: pr.merged_at,
        closed_at: pr.closed_at,
        is_draft: pr.is_draft,
        additions: pr.additions,
        deletions: pr.deletions,
        labels: &pr.labels,
        milestone: pr.milestone.as_deref(),
        assignees: &pr.assignees,
        linked_issues: &pr.linked_issues,
    }));
    records.extend(children(repository, pr.number, &pr.reviews).map(SeedRecord::Review));
    records.extend(children(repository, pr.number, &pr.commits).map(SeedRecord::Commit));
    records.extend(children(repository, pr.number, &pr.files).map(SeedRecord::File));
    records.extend(children(repository, pr.number, &pr.check_runs).map(SeedRecord::CheckRun));
    records
}

fn children<'a, T>(
    repository: &'a str,
    pr_number: u64,
    items: &'a [T],
) -> impl Iterator<Item = ChildRecord<'a, T>> + 'a {
    items.iter().map(move |item| ChildRecord {
        repository,
        pr_number,
        item,
    })
}

/// Logins of everyone who took part in `pr`, sorted and unique.
#[must_use]
pub fn participants(pr: &FetchedPR) -> BTreeSet<&str> {
    pr.author
        .iter()
        .chain(pr.reviews.iter().filter_map(|review| review.reviewer.as_ref()))
        .chain(pr.commits.iter().filter_map(|commit| commit.author_login.as_ref()))
        .chain(pr.assignees.iter())
        .map(String::as_str)
        .filter(|login| !login.is_empty())
        .collect()
}
