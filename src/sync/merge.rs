//! Reconciles a cached pull request set with an incremental fetch.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::github::models::FetchedPR;

/// Merges `updated` into `cached`, newest copy winning by PR number.
///
/// A pull request present in `updated` replaces its cached counterpart
/// wholesale; cached-only pull requests are kept unchanged. The result is
/// sorted by `updated_at` descending, ties broken by number descending so
/// the order is total.
#[must_use]
pub fn merge_pull_requests(cached: Vec<FetchedPR>, updated: Vec<FetchedPR>) -> Vec<FetchedPR> {
    let mut by_number: HashMap<u64, FetchedPR> =
        HashMap::with_capacity(cached.len().saturating_add(updated.len()));
    for pr in cached.into_iter().chain(updated) {
        by_number.insert(pr.number, pr);
    }

    let mut merged: Vec<FetchedPR> = by_number.into_values().collect();
    merged.sort_by(recency_order);
    merged
}

/// Most recently updated first, then highest number first.
pub(crate) fn recency_order(left: &FetchedPR, right: &FetchedPR) -> Ordering {
    right
        .updated_at
        .cmp(&left.updated_at)
        .then_with(|| right.number.cmp(&left.number))
}
