//! Canned GitHub GraphQL and REST responses for sync tests.

use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

/// Reset far enough ahead that no quota window expires mid-test.
const RESET_EPOCH: u64 = 1_900_000_000;

/// Head commit SHA used for pull request `number`.
pub fn head_sha(number: u64) -> String {
    format!("{number:040x}")
}

/// A pull request node as returned by the `PullRequestsWithDetails` query.
pub fn pull_request_node(number: u64, created_at: &str, updated_at: &str) -> Value {
    json!({
        "number": number,
        "title": format!("Change {number}"),
        "body": "Details",
        "state": "OPEN",
        "isDraft": false,
        "createdAt": created_at,
        "updatedAt": updated_at,
        "additions": 10,
        "deletions": 2,
        "author": { "login": "alice" },
        "labels": { "nodes": [{ "name": "backend" }] },
        "assignees": { "nodes": [{ "login": "carol" }] },
        "reviews": {
            "totalCount": 1,
            "nodes": [{
                "databaseId": number * 100,
                "state": "APPROVED",
                "body": "Looks good",
                "submittedAt": updated_at,
                "author": { "login": "bob" }
            }]
        },
        "commits": {
            "totalCount": 1,
            "nodes": [{
                "commit": {
                    "oid": head_sha(number),
                    "message": format!("Implement change {number}"),
                    "additions": 10,
                    "deletions": 2,
                    "authoredDate": created_at,
                    "committedDate": created_at,
                    "author": { "name": "Alice", "user": { "login": "alice" } }
                }
            }]
        },
        "files": {
            "totalCount": 1,
            "nodes": [{
                "path": "src/lib.rs",
                "additions": 10,
                "deletions": 2,
                "changeType": "MODIFIED"
            }]
        }
    })
}

/// Repository metadata query response.
pub fn metadata_mock(repository: &str, pushed_at: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("RepositoryMetadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "repository": { "nameWithOwner": repository, "pushedAt": pushed_at } }
        })))
        .named("repository metadata")
}

/// A single, final page of pull requests for queries ordered by `order_field`.
pub fn pull_requests_mock(order_field: &str, nodes: Vec<Value>) -> Mock {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("PullRequestsWithDetails"))
        .and(body_string_contains(order_field))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "rateLimit": { "cost": 1, "remaining": 4999, "resetAt": "2030-03-17T17:46:40Z" },
                "repository": {
                    "pullRequests": {
                        "pageInfo": { "hasNextPage": false, "endCursor": null },
                        "nodes": nodes
                    }
                }
            }
        })))
        .named("pull request page")
}

/// `/rate_limit` reporting `remaining` REST requests.
pub fn rest_quota_mock(remaining: u32) -> Mock {
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": {
                "core": { "limit": 5000, "remaining": remaining, "reset": RESET_EPOCH },
                "graphql": { "limit": 5000, "remaining": 4999, "reset": RESET_EPOCH }
            }
        })))
        .named("rate limit")
}

/// One successful check run for any commit.
pub fn check_runs_mock() -> Mock {
    Mock::given(method("GET"))
        .and(path_regex(r"^/repos/[^/]+/[^/]+/commits/[0-9a-f]+/check-runs$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "check_runs": [{
                "id": 1,
                "name": "build",
                "status": "completed",
                "conclusion": "success",
                "started_at": "2024-06-01T00:00:00Z",
                "completed_at": "2024-06-01T00:05:00Z",
                "head_sha": head_sha(1)
            }]
        })))
        .named("check runs")
}
