//! GraphQL documents sent by the fetcher.

/// Repository push timestamp, used for change detection (about one point).
pub(super) const REPOSITORY_METADATA_QUERY: &str = r"
query RepositoryMetadata($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    nameWithOwner
    pushedAt
  }
}
";

/// One page of pull requests with bounded nested connections.
///
/// `$orderField` is `CREATED_AT` for full fetches and `UPDATED_AT` for
/// incremental fetches; both are walked newest first.
pub(super) const PULL_REQUESTS_QUERY: &str = r"
query PullRequestsWithDetails(
  $owner: String!,
  $name: String!,
  $pageSize: Int!,
  $cursor: String,
  $orderField: IssueOrderField!,
  $reviewsPerPr: Int!,
  $commitsPerPr: Int!,
  $filesPerPr: Int!
) {
  rateLimit {
    cost
    remaining
    resetAt
  }
  repository(owner: $owner, name: $name) {
    pullRequests(
      first: $pageSize,
      after: $cursor,
      orderBy: { field: $orderField, direction: DESC }
    ) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        number
        title
        body
        state
        isDraft
        createdAt
        updatedAt
        mergedAt
        closedAt
        additions
        deletions
        author { login }
        labels(first: 20) { nodes { name } }
        milestone { title }
        assignees(first: 10) { nodes { login } }
        closingIssuesReferences(first: 10) { nodes { number } }
        reviews(first: $reviewsPerPr) {
          totalCount
          nodes {
            databaseId
            state
            body
            submittedAt
            author { login }
          }
        }
        commits(last: $commitsPerPr) {
          totalCount
          nodes {
            commit {
              oid
              message
              additions
              deletions
              authoredDate
              committedDate
              author {
                name
                user { login }
              }
            }
          }
        }
        files(first: $filesPerPr) {
          totalCount
          nodes {
            path
            additions
            deletions
            changeType
          }
        }
      }
    }
  }
}
";
