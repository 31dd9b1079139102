//! Repository identity and credential wrappers.

use std::fmt;

use url::Url;

use super::error::FetchError;

/// Public GitHub REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    pub(crate) fn new(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub(crate) fn new(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// A repository on a GitHub host together with the API base used to reach it.
///
/// # Example
///
/// ```
/// use prseed::RepositoryLocator;
///
/// let locator = RepositoryLocator::parse("octo/hello-world").expect("should parse");
/// assert_eq!(locator.full_name(), "octo/hello-world");
/// assert_eq!(locator.graphql_endpoint().as_str(), "https://api.github.com/graphql");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Parses `owner/name` against the public GitHub API.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRepository`] when the identifier is not
    /// exactly two non-empty segments.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        Self::parse_with_base(input, DEFAULT_API_BASE)
    }

    /// Parses `owner/name` against an explicit REST API base.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidRepository`] for malformed identifiers and
    /// [`FetchError::InvalidUrl`] when `api_base` is not a valid URL.
    pub fn parse_with_base(input: &str, api_base: &str) -> Result<Self, FetchError> {
        let invalid = || FetchError::InvalidRepository {
            input: input.to_owned(),
        };
        let (owner_segment, name_segment) = input.trim().split_once('/').ok_or_else(invalid)?;
        let owner = RepositoryOwner::new(owner_segment).ok_or_else(invalid)?;
        let repository = RepositoryName::new(name_segment).ok_or_else(invalid)?;
        let parsed_base =
            Url::parse(api_base).map_err(|error| FetchError::InvalidUrl(error.to_string()))?;

        Ok(Self {
            api_base: parsed_base,
            owner,
            repository,
        })
    }

    /// REST API base URL.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Returns `owner/name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.as_str(), self.repository.as_str())
    }

    /// GraphQL endpoint matching the REST base.
    ///
    /// GitHub Enterprise serves REST under `/api/v3` and GraphQL under
    /// `/api/graphql`; everywhere else GraphQL lives at `<base>/graphql`.
    #[must_use]
    pub fn graphql_endpoint(&self) -> Url {
        graphql_endpoint_for(&self.api_base)
    }

    /// REST path listing check runs for a commit.
    pub(crate) fn check_runs_path(&self, sha: &str) -> String {
        format!(
            "/repos/{}/{}/commits/{sha}/check-runs",
            self.owner.as_str(),
            self.repository.as_str()
        )
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}/{}",
            self.owner.as_str(),
            self.repository.as_str()
        )
    }
}

/// Derives the GraphQL endpoint from a REST API base URL.
#[must_use]
pub fn graphql_endpoint_for(api_base: &Url) -> Url {
    let mut endpoint = api_base.clone();
    let base_path = api_base.path().trim_end_matches('/');
    let graphql_path = base_path.strip_suffix("/api/v3").map_or_else(
        || format!("{base_path}/graphql"),
        |prefix| format!("{prefix}/api/graphql"),
    );
    endpoint.set_path(&graphql_path);
    endpoint
}

/// Personal access token wrapper enforcing presence.
///
/// `Debug` output is masked so tokens never leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, FetchError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(FetchError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }

    /// Returns a log-safe rendering showing at most the last four characters.
    #[must_use]
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        if count <= 8 {
            return "****".to_owned();
        }
        let tail: String = self.0.chars().skip(count.saturating_sub(4)).collect();
        format!("****{tail}")
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

impl fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("PersonalAccessToken")
            .field(&self.masked())
            .finish()
    }
}
