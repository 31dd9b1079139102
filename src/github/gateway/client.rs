//! HTTP-backed [`GitHubApi`] implementation.
//!
//! GraphQL queries are posted with `reqwest` so the response headers carrying
//! quota information stay visible; REST calls go through Octocrab.

use std::time::Duration;

use async_trait::async_trait;
use http::{StatusCode, Uri};
use octocrab::Octocrab;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::github::error::FetchError;
use crate::github::locator::{PersonalAccessToken, RepositoryLocator, graphql_endpoint_for};
use crate::github::models::{ApiCheckRunList, CheckRunResult};
use crate::github::rate_limit::RateLimitInfo;

use super::error_mapping::{
    GRAPHQL_RATE_LIMITED, map_octocrab_error, map_reqwest_error, map_status_error,
};
use super::{GitHubApi, GraphQlRequest, GraphQlResponse, QuotaSnapshot};

const USER_AGENT: &str = concat!("prseed/", env!("CARGO_PKG_VERSION"));
const CHECK_RUNS_PER_PAGE: u8 = 100;

/// Client bound to one personal access token and one API host.
#[derive(Clone)]
pub struct HttpGitHubApi {
    token: PersonalAccessToken,
    graphql_endpoint: Url,
    http: reqwest::Client,
    rest: Octocrab,
}

impl HttpGitHubApi {
    /// Builds a client for `token` against the REST base `api_base`.
    ///
    /// `timeout` bounds each individual request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when the base URI cannot be parsed
    /// and [`FetchError::Configuration`] when either HTTP client cannot be
    /// constructed.
    pub fn new(
        token: &PersonalAccessToken,
        api_base: &Url,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let base_uri: Uri = api_base
            .as_str()
            .parse::<Uri>()
            .map_err(|error| FetchError::InvalidUrl(error.to_string()))?;

        let rest = Octocrab::builder()
            .personal_token(token.value())
            .base_uri(base_uri)
            .map_err(|error| FetchError::Configuration {
                message: format!("build REST client failed: {error}"),
            })?
            .set_connect_timeout(Some(timeout))
            .set_read_timeout(Some(timeout))
            .build()
            .map_err(|error| map_octocrab_error("build REST client", &error))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| FetchError::Configuration {
                message: format!("build GraphQL client failed: {error}"),
            })?;

        Ok(Self {
            token: token.clone(),
            graphql_endpoint: graphql_endpoint_for(api_base),
            http,
            rest,
        })
    }

    async fn rest_get(&self, operation: &str, path: &str) -> Result<String, FetchError> {
        let uri: Uri = path
            .parse::<Uri>()
            .map_err(|error| FetchError::InvalidUrl(error.to_string()))?;

        let response = self
            .rest
            ._get(uri)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = self
            .rest
            .body_to_string(response)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(map_status_error(operation, status, &headers, &body))
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Interprets a 200 GraphQL body, which may still carry errors.
fn interpret_graphql_body(
    operation: &str,
    body: &str,
    rate_limit: Option<RateLimitInfo>,
) -> Result<GraphQlResponse, FetchError> {
    let envelope: GraphQlEnvelope =
        serde_json::from_str(body).map_err(|error| FetchError::Api {
            message: format!("{operation} response deserialisation failed: {error}"),
        })?;

    if envelope
        .errors
        .iter()
        .any(|error| error.kind.as_deref() == Some(GRAPHQL_RATE_LIMITED))
    {
        return Err(FetchError::RateLimitExceeded {
            rate_limit,
            message: format!("{operation}: {}", join_messages(&envelope.errors)),
        });
    }

    let data = envelope
        .data
        .filter(|value| !value.is_null())
        .ok_or_else(|| FetchError::Api {
            message: if envelope.errors.is_empty() {
                format!("{operation} returned no data")
            } else {
                format!("{operation} failed: {}", join_messages(&envelope.errors))
            },
        })?;

    if !envelope.errors.is_empty() {
        warn!(
            operation,
            errors = %join_messages(&envelope.errors),
            "GraphQL returned partial data"
        );
    }

    Ok(GraphQlResponse { data, rate_limit })
}

#[derive(Debug, Deserialize)]
struct ApiRateLimitResponse {
    resources: ApiRateResources,
}

#[derive(Debug, Deserialize)]
struct ApiRateResources {
    core: ApiRate,
    #[serde(default)]
    graphql: Option<ApiRate>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ApiRate {
    limit: u32,
    remaining: u32,
    reset: u64,
}

impl From<ApiRate> for RateLimitInfo {
    fn from(value: ApiRate) -> Self {
        Self::new(value.limit, value.remaining, value.reset)
    }
}

#[async_trait]
impl GitHubApi for HttpGitHubApi {
    async fn graphql(&self, request: &GraphQlRequest) -> Result<GraphQlResponse, FetchError> {
        let operation = request.operation;
        let response = self
            .http
            .post(self.graphql_endpoint.clone())
            .bearer_auth(self.token.value())
            .json(request)
            .send()
            .await
            .map_err(|error| map_reqwest_error(operation, &error))?;

        let status = response.status();
        let headers = response.headers().clone();
        let rate_limit = RateLimitInfo::from_headers(&headers);
        let body = response
            .text()
            .await
            .map_err(|error| map_reqwest_error(operation, &error))?;

        if status == StatusCode::OK {
            interpret_graphql_body(operation, &body, rate_limit)
        } else {
            Err(map_status_error(operation, status, &headers, &body))
        }
    }

    async fn rate_limits(&self) -> Result<QuotaSnapshot, FetchError> {
        let body = self.rest_get("rate limit", "/rate_limit").await?;
        let parsed: ApiRateLimitResponse =
            serde_json::from_str(&body).map_err(|error| FetchError::Api {
                message: format!("rate limit response deserialisation failed: {error}"),
            })?;

        Ok(QuotaSnapshot {
            core: parsed.resources.core.into(),
            graphql: parsed.resources.graphql.map(RateLimitInfo::from),
        })
    }

    async fn check_runs(
        &self,
        repository: &RepositoryLocator,
        sha: &str,
    ) -> Result<Vec<CheckRunResult>, FetchError> {
        let path = format!(
            "{}?per_page={CHECK_RUNS_PER_PAGE}",
            repository.check_runs_path(sha)
        );
        let body = self.rest_get("check runs", &path).await?;
        let parsed: ApiCheckRunList =
            serde_json::from_str(&body).map_err(|error| FetchError::Api {
                message: format!("check runs response deserialisation failed: {error}"),
            })?;

        Ok(parsed
            .check_runs
            .into_iter()
            .map(CheckRunResult::from)
            .collect())
    }
}
