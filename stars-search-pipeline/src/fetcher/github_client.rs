//! GitHub GraphQL client for the starred repositories of the viewer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use crate::errors::PipelineError;
use crate::fetcher::readme::{resolve_readme, ReadmePolicy};
use crate::fetcher::source::StarsSource;
use stars_search_shared::{Page, PageInfo, PrimaryLanguage, RateLimit, Repository, StarredRepository};

/// The public GitHub GraphQL API endpoint.
pub const GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

/// Largest `first` argument accepted by the GitHub connection API.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of the viewer's stars, with two README candidates per repository
/// and the rate limit snapshot of the request.
const STARRED_REPOSITORIES_QUERY: &str = r#"
query StarredRepositories($count: Int!, $cursor: String) {
  viewer {
    login
    starredRepositories(first: $count, after: $cursor) {
      totalCount
      pageInfo {
        startCursor
        endCursor
        hasNextPage
        hasPreviousPage
      }
      edges {
        starredAt
        node {
          id
          nameWithOwner
          description
          url
          r1: object(expression: "HEAD:README.md") {
            ... on Blob {
              text
            }
          }
          r2: object(expression: "HEAD:readme.md") {
            ... on Blob {
              text
            }
          }
          primaryLanguage {
            id
            name
            color
          }
        }
      }
    }
  }
  rateLimit {
    cost
    limit
    remaining
    used
    resetAt
  }
}
"#;

/// Configuration for the GitHub client.
#[derive(Clone)]
pub struct GitHubClientConfig {
    /// Bearer token sent with every request.
    pub token: String,
    pub endpoint: String,
    pub user_agent: String,
    /// Timeout of a single page request.
    pub timeout: Duration,
    pub readme_policy: ReadmePolicy,
}

impl GitHubClientConfig {
    /// Create a config for `token` against the public endpoint.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: GRAPHQL_ENDPOINT.to_string(),
            user_agent: concat!("stars-search/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            readme_policy: ReadmePolicy::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_readme_policy(mut self, policy: ReadmePolicy) -> Self {
        self.readme_policy = policy;
        self
    }

    /// Check that the credential and endpoint are set.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.token.trim().is_empty() {
            return Err(PipelineError::config("missing GitHub API token"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(PipelineError::config("missing GitHub GraphQL API endpoint"));
        }
        Ok(())
    }
}

impl fmt::Debug for GitHubClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClientConfig")
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("readme_policy", &self.readme_policy)
            .finish()
    }
}

/// Client for the GitHub GraphQL API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubClientConfig,
}

impl GitHubClient {
    /// Create a new GitHub client.
    ///
    /// # Returns
    ///
    /// * `Ok(GitHubClient)` - A client ready to fetch pages
    /// * `Err(PipelineError::ConfigError)` - If the token or endpoint is missing,
    ///   or the HTTP client cannot be built
    pub fn new(config: GitHubClientConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build HTTP client: {}", e)))?;

        info!(endpoint = %config.endpoint, "Created GitHub client");
        Ok(Self { http, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn request_body(cursor: &str, page_size: u32) -> Value {
        // the connection starts from the beginning when `after` is null
        let cursor = if cursor.is_empty() {
            Value::Null
        } else {
            Value::String(cursor.to_string())
        };

        json!({
            "query": STARRED_REPOSITORIES_QUERY,
            "variables": {
                "count": page_size.clamp(1, MAX_PAGE_SIZE),
                "cursor": cursor,
            }
        })
    }
}

#[async_trait]
impl StarsSource for GitHubClient {
    #[instrument(skip(self), fields(component = "github"))]
    async fn fetch_page(&self, cursor: &str, page_size: u32) -> Result<Page, PipelineError> {
        let started = Instant::now();
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.token)
            .json(&Self::request_body(cursor, page_size))
            .send()
            .await
            .map_err(|e| PipelineError::transport(format!("request failed: {}", e)))?;

        let status = response.status();
        debug!(
            endpoint = %self.config.endpoint,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "GraphQL request"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::transport(format!(
                "unexpected status {}: {}",
                status, body
            )));
        }

        let payload: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::decode(format!("invalid response body: {}", e)))?;

        payload.into_page(self.config.readme_policy)
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<StarsData>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StarsData {
    viewer: Viewer,
    rate_limit: Option<RateLimitNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Viewer {
    starred_repositories: StarredConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StarredConnection {
    total_count: Option<u64>,
    page_info: PageInfoNode,
    #[serde(default)]
    edges: Vec<StarredEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfoNode {
    start_cursor: Option<String>,
    end_cursor: Option<String>,
    has_next_page: bool,
    #[serde(default)]
    has_previous_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StarredEdge {
    starred_at: DateTime<Utc>,
    node: RepositoryNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    id: String,
    name_with_owner: String,
    description: Option<String>,
    url: String,
    r1: Option<BlobNode>,
    r2: Option<BlobNode>,
    primary_language: Option<LanguageNode>,
}

/// `object(expression:)` resolves to an empty object when the path is not a blob.
#[derive(Debug, Deserialize)]
struct BlobNode {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LanguageNode {
    id: String,
    name: String,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitNode {
    #[serde(default)]
    cost: i64,
    limit: i64,
    remaining: i64,
    used: i64,
    reset_at: DateTime<Utc>,
}

impl GraphqlResponse {
    fn into_page(self, policy: ReadmePolicy) -> Result<Page, PipelineError> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(PipelineError::graphql(messages.join("; ")));
        }

        let data = self
            .data
            .ok_or_else(|| PipelineError::decode("response carries neither data nor errors"))?;
        let connection = data.viewer.starred_repositories;

        let records = connection
            .edges
            .into_iter()
            .map(|edge| edge.into_record(policy))
            .collect();

        Ok(Page {
            records,
            page_info: PageInfo {
                start_cursor: connection.page_info.start_cursor,
                end_cursor: connection.page_info.end_cursor,
                has_next_page: connection.page_info.has_next_page,
                has_previous_page: connection.page_info.has_previous_page,
            },
            rate_limit: data.rate_limit.map(|rl| RateLimit {
                cost: rl.cost,
                limit: rl.limit,
                remaining: rl.remaining,
                used: rl.used,
                reset_at: rl.reset_at,
            }),
            total_count: connection.total_count,
        })
    }
}

impl StarredEdge {
    fn into_record(self, policy: ReadmePolicy) -> StarredRepository {
        let node = self.node;
        let readme = resolve_readme(
            policy,
            [node.r1, node.r2].into_iter().map(|blob| blob.and_then(|b| b.text)),
        );

        let repository = Repository {
            id: node.id,
            name_with_owner: node.name_with_owner,
            description: node.description.filter(|d| !d.is_empty()),
            url: node.url,
            readme,
            primary_language: node.primary_language.map(|lang| PrimaryLanguage {
                id: lang.id,
                name: lang.name,
                color: lang.color,
            }),
        };

        StarredRepository::new(repository, self.starred_at)
    }
}
