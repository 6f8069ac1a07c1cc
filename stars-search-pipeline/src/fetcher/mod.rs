//! Fetcher module for the stars search pipeline.
//!
//! Walks the starred repositories of the authenticated GitHub user page by
//! page and streams them to the pipeline.

mod github_client;
mod readme;
mod retry;
mod source;
mod stars_fetcher;

pub use github_client::{GitHubClient, GitHubClientConfig, GRAPHQL_ENDPOINT, MAX_PAGE_SIZE};
pub use readme::{resolve_readme, ReadmePolicy};
pub use retry::RetryPolicy;
pub use source::StarsSource;
pub use stars_fetcher::{FetchSummary, FetcherConfig, StarsFetcher, StarsStream, StopReason};
