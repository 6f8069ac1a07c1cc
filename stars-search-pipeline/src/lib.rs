//! # Stars Search Pipeline
//!
//! This crate provides the pipeline components for harvesting starred
//! repositories from the GitHub GraphQL API and indexing them into the
//! search index.
//!
//! ## Architecture
//!
//! The pipeline follows the Fetcher-Loader pattern:
//!
//! 1. **Fetcher**: Walks the paginated stars of the viewer and streams records
//! 2. **Loader**: Hands the buffered records to the batch indexer
//! 3. **Orchestrator**: Drives one run at a time, on demand or on schedule
//! 4. **Scheduler**: Computes the next trigger time from a cron expression

pub mod errors;
pub mod fetcher;
pub mod loader;
pub mod orchestrator;
pub mod scheduler;

pub use errors::PipelineError;
pub use fetcher::{
    FetchSummary, FetcherConfig, GitHubClient, GitHubClientConfig, ReadmePolicy, RetryPolicy,
    StarsFetcher, StarsSource, StarsStream, StopReason,
};
pub use loader::{LoaderConfig, SearchLoader};
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunOutcome, RunReport};
pub use scheduler::Schedule;
