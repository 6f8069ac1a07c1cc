//! Error types for the pipeline.

use stars_search_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur while fetching, loading or scheduling runs.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Invalid component configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The request to the remote API could not be completed.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The remote API answered with GraphQL errors.
    #[error("GraphQL error: {0}")]
    GraphqlError(String),

    /// The remote API response could not be decoded.
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Records could not be handed to the search index.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Invalid schedule expression or timezone.
    #[error("Schedule error: {0}")]
    ScheduleError(String),

    /// A background task panicked or was aborted.
    #[error("Task error: {0}")]
    TaskError(String),

    /// Search index error.
    #[error("Search index error: {0}")]
    SearchIndexError(#[from] SearchIndexError),
}

impl PipelineError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }

    /// Create a GraphQL error.
    pub fn graphql(msg: impl Into<String>) -> Self {
        Self::GraphqlError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a schedule error.
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::ScheduleError(msg.into())
    }

    /// Create a task error.
    pub fn task(msg: impl Into<String>) -> Self {
        Self::TaskError(msg.into())
    }
}
