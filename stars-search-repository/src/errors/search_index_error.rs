//! Errors of the tantivy-backed repository index.
//!
//! Client errors (bad input) are told apart from storage and query failures so
//! the HTTP layer can map them to `400` and `500`.

use thiserror::Error;

/// Failure of an indexing or query operation on the repository index.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., empty query, zero batch size).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to open or create the index.
    #[error("Open error: {0}")]
    OpenError(String),

    /// Failed to add a document to a batch.
    #[error("Index error: {0}")]
    IndexError(String),

    /// A document could not be turned into an index document.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Failed to submit a batch to the index storage.
    #[error("Submit error: {0}")]
    SubmitError(String),

    /// The query string could not be parsed by the query grammar.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Search query execution failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// The caller cancelled the request or its deadline expired.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create an open error.
    pub fn open(msg: impl Into<String>) -> Self {
        Self::OpenError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a submit error.
    pub fn submit(msg: impl Into<String>) -> Self {
        Self::SubmitError(msg.into())
    }

    /// Create an invalid query error.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a cancellation error.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Whether the error comes from a cancelled or expired request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Whether the error was caused by caller input rather than the storage.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::BatchSizeExceeded { .. }
        )
    }
}
