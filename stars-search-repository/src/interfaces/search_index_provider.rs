//! Search index provider trait definition.
//!
//! This module defines the abstract interface for index storage operations,
//! allowing for different backend implementations (tantivy, in-memory mocks).

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::IndexBatch;
use stars_search_shared::{SearchQuery, SearchResponse};

/// Abstracts the underlying index storage.
///
/// Implementations are injected into [`SearchIndexClient`](crate::SearchIndexClient)
/// to enable dependency injection and easy testing with mock implementations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Queries may run concurrently
/// with each other and with a batch submission; readers observe whole
/// batches only.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Apply a batch of documents in one atomic submission.
    ///
    /// Each document replaces any previously stored document with the same id.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every document of the batch is committed and visible
    /// * `Err(SearchIndexError)` - Nothing from this batch is committed
    async fn submit_batch(&self, batch: IndexBatch) -> Result<(), SearchIndexError>;

    /// Execute a query-string search.
    ///
    /// # Arguments
    ///
    /// * `query` - Query text, offset, size and projected fields
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResponse)` - Ranked hits ordered by relevance
    /// * `Err(SearchIndexError::InvalidQuery)` - If the query grammar rejects the text
    /// * `Err(SearchIndexError)` - If the search fails
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchIndexError>;

    /// Number of documents currently visible to searches.
    async fn document_count(&self) -> Result<u64, SearchIndexError>;
}
