//! Search index client implementation.
//!
//! This module provides the main client for interacting with the search index.
//! The ingestion pipeline uses it to index records in batches and the HTTP
//! layer uses it to run queries.

use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::config::SearchIndexConfig;
use crate::context::SearchContext;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{BatchIndexSummary, IndexBatch};
use stars_search_shared::{Indexable, SearchQuery, SearchResponse};

/// The main client for interacting with the search index.
#[derive(Clone)]
pub struct SearchIndexClient {
    provider: Arc<dyn SearchIndexProvider>,
    config: SearchIndexConfig,
}

impl SearchIndexClient {
    /// Create a new SearchIndexClient with default configuration.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexConfig::default(),
        }
    }

    /// Create a new SearchIndexClient with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: SearchIndexConfig) -> Self {
        Self { provider, config }
    }

    /// Check the requested batch size against zero and the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), SearchIndexError> {
        if size == 0 {
            return Err(SearchIndexError::validation("batch size must be positive"));
        }
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchIndexError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    /// Index `records` in batches of `batch_size`.
    ///
    /// Records are split into contiguous groups of exactly `batch_size`; the
    /// last group holds the remainder and is submitted when non-empty. Each
    /// group is one atomic submission. Later records with an id already in
    /// the index replace the stored document.
    ///
    /// # Partial failure
    ///
    /// The first failing submission aborts the run and is returned. Groups
    /// submitted before it stay indexed; the failing group and every group
    /// after it are not indexed. Callers must assume the index may be
    /// partially updated when this returns an error.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchIndexSummary)` - How many documents and submissions were made
    /// * `Err(SearchIndexError)` - The first serialization or submission failure
    #[instrument(skip(self, records), fields(count = records.len(), batch_size))]
    pub async fn batch_index<T: Indexable>(
        &self,
        records: &[T],
        batch_size: usize,
    ) -> Result<BatchIndexSummary, SearchIndexError> {
        self.validate_batch_size(batch_size)?;

        let mut summary = BatchIndexSummary::default();
        if records.is_empty() {
            debug!("Nothing to index");
            return Ok(summary);
        }

        debug!(count = records.len(), "Indexing documents");
        for group in records.chunks(batch_size) {
            let mut batch = IndexBatch::with_capacity(group.len());
            for record in group {
                debug!(id = %record.document_id(), "Queueing document");
                batch.add(record)?;
            }

            let count = batch.len();
            debug!(count = count, "Indexing batch");
            if let Err(e) = self.provider.submit_batch(batch).await {
                error!(
                    error = %e,
                    batch = summary.batches,
                    indexed = summary.documents,
                    "Failed to index batch"
                );
                return Err(e);
            }

            summary.batches += 1;
            summary.documents += count;
        }

        info!(
            documents = summary.documents,
            batches = summary.batches,
            "Indexed documents"
        );
        Ok(summary)
    }

    /// Query the search index.
    ///
    /// The query runs until it completes, `ctx` is cancelled, or the
    /// deadline of `ctx` passes, whichever comes first. A cancelled query
    /// returns [`SearchIndexError::Cancelled`] and no hits.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResponse)` - Ranked hits for the requested page
    /// * `Err(SearchIndexError::ValidationError)` - If the query text is blank or
    ///   `from + size` exceeds the configured result window
    /// * `Err(SearchIndexError::Cancelled)` - If `ctx` ended first
    /// * `Err(SearchIndexError)` - Any storage or query grammar failure
    pub async fn search(
        &self,
        ctx: &SearchContext,
        query: &SearchQuery,
    ) -> Result<SearchResponse, SearchIndexError> {
        if query.is_blank() {
            return Err(SearchIndexError::validation("query must not be empty"));
        }
        let window = query.from.saturating_add(query.size);
        if window > self.config.max_result_window {
            return Err(SearchIndexError::validation(format!(
                "from + size must not exceed {}, got {}",
                self.config.max_result_window, window
            )));
        }
        if let Some(reason) = ctx.done_reason() {
            return Err(SearchIndexError::cancelled(reason));
        }

        tokio::select! {
            biased;
            _ = ctx.done() => {
                let reason = ctx.done_reason().unwrap_or("context cancelled");
                debug!(query = %query.query, reason = reason, "Search aborted");
                Err(SearchIndexError::cancelled(reason))
            }
            result = self.provider.search(query) => result,
        }
    }

    /// Number of documents currently searchable.
    pub async fn document_count(&self) -> Result<u64, SearchIndexError> {
        self.provider.document_count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tantivy_index::{IndexSchema, TantivyProvider};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use stars_search_shared::{Repository, StarredRepository};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock provider recording the size of every submitted batch.
    #[derive(Default)]
    struct MockProvider {
        submissions: Mutex<Vec<Vec<String>>>,
        fail_on_submission: Option<usize>,
        search_delay: Option<Duration>,
    }

    impl MockProvider {
        fn failing_on(submission: usize) -> Self {
            Self {
                fail_on_submission: Some(submission),
                ..Default::default()
            }
        }

        fn sizes(&self) -> Vec<usize> {
            self.submissions.lock().unwrap().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl SearchIndexProvider for MockProvider {
        async fn submit_batch(&self, batch: IndexBatch) -> Result<(), SearchIndexError> {
            let mut submissions = self.submissions.lock().unwrap();
            if self.fail_on_submission == Some(submissions.len()) {
                return Err(SearchIndexError::submit("disk full"));
            }
            submissions.push(batch.operations().iter().map(|op| op.id.clone()).collect());
            Ok(())
        }

        async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchIndexError> {
            if let Some(delay) = self.search_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(SearchResponse::empty(query))
        }

        async fn document_count(&self) -> Result<u64, SearchIndexError> {
            Ok(self.submissions.lock().unwrap().iter().map(|s| s.len() as u64).sum())
        }
    }

    fn repos(count: usize) -> Vec<Repository> {
        (0..count)
            .map(|i| {
                Repository::new(
                    format!("R_{}", i),
                    format!("owner/repo-{}", i),
                    format!("https://github.com/owner/repo-{}", i),
                )
                .with_description("a starred repository")
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batch_partitioning() {
        let provider = Arc::new(MockProvider::default());
        let client = SearchIndexClient::new(provider.clone());

        let summary = client.batch_index(&repos(250), 100).await.unwrap();

        assert_eq!(provider.sizes(), vec![100, 100, 50]);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.documents, 250);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_trailing_submission() {
        let provider = Arc::new(MockProvider::default());
        let client = SearchIndexClient::new(provider.clone());

        client.batch_index(&repos(200), 100).await.unwrap();

        assert_eq!(provider.sizes(), vec![100, 100]);
    }

    #[tokio::test]
    async fn test_batches_preserve_record_order() {
        let provider = Arc::new(MockProvider::default());
        let client = SearchIndexClient::new(provider.clone());

        client.batch_index(&repos(5), 2).await.unwrap();

        let submissions = provider.submissions.lock().unwrap().clone();
        assert_eq!(
            submissions,
            vec![
                vec!["R_0".to_string(), "R_1".to_string()],
                vec!["R_2".to_string(), "R_3".to_string()],
                vec!["R_4".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let provider = Arc::new(MockProvider::default());
        let client = SearchIndexClient::new(provider.clone());

        let summary = client.batch_index::<Repository>(&[], 100).await.unwrap();

        assert_eq!(summary, BatchIndexSummary::default());
        assert!(provider.sizes().is_empty());
    }

    #[tokio::test]
    async fn test_failure_aborts_and_keeps_prior_batches() {
        let provider = Arc::new(MockProvider::failing_on(1));
        let client = SearchIndexClient::new(provider.clone());

        let result = client.batch_index(&repos(250), 100).await;

        assert!(matches!(result, Err(SearchIndexError::SubmitError(_))));
        // first batch persisted, failing and later batches never submitted
        assert_eq!(provider.sizes(), vec![100]);
    }

    #[tokio::test]
    async fn test_default_config_accepts_any_positive_batch_size() {
        let provider = Arc::new(MockProvider::default());
        let client = SearchIndexClient::new(provider.clone());

        let summary = client.batch_index(&repos(3), 2000).await.unwrap();

        assert_eq!(summary.documents, 3);
        assert_eq!(provider.sizes(), vec![3]);
    }

    #[tokio::test]
    async fn test_invalid_batch_sizes() {
        let client = SearchIndexClient::with_config(
            Arc::new(MockProvider::default()),
            SearchIndexConfig::with_max_batch_size(500),
        );

        assert!(matches!(
            client.batch_index(&repos(3), 0).await,
            Err(SearchIndexError::ValidationError(_))
        ));
        assert!(matches!(
            client.batch_index(&repos(3), 501).await,
            Err(SearchIndexError::BatchSizeExceeded { provided: 501, max: 500 })
        ));
    }

    #[tokio::test]
    async fn test_upsert_keeps_latest_values() {
        let provider = Arc::new(TantivyProvider::in_memory(IndexSchema::repository()).unwrap());
        let client = SearchIndexClient::new(provider);

        let first = Repository::new("R_1", "old/name", "https://github.com/old/name")
            .with_description("original description");
        client.batch_index(&[first], 100).await.unwrap();

        let second = Repository::new("R_1", "new/name", "https://github.com/new/name")
            .with_description("rewritten description");
        client.batch_index(&[second], 100).await.unwrap();

        let response = client
            .search(&SearchContext::new(), &SearchQuery::new("description"))
            .await
            .unwrap();

        assert_eq!(response.total_hits, 1);
        assert_eq!(response.hits[0].id, "R_1");
        assert_eq!(response.hits[0].fields["name_with_owner"], json!("new/name"));
        assert_eq!(
            response.hits[0].fields["description"],
            json!("rewritten description")
        );
        assert_eq!(client.document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_within_a_single_batch() {
        let provider = Arc::new(TantivyProvider::in_memory(IndexSchema::repository()).unwrap());
        let client = SearchIndexClient::new(provider);

        let records = vec![
            Repository::new("R_1", "a/first", "https://github.com/a/first"),
            Repository::new("R_1", "a/second", "https://github.com/a/second"),
        ];
        client.batch_index(&records, 10).await.unwrap();

        let response = client
            .search(&SearchContext::new(), &SearchQuery::new("id:R_1"))
            .await
            .unwrap();

        assert_eq!(response.total_hits, 1);
        assert_eq!(response.hits[0].fields["name_with_owner"], json!("a/second"));
    }

    #[tokio::test]
    async fn test_query_pagination() {
        let provider = Arc::new(TantivyProvider::in_memory(IndexSchema::repository()).unwrap());
        let client = SearchIndexClient::new(provider);
        client.batch_index(&repos(15), 4).await.unwrap();

        let ctx = SearchContext::new();
        let first = client
            .search(&ctx, &SearchQuery::new("starred").with_size(10))
            .await
            .unwrap();
        let second = client
            .search(&ctx, &SearchQuery::new("starred").with_size(10).with_from(10))
            .await
            .unwrap();

        assert_eq!(first.total_hits, 15);
        assert_eq!(first.hits.len(), 10);
        assert_eq!(second.hits.len(), 5);

        let mut ids: Vec<String> = first
            .hits
            .iter()
            .chain(second.hits.iter())
            .map(|hit| hit.id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 15);
    }

    #[tokio::test]
    async fn test_field_projection() {
        let provider = Arc::new(TantivyProvider::in_memory(IndexSchema::repository()).unwrap());
        let client = SearchIndexClient::new(provider);
        let starred = StarredRepository::new(
            Repository::new("R_1", "a/b", "https://github.com/a/b").with_description("projection"),
            Utc::now(),
        );
        client.batch_index(&[starred], 10).await.unwrap();

        let projected = client
            .search(
                &SearchContext::new(),
                &SearchQuery::new("projection").with_fields(["url"]),
            )
            .await
            .unwrap();
        let default = client
            .search(&SearchContext::new(), &SearchQuery::new("projection"))
            .await
            .unwrap();

        let keys: Vec<&String> = projected.hits[0].fields.keys().collect();
        assert_eq!(keys, vec!["url"]);
        assert!(default.hits[0].fields.contains_key("description"));
        assert!(default.hits[0].fields.contains_key("starred_at"));
    }

    #[tokio::test]
    async fn test_expired_deadline_returns_cancellation() {
        let provider = Arc::new(TantivyProvider::in_memory(IndexSchema::repository()).unwrap());
        let client = SearchIndexClient::new(provider);
        client.batch_index(&repos(3), 10).await.unwrap();

        let ctx = SearchContext::new().deadline_at(tokio::time::Instant::now());
        let result = client.search(&ctx, &SearchQuery::new("starred")).await;

        match result {
            Err(e) => assert!(e.is_cancelled()),
            Ok(response) => panic!("expected cancellation, got {} hits", response.hits.len()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_query_is_aborted_at_deadline() {
        let provider = Arc::new(MockProvider {
            search_delay: Some(Duration::from_secs(30)),
            ..Default::default()
        });
        let client = SearchIndexClient::new(provider);

        let ctx = SearchContext::with_timeout(Duration::from_secs(1));
        let result = client.search(&ctx, &SearchQuery::new("slow")).await;

        assert!(matches!(result, Err(SearchIndexError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let client = SearchIndexClient::new(Arc::new(MockProvider::default()));
        let ctx = SearchContext::new();
        ctx.cancel();

        let result = client.search(&ctx, &SearchQuery::new("anything")).await;

        assert!(matches!(result, Err(SearchIndexError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_blank_query_is_client_error() {
        let client = SearchIndexClient::new(Arc::new(MockProvider::default()));

        let result = client.search(&SearchContext::new(), &SearchQuery::new("  ")).await;

        assert!(result.unwrap_err().is_client_error());
    }

    #[tokio::test]
    async fn test_result_window_is_enforced() {
        let client = SearchIndexClient::with_config(
            Arc::new(MockProvider::default()),
            SearchIndexConfig::default().max_result_window(100),
        );

        let deep = SearchQuery::new("tokio").with_from(95).with_size(10);
        let result = client.search(&SearchContext::new(), &deep).await;
        assert!(result.unwrap_err().is_client_error());

        let edge = SearchQuery::new("tokio").with_from(90).with_size(10);
        assert!(client.search(&SearchContext::new(), &edge).await.is_ok());
    }
}
