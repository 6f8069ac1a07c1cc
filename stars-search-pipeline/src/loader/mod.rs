//! Loader module for the stars search pipeline.
//!
//! Loads fetched records into the search index.

use tracing::{error, info, instrument};

use crate::errors::PipelineError;
use stars_search_repository::{BatchIndexSummary, SearchIndexClient};
use stars_search_shared::Indexable;

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of documents submitted to the index per batch.
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

/// Loader that indexes records into the search index.
///
/// A load is not atomic as a whole: batches committed before a failure stay
/// searchable.
#[derive(Clone)]
pub struct SearchLoader {
    client: SearchIndexClient,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(client: SearchIndexClient) -> Self {
        Self {
            client,
            config: LoaderConfig::default(),
        }
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(client: SearchIndexClient, config: LoaderConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Index every record, `batch_size` records per submission.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn load<T: Indexable>(&self, records: &[T]) -> Result<BatchIndexSummary, PipelineError> {
        match self.client.batch_index(records, self.config.batch_size).await {
            Ok(summary) => {
                info!(
                    documents = summary.documents,
                    batches = summary.batches,
                    "Loaded records into search index"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, count = records.len(), "Failed to load records");
                Err(e.into())
            }
        }
    }

    /// Number of searchable documents.
    pub async fn document_count(&self) -> Result<u64, PipelineError> {
        Ok(self.client.document_count().await?)
    }
}
