//! Tantivy provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! on top of an embedded tantivy index.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::QueryParser;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::tantivy_index::index_config::{IndexSchema, ResolvedSchema};
use crate::types::IndexBatch;
use stars_search_shared::{SearchHit, SearchQuery, SearchResponse};

/// Memory budget of the single indexing thread.
const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// Tantivy-backed index storage.
///
/// A single writer is shared behind a mutex, so concurrent batch submissions
/// are applied one after the other. The reader is reloaded after every
/// commit, so a search sees either all or none of a batch.
///
/// # Example
///
/// ```ignore
/// let provider = TantivyProvider::open("ghs.index", IndexSchema::repository())?;
/// let client = SearchIndexClient::new(Arc::new(provider));
/// ```
#[derive(Clone)]
pub struct TantivyProvider {
    index: Index,
    reader: IndexReader,
    writer: Arc<Mutex<IndexWriter>>,
    schema: Arc<ResolvedSchema>,
    /// Set when a commit succeeded but the reader could not be reloaded.
    stale_reader: Arc<AtomicBool>,
}

impl TantivyProvider {
    /// Open the index stored in `path`, creating it with `mapping` if the
    /// directory holds no index yet.
    ///
    /// # Returns
    ///
    /// * `Ok(TantivyProvider)` - A provider ready for indexing and searching
    /// * `Err(SearchIndexError::OpenError)` - If the directory cannot be used or
    ///   the existing index was created with a different schema
    pub fn open(path: impl AsRef<Path>, mapping: IndexSchema) -> Result<Self, SearchIndexError> {
        let path = path.as_ref();
        let resolved = mapping.build()?;

        std::fs::create_dir_all(path).map_err(|e| {
            SearchIndexError::open(format!("failed to create {}: {}", path.display(), e))
        })?;
        let directory = MmapDirectory::open(path).map_err(|e| {
            SearchIndexError::open(format!("failed to open {}: {}", path.display(), e))
        })?;
        let index = Index::open_or_create(directory, resolved.schema.clone())
            .map_err(|e| SearchIndexError::open(format!("failed to open index: {}", e)))?;

        info!(path = %path.display(), "Opened search index");
        Self::from_index(index, resolved)
    }

    /// Create an index held entirely in memory.
    pub fn in_memory(mapping: IndexSchema) -> Result<Self, SearchIndexError> {
        let resolved = mapping.build()?;
        let index = Index::create_in_ram(resolved.schema.clone());
        Self::from_index(index, resolved)
    }

    fn from_index(index: Index, schema: ResolvedSchema) -> Result<Self, SearchIndexError> {
        let writer: IndexWriter = index
            .writer_with_num_threads(1, WRITER_MEMORY_BUDGET)
            .map_err(|e| SearchIndexError::open(format!("failed to create index writer: {}", e)))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchIndexError::open(format!("failed to create index reader: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(Mutex::new(writer)),
            schema: Arc::new(schema),
            stale_reader: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Apply a batch on the calling thread.
    fn apply_batch(&self, batch: IndexBatch) -> Result<(), SearchIndexError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SearchIndexError::submit("index writer lock poisoned"))?;

        for operation in batch.operations() {
            let document = match self.schema.to_document(&operation.id, &operation.document) {
                Ok(document) => document,
                Err(e) => {
                    discard_pending(&mut writer);
                    return Err(e);
                }
            };

            // delete-then-add gives upsert semantics within and across batches
            writer.delete_term(Term::from_field_text(self.schema.id, &operation.id));
            if let Err(e) = writer.add_document(document) {
                discard_pending(&mut writer);
                return Err(SearchIndexError::index(format!(
                    "failed to index document {}: {}",
                    operation.id, e
                )));
            }
        }

        if let Err(e) = writer.commit() {
            discard_pending(&mut writer);
            return Err(SearchIndexError::submit(format!("failed to commit batch: {}", e)));
        }
        drop(writer);

        // the batch is durable at this point, whatever the reload outcome
        self.refresh_reader(self.reader.reload());
        Ok(())
    }

    /// Record the outcome of a reader reload. After a failure searches keep
    /// the previous commit until a later reload succeeds.
    fn refresh_reader(&self, reload: tantivy::Result<()>) {
        match reload {
            Ok(()) => self.stale_reader.store(false, Ordering::Release),
            Err(e) => {
                warn!(error = %e, "Batch committed but the index reader was not reloaded");
                self.stale_reader.store(true, Ordering::Release);
            }
        }
    }

    /// Retry a reload that failed after an earlier commit.
    fn catch_up_reader(&self) {
        if self.stale_reader.load(Ordering::Acquire) {
            self.refresh_reader(self.reader.reload());
        }
    }

    /// Run a query on the calling thread.
    fn execute(&self, query: &SearchQuery) -> Result<SearchResponse, SearchIndexError> {
        let started = Instant::now();
        self.catch_up_reader();
        let searcher = self.reader.searcher();

        let parser = QueryParser::for_index(&self.index, self.schema.searchable.clone());
        let parsed = parser
            .parse_query(&query.query)
            .map_err(|e| SearchIndexError::invalid_query(e.to_string()))?;

        let (top_docs, total_hits) = if query.size == 0 {
            let total = searcher
                .search(&parsed, &Count)
                .map_err(|e| SearchIndexError::query(e.to_string()))?;
            (Vec::new(), total)
        } else {
            let collector = (
                TopDocs::with_limit(query.size).and_offset(query.from),
                Count,
            );
            searcher
                .search(&parsed, &collector)
                .map_err(|e| SearchIndexError::query(e.to_string()))?
        };

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let document: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| SearchIndexError::query(format!("failed to load document: {}", e)))?;
            let id = self.schema.document_id(&document).unwrap_or_default();
            hits.push(SearchHit {
                id,
                score,
                fields: self.schema.project(&document, &query.fields),
            });
        }

        Ok(SearchResponse {
            query: query.query.clone(),
            from: query.from,
            size: query.size,
            total_hits,
            max_score: hits.first().map(|hit| hit.score).unwrap_or(0.0),
            took_ms: started.elapsed().as_millis() as u64,
            hits,
        })
    }
}

/// Drop every uncommitted operation of the writer.
fn discard_pending(writer: &mut IndexWriter) {
    if let Err(e) = writer.rollback() {
        error!(error = %e, "Failed to roll back index writer");
    }
}

#[async_trait]
impl SearchIndexProvider for TantivyProvider {
    #[instrument(skip(self, batch), fields(count = batch.len()))]
    async fn submit_batch(&self, batch: IndexBatch) -> Result<(), SearchIndexError> {
        let provider = self.clone();
        tokio::task::spawn_blocking(move || provider.apply_batch(batch))
            .await
            .map_err(|e| SearchIndexError::submit(format!("indexing task failed: {}", e)))??;

        debug!("Batch committed");
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchIndexError> {
        let provider = self.clone();
        let query = query.clone();
        tokio::task::spawn_blocking(move || provider.execute(&query))
            .await
            .map_err(|e| SearchIndexError::query(format!("search task failed: {}", e)))?
    }

    async fn document_count(&self) -> Result<u64, SearchIndexError> {
        self.catch_up_reader();
        Ok(self.reader.searcher().num_docs())
    }
}
