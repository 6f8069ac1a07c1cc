//! Batch types exchanged with the index storage.

use serde_json::Value;

use crate::errors::SearchIndexError;
use stars_search_shared::Indexable;

/// A single document queued for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOperation {
    /// The upsert key.
    pub id: String,
    /// The serialized document body.
    pub document: Value,
}

/// An accumulator of documents submitted to the index storage in one call.
///
/// A batch is applied atomically by the storage: either every document is
/// visible after submission or none is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBatch {
    operations: Vec<IndexOperation>,
}

impl IndexBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty batch with room for `capacity` documents.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            operations: Vec::with_capacity(capacity),
        }
    }

    /// Create a batch from already serialized documents.
    pub fn from_operations(operations: Vec<IndexOperation>) -> Self {
        Self { operations }
    }

    /// Serialize a document and queue it under its id.
    pub fn add<T: Indexable + ?Sized>(&mut self, document: &T) -> Result<(), SearchIndexError> {
        let id = document.document_id();
        if id.is_empty() {
            return Err(SearchIndexError::validation("document id must not be empty"));
        }

        let body = serde_json::to_value(document).map_err(|e| {
            SearchIndexError::serialization(format!("failed to serialize document {}: {}", id, e))
        })?;

        self.operations.push(IndexOperation {
            id: id.to_string(),
            document: body,
        });
        Ok(())
    }

    /// Number of queued documents.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no document is queued.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Queued documents in insertion order.
    pub fn operations(&self) -> &[IndexOperation] {
        &self.operations
    }

    /// Consume the batch.
    pub fn into_operations(self) -> Vec<IndexOperation> {
        self.operations
    }
}

/// Outcome of a successful batch indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchIndexSummary {
    /// Documents submitted across all batches.
    pub documents: usize,
    /// Number of submission calls made to the storage.
    pub batches: usize,
}
