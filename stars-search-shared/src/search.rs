//! Search request and response types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of hits returned when the caller does not ask for a size.
pub const DEFAULT_SEARCH_SIZE: usize = 10;

/// A free-text query with offset/limit pagination and field projection.
///
/// The query string is interpreted by the index storage's own grammar
/// (boolean operators, `field:term` qualifiers, `"phrases"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub from: usize,
    pub size: usize,
    /// Stored fields to return per hit. Empty means every stored field.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            from: 0,
            size: DEFAULT_SEARCH_SIZE,
            fields: Vec::new(),
        }
    }

    /// Skip the first `from` ranked hits.
    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    /// Return at most `size` hits.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Restrict the returned fields.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the query text is blank.
    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }
}

/// A single ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    /// Projected stored fields of the document.
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Result of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub from: usize,
    pub size: usize,
    /// Number of documents matching the query, regardless of pagination.
    pub total_hits: usize,
    pub max_score: f32,
    /// Query execution time in milliseconds.
    pub took_ms: u64,
    pub hits: Vec<SearchHit>,
}

impl SearchResponse {
    /// Create an empty response for the given query.
    pub fn empty(query: &SearchQuery) -> Self {
        Self {
            query: query.query.clone(),
            from: query.from,
            size: query.size,
            total_hits: 0,
            max_score: 0.0,
            took_ms: 0,
            hits: Vec::new(),
        }
    }
}
