//! # Stars Search Repository
//!
//! This crate provides the traits and implementations for interacting with
//! the search index. It includes definitions for errors, the storage
//! interface, a concrete implementation backed by tantivy, and the
//! [`SearchIndexClient`] used by the pipeline (batch indexing) and the HTTP
//! layer (querying).

pub mod client;
pub mod config;
pub mod context;
pub mod errors;
pub mod interfaces;
pub mod tantivy_index;
pub mod types;

pub use client::SearchIndexClient;
pub use config::{SearchIndexConfig, DEFAULT_MAX_RESULT_WINDOW};
pub use context::SearchContext;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use tantivy_index::{Analyzer, FieldMapping, IndexSchema, TantivyProvider};
pub use types::{BatchIndexSummary, IndexBatch, IndexOperation};
