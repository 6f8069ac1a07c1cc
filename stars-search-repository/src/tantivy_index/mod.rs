//! Tantivy implementation of the index storage.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using an embedded tantivy index stored on disk (or in RAM for tests).

mod client;
mod documents;
mod index_config;

pub use client::TantivyProvider;
pub use index_config::{Analyzer, FieldMapping, IndexSchema};
