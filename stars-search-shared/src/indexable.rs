//! The contract between the pipeline and the index storage.

use serde::Serialize;

/// A value that can be stored in the search index.
///
/// The document body is whatever `Serialize` produces; the index storage
/// decides which of its fields are analyzed or stored. `document_id` is the
/// upsert key: indexing a second value with the same id replaces the first.
pub trait Indexable: Serialize + Send + Sync {
    /// Stable identifier of the document.
    fn document_id(&self) -> &str;
}

impl<T: Indexable + ?Sized> Indexable for &T {
    fn document_id(&self) -> &str {
        (**self).document_id()
    }
}
