//! Limits applied by [`SearchIndexClient`](crate::SearchIndexClient).

/// Deepest hit (`from + size`) a query may page to unless configured otherwise.
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

/// Limits for indexing and querying.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Maximum number of documents in one submission. `None`, the default,
    /// accepts any positive batch size.
    pub max_batch_size: Option<usize>,
    /// Maximum `from + size` of a query. Top-k collection allocates for the
    /// whole window, so deep pages are rejected instead of collected.
    pub max_result_window: usize,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            max_result_window: DEFAULT_MAX_RESULT_WINDOW,
        }
    }
}

impl SearchIndexConfig {
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Self::default()
        }
    }

    pub fn max_result_window(mut self, window: usize) -> Self {
        self.max_result_window = window;
        self
    }
}
