//! Source of pages of starred repositories.

use async_trait::async_trait;

use crate::errors::PipelineError;
use stars_search_shared::Page;

/// A paginated remote listing of starred repositories.
///
/// Implementations perform one round-trip per call and keep no pagination
/// state: the caller owns the cursor.
#[async_trait]
pub trait StarsSource: Send + Sync {
    /// Fetch the page that starts after `cursor`.
    ///
    /// # Arguments
    ///
    /// * `cursor` - Opaque continuation token; empty requests the first page
    /// * `page_size` - Maximum number of records in the page
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - The records of the page with their README resolved
    /// * `Err(PipelineError)` - Transport, protocol or decoding failure
    async fn fetch_page(&self, cursor: &str, page_size: u32) -> Result<Page, PipelineError>;
}
