//! # Stars Search Shared
//!
//! Types shared by the fetcher, the indexing pipeline and the query layer:
//! the starred repository records harvested from GitHub, the page and rate
//! limit metadata that drive pagination, and the search request/response
//! shapes served over HTTP.

mod indexable;
mod page;
mod repository;
mod search;

pub use indexable::Indexable;
pub use page::{Page, PageInfo, RateLimit, RATE_LIMIT_SAFETY_MARGIN};
pub use repository::{PrimaryLanguage, Repository, StarredRepository};
pub use search::{SearchHit, SearchQuery, SearchResponse, DEFAULT_SEARCH_SIZE};
