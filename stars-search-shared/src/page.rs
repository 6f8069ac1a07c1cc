//! Pagination and rate limit metadata returned with every page of stars.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::repository::StarredRepository;

/// Units of remote budget kept in reserve. Fetching stops once
/// `remaining <= used + RATE_LIMIT_SAFETY_MARGIN`.
pub const RATE_LIMIT_SAFETY_MARGIN: i64 = 10;

/// Remote rate limit snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Cost of the request that produced this snapshot.
    #[serde(default)]
    pub cost: i64,
    pub limit: i64,
    pub remaining: i64,
    pub used: i64,
    /// When the budget is replenished.
    pub reset_at: DateTime<Utc>,
}

impl RateLimit {
    /// Whether the remaining budget has dropped into the safety margin.
    pub fn is_nearly_exhausted(&self, margin: i64) -> bool {
        self.remaining <= self.used.saturating_add(margin)
    }

    /// Time left until the budget resets, zero if `reset_at` has passed.
    pub fn wait_until_reset(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Position information for cursor-based pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub start_cursor: Option<String>,
    #[serde(default)]
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
}

/// One page of starred repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Records in edge order.
    pub records: Vec<StarredRepository>,
    pub page_info: PageInfo,
    /// `None` when the remote did not report its budget.
    pub rate_limit: Option<RateLimit>,
    /// Total number of starred repositories reported by the remote.
    pub total_count: Option<u64>,
}

impl Page {
    /// The cursor to request the following page with.
    pub fn next_cursor(&self) -> &str {
        self.page_info.end_cursor.as_deref().unwrap_or_default()
    }
}
