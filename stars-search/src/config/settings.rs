//! Settings read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::AppError;
use stars_search_pipeline::fetcher::{GRAPHQL_ENDPOINT, MAX_PAGE_SIZE};

/// Default directory of the on-disk index.
const DEFAULT_INDEX_STORAGE_PATH: &str = "ghs.index";

/// Default IANA timezone of the refresh schedule.
const DEFAULT_LOCATION: &str = "Europe/Paris";

/// Default refresh schedule: twice a day.
const DEFAULT_REFRESH_JOB_SCHEDULE: &str = "0 */12 * * *";

/// Default HTTP listen port.
const DEFAULT_PORT: u16 = 8080;

/// Default per-request search deadline, in seconds.
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 60;

/// Default number of documents per index submission.
const DEFAULT_INDEXING_BATCH_SIZE: usize = 100;

/// Default retry bound for a failing page.
const DEFAULT_FETCH_MAX_RETRIES: u32 = 5;

/// Value of `FETCH_MAX_RETRIES` that retries a failing page forever.
const UNBOUNDED_RETRIES: &str = "unbounded";

/// Settings of the process.
///
/// Empty variables are treated as unset.
#[derive(Clone)]
pub struct Settings {
    pub github_token: String,
    pub github_endpoint: String,
    pub index_path: PathBuf,
    pub location: String,
    pub refresh_schedule: String,
    /// Whether to index once at startup.
    pub initial_index: bool,
    pub port: u16,
    pub search_timeout: Duration,
    pub indexing_batch_size: usize,
    pub fetch_page_size: u32,
    /// `None` retries a failing page forever.
    pub fetch_max_retries: Option<u32>,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GITHUB_TOKEN`, then `GH_TOKEN`: GitHub API token (required)
    /// - `GITHUB_GRAPHQL_ENDPOINT`, then `GH_GRAPHQL_ENDPOINT`: GraphQL endpoint
    /// - `INDEX_STORAGE_PATH`: index directory (default: ghs.index)
    /// - `LOCATION`: schedule timezone (default: Europe/Paris)
    /// - `REFRESH_JOB_SCHEDULE`: cron expression (default: 0 */12 * * *)
    /// - `NO_INITIAL_INDEX`: any value disables the startup run
    /// - `PORT`: HTTP port (default: 8080)
    /// - `SEARCH_TIMEOUT_SECS`: search deadline (default: 60)
    /// - `INDEXING_BATCH_SIZE`: documents per batch (default: 100)
    /// - `FETCH_PAGE_SIZE`: records per page, at most 100 (default: 100)
    /// - `FETCH_MAX_RETRIES`: retries per page or `unbounded` (default: 5)
    ///
    /// `LOG_FORMAT` is read by [`LogFormat::from_env`](crate::logging::LogFormat::from_env)
    /// before settings so configuration errors are logged.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|key| get(*key));

        let github_token = first(&["GITHUB_TOKEN", "GH_TOKEN"])
            .ok_or_else(|| AppError::config("missing GitHub API token"))?;
        let github_endpoint = first(&["GITHUB_GRAPHQL_ENDPOINT", "GH_GRAPHQL_ENDPOINT"])
            .unwrap_or_else(|| GRAPHQL_ENDPOINT.to_string());

        let indexing_batch_size = parse_or(
            "INDEXING_BATCH_SIZE",
            get("INDEXING_BATCH_SIZE"),
            DEFAULT_INDEXING_BATCH_SIZE,
        )?;
        if indexing_batch_size == 0 {
            return Err(AppError::config("INDEXING_BATCH_SIZE must be positive"));
        }

        let fetch_page_size = parse_or("FETCH_PAGE_SIZE", get("FETCH_PAGE_SIZE"), MAX_PAGE_SIZE)?;
        if fetch_page_size == 0 || fetch_page_size > MAX_PAGE_SIZE {
            return Err(AppError::config(format!(
                "FETCH_PAGE_SIZE must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let fetch_max_retries = match get("FETCH_MAX_RETRIES") {
            Some(v) if v.trim().eq_ignore_ascii_case(UNBOUNDED_RETRIES) => None,
            value => Some(parse_or(
                "FETCH_MAX_RETRIES",
                value,
                DEFAULT_FETCH_MAX_RETRIES,
            )?),
        };

        Ok(Self {
            github_token,
            github_endpoint,
            index_path: PathBuf::from(
                get("INDEX_STORAGE_PATH").unwrap_or_else(|| DEFAULT_INDEX_STORAGE_PATH.to_string()),
            ),
            location: get("LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            refresh_schedule: get("REFRESH_JOB_SCHEDULE")
                .unwrap_or_else(|| DEFAULT_REFRESH_JOB_SCHEDULE.to_string()),
            initial_index: get("NO_INITIAL_INDEX").is_none(),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            search_timeout: Duration::from_secs(parse_or(
                "SEARCH_TIMEOUT_SECS",
                get("SEARCH_TIMEOUT_SECS"),
                DEFAULT_SEARCH_TIMEOUT_SECS,
            )?),
            indexing_batch_size,
            fetch_page_size,
            fetch_max_retries,
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("invalid {} {:?}: {}", key, v, e))),
        None => Ok(default),
    }
}
