//! Streaming page walk over the starred repositories of the viewer.

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::fetcher::github_client::MAX_PAGE_SIZE;
use crate::fetcher::retry::RetryPolicy;
use crate::fetcher::source::StarsSource;
use stars_search_shared::{Page, StarredRepository, RATE_LIMIT_SAFETY_MARGIN};

/// Configuration for the stars fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Records requested per page.
    pub page_size: u32,
    /// Budget units kept in reserve before stopping a run.
    pub rate_limit_margin: i64,
    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            rate_limit_margin: RATE_LIMIT_SAFETY_MARGIN,
            retry: RetryPolicy::default(),
        }
    }
}

/// Why a fetch run stopped emitting records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The remote reported no further page.
    Exhausted,
    /// The remote budget dropped into the safety margin.
    RateLimited {
        reset_at: DateTime<Utc>,
        wait: Duration,
    },
    /// A page kept failing after every allowed retry.
    RetriesExhausted { cursor: String, error: String },
    /// The stream was dropped before the walk finished.
    ConsumerGone,
}

/// What a fetch run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    /// Pages successfully fetched.
    pub pages: usize,
    /// Records handed to the consumer.
    pub records: usize,
    pub stop: StopReason,
}

/// Walks the stars of the viewer and streams them one record at a time.
///
/// Each call to [`fetch`](Self::fetch) starts an independent walk from the
/// first page on its own task.
#[derive(Clone)]
pub struct StarsFetcher {
    source: Arc<dyn StarsSource>,
    config: FetcherConfig,
}

impl StarsFetcher {
    /// Create a new fetcher with default configuration.
    pub fn new(source: Arc<dyn StarsSource>) -> Self {
        Self {
            source,
            config: FetcherConfig::default(),
        }
    }

    /// Create a new fetcher with custom configuration.
    pub fn with_config(source: Arc<dyn StarsSource>, config: FetcherConfig) -> Self {
        Self { source, config }
    }

    /// Start walking from the first page.
    ///
    /// The returned stream yields records in page order, then edge order
    /// within a page. It never yields errors: failures end the stream and
    /// are reported by [`StarsStream::finish`].
    ///
    /// Must be called within a tokio runtime.
    pub fn fetch(&self) -> StarsStream {
        self.fetch_from("")
    }

    /// Start walking from `cursor`.
    pub fn fetch_from(&self, cursor: impl Into<String>) -> StarsStream {
        // capacity 1: the walk stays at most one record ahead of the consumer
        let (tx, rx) = mpsc::channel(1);
        let walk = PageWalk {
            source: self.source.clone(),
            config: self.config.clone(),
            tx,
        };
        let handle = tokio::spawn(walk.run(cursor.into()));

        StarsStream {
            records: ReceiverStream::new(rx),
            handle,
        }
    }
}

/// A single-pass stream of starred repositories.
///
/// Dropping the stream stops the walk at its next handoff.
pub struct StarsStream {
    records: ReceiverStream<StarredRepository>,
    handle: JoinHandle<FetchSummary>,
}

impl StarsStream {
    /// Stop consuming and wait for the walk to report how it ended.
    ///
    /// Records not yet received are discarded.
    pub async fn finish(self) -> Result<FetchSummary, PipelineError> {
        drop(self.records);
        self.handle
            .await
            .map_err(|e| PipelineError::task(format!("fetch task failed: {}", e)))
    }

    /// Receive every record, then return them with the run summary.
    pub async fn drain(mut self) -> Result<(Vec<StarredRepository>, FetchSummary), PipelineError> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await {
            records.push(record);
        }
        let summary = self.finish().await?;
        Ok((records, summary))
    }
}

impl Stream for StarsStream {
    type Item = StarredRepository;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.records).poll_next(cx)
    }
}

/// The producer side of a fetch run.
struct PageWalk {
    source: Arc<dyn StarsSource>,
    config: FetcherConfig,
    tx: mpsc::Sender<StarredRepository>,
}

impl PageWalk {
    #[instrument(skip(self), fields(component = "github"))]
    async fn run(self, mut cursor: String) -> FetchSummary {
        let mut pages = 0;
        let mut records = 0;

        let stop = loop {
            let page = match self.fetch_with_retry(&cursor).await {
                Ok(page) => page,
                Err(stop) => break stop,
            };
            pages += 1;

            let has_next_page = page.page_info.has_next_page;
            let next_cursor = page.next_cursor().to_string();
            let rate_limit = page.rate_limit.clone();
            debug!(
                page = pages,
                count = page.records.len(),
                has_next_page = has_next_page,
                "Fetched page"
            );

            if !self.emit(page, &mut records).await {
                break StopReason::ConsumerGone;
            }

            if !has_next_page {
                break StopReason::Exhausted;
            }

            if let Some(rate_limit) = rate_limit {
                if rate_limit.is_nearly_exhausted(self.config.rate_limit_margin) {
                    let wait = rate_limit.wait_until_reset(Utc::now());
                    warn!(
                        remaining = rate_limit.remaining,
                        used = rate_limit.used,
                        limit = rate_limit.limit,
                        reset_at = %rate_limit.reset_at,
                        wait_secs = wait.as_secs(),
                        "Rate limit reached, stopping until the next run"
                    );
                    break StopReason::RateLimited {
                        reset_at: rate_limit.reset_at,
                        wait,
                    };
                }
            }

            if next_cursor.is_empty() {
                warn!("Page announces more results without an end cursor");
                break StopReason::Exhausted;
            }
            cursor = next_cursor;
        };

        info!(pages = pages, records = records, stop = ?stop, "Fetch finished");
        FetchSummary {
            pages,
            records,
            stop,
        }
    }

    /// Hand every record of `page` to the consumer, counting deliveries.
    /// Returns false once the consumer is gone.
    async fn emit(&self, page: Page, delivered: &mut usize) -> bool {
        for record in page.records {
            if self.tx.send(record).await.is_err() {
                return false;
            }
            *delivered += 1;
        }
        true
    }

    /// Fetch the page after `cursor`, retrying on failure as the policy allows.
    async fn fetch_with_retry(&self, cursor: &str) -> Result<Page, StopReason> {
        let policy = &self.config.retry;
        let mut failures: u32 = 0;

        loop {
            match self.source.fetch_page(cursor, self.config.page_size).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    failures = failures.saturating_add(1);
                    error!(error = %e, cursor = %cursor, failures = failures, "Failed to fetch page");

                    if !policy.should_retry(failures) {
                        return Err(StopReason::RetriesExhausted {
                            cursor: cursor.to_string(),
                            error: e.to_string(),
                        });
                    }

                    tokio::select! {
                        _ = self.tx.closed() => return Err(StopReason::ConsumerGone),
                        _ = tokio::time::sleep(policy.backoff(failures)) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use stars_search_shared::{PageInfo, RateLimit, Repository};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock source replaying scripted responses and recording requested cursors.
    #[derive(Default)]
    struct MockSource {
        responses: Mutex<VecDeque<Result<Page, PipelineError>>>,
        cursors: Mutex<Vec<String>>,
        calls: AtomicUsize,
        fail_forever: bool,
    }

    impl MockSource {
        fn scripted(responses: Vec<Result<Page, PipelineError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail_forever: true,
                ..Default::default()
            }
        }

        fn cursors(&self) -> Vec<String> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StarsSource for MockSource {
        async fn fetch_page(&self, cursor: &str, _page_size: u32) -> Result<Page, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cursors.lock().unwrap().push(cursor.to_string());
            if self.fail_forever {
                return Err(PipelineError::transport("connection reset"));
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PipelineError::transport("no scripted response")))
        }
    }

    fn record(id: &str) -> StarredRepository {
        StarredRepository::new(
            Repository::new(id, format!("owner/{}", id), format!("https://github.com/owner/{}", id)),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn rate_limit(remaining: i64, used: i64) -> RateLimit {
        RateLimit {
            cost: 1,
            limit: 5000,
            remaining,
            used,
            reset_at: Utc::now() + chrono::Duration::minutes(30),
        }
    }

    fn page(ids: &[&str], end_cursor: &str, has_next_page: bool, rate_limit: Option<RateLimit>) -> Page {
        Page {
            records: ids.iter().map(|id| record(id)).collect(),
            page_info: PageInfo {
                start_cursor: None,
                end_cursor: Some(end_cursor.to_string()),
                has_next_page,
                has_previous_page: false,
            },
            rate_limit,
            total_count: None,
        }
    }

    fn healthy() -> Option<RateLimit> {
        Some(rate_limit(4000, 100))
    }

    fn ids(records: &[StarredRepository]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    fn fast_retries(max: Option<u32>) -> FetcherConfig {
        FetcherConfig {
            retry: RetryPolicy {
                max_retries: max,
                initial_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(100),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pages_are_concatenated_in_order() {
        let source = Arc::new(MockSource::scripted(vec![
            Ok(page(&["R_1", "R_2"], "c1", true, healthy())),
            Ok(page(&["R_3"], "c2", true, healthy())),
            Ok(page(&["R_4", "R_5"], "c3", false, healthy())),
        ]));
        let fetcher = StarsFetcher::new(source.clone());

        let (records, summary) = fetcher.fetch().drain().await.unwrap();

        assert_eq!(ids(&records), vec!["R_1", "R_2", "R_3", "R_4", "R_5"]);
        assert_eq!(source.cursors(), vec!["", "c1", "c2"]);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.records, 5);
        assert_eq!(summary.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_missing_end_cursor_ends_fetch() {
        let mut without_cursor = page(&["R_1", "R_2"], "", true, healthy());
        without_cursor.page_info.end_cursor = None;
        let source = Arc::new(MockSource::scripted(vec![
            Ok(without_cursor),
            Ok(page(&["R_3"], "c2", false, healthy())),
        ]));
        let fetcher = StarsFetcher::new(source.clone());

        let (records, summary) = fetcher.fetch().drain().await.unwrap();

        assert_eq!(ids(&records), vec!["R_1", "R_2"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_rate_limit_stops_after_emitting_page() {
        let source = Arc::new(MockSource::scripted(vec![
            Ok(page(&["R_1"], "c1", true, healthy())),
            Ok(page(&["R_2", "R_3"], "c2", true, Some(rate_limit(110, 100)))),
            Ok(page(&["R_4"], "c3", false, healthy())),
        ]));
        let fetcher = StarsFetcher::new(source.clone());

        let (records, summary) = fetcher.fetch().drain().await.unwrap();

        assert_eq!(ids(&records), vec!["R_1", "R_2", "R_3"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        match summary.stop {
            StopReason::RateLimited { wait, .. } => assert!(wait > Duration::from_secs(60)),
            other => panic!("expected rate limited stop, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_rate_limit_does_not_stop() {
        let source = Arc::new(MockSource::scripted(vec![
            Ok(page(&["R_1"], "c1", true, None)),
            Ok(page(&["R_2"], "c2", false, None)),
        ]));

        let (records, summary) = StarsFetcher::new(source).fetch().drain().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(summary.stop, StopReason::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_page_is_retried_on_same_cursor() {
        let source = Arc::new(MockSource::scripted(vec![
            Ok(page(&["R_1"], "c1", true, healthy())),
            Err(PipelineError::transport("timeout")),
            Err(PipelineError::graphql("something went wrong")),
            Ok(page(&["R_2"], "c2", false, healthy())),
        ]));
        let fetcher = StarsFetcher::with_config(source.clone(), fast_retries(Some(5)));

        let (records, summary) = fetcher.fetch().drain().await.unwrap();

        assert_eq!(ids(&records), vec!["R_1", "R_2"]);
        assert_eq!(source.cursors(), vec!["", "c1", "c1", "c1"]);
        assert_eq!(summary.stop, StopReason::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_ends_stream_cleanly() {
        let source = Arc::new(MockSource::failing());
        let fetcher = StarsFetcher::with_config(source.clone(), fast_retries(Some(3)));

        let (records, summary) = fetcher.fetch().drain().await.unwrap();

        assert!(records.is_empty());
        // first attempt plus three retries
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        assert!(matches!(
            summary.stop,
            StopReason::RetriesExhausted { ref cursor, .. } if cursor.is_empty()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_policy_keeps_retrying() {
        let mut responses: Vec<Result<Page, PipelineError>> = (0..25)
            .map(|_| Err(PipelineError::transport("connection refused")))
            .collect();
        responses.push(Ok(page(&["R_1"], "c1", false, healthy())));
        let source = Arc::new(MockSource::scripted(responses));
        let config = FetcherConfig {
            retry: RetryPolicy::unbounded(),
            ..Default::default()
        };

        let (records, summary) = StarsFetcher::with_config(source.clone(), config)
            .fetch()
            .drain()
            .await
            .unwrap();

        assert_eq!(ids(&records), vec!["R_1"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 26);
        assert_eq!(summary.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_producer_waits_for_consumer() {
        let source = Arc::new(MockSource::scripted(vec![
            Ok(page(&["R_1", "R_2", "R_3", "R_4"], "c1", true, healthy())),
            Ok(page(&["R_5"], "c2", false, healthy())),
        ]));
        let mut stream = StarsFetcher::new(source.clone()).fetch();

        let first = stream.next().await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(first.id(), "R_1");
        // the walk is blocked on the first page handoff
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let summary = stream.finish().await.unwrap();
        assert_eq!(summary.stop, StopReason::ConsumerGone);
        assert_eq!(summary.pages, 1);
    }
}
