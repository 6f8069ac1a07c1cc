//! Orchestrator module for the stars search pipeline.
//!
//! Coordinates the fetcher and the loader, one run at a time.

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use crate::fetcher::{FetchSummary, StarsFetcher};
use crate::loader::SearchLoader;
use crate::scheduler::Schedule;
use stars_search_repository::BatchIndexSummary;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Run once as soon as [`Orchestrator::run`] starts, before the first
    /// scheduled trigger.
    pub run_on_start: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { run_on_start: true }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub fetch: FetchSummary,
    pub indexed: BatchIndexSummary,
    pub elapsed: Duration,
}

/// Result of a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Another run was in progress; nothing was done.
    Skipped,
}

/// Orchestrator that drives ingestion runs.
///
/// A run drains the whole fetch stream into memory, then indexes it in
/// batches. At most one run is in progress at a time: a trigger arriving
/// during a run is skipped, not queued.
pub struct Orchestrator {
    fetcher: StarsFetcher,
    loader: SearchLoader,
    schedule: Schedule,
    config: OrchestratorConfig,
    run_lock: Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(fetcher: StarsFetcher, loader: SearchLoader, schedule: Schedule) -> Self {
        Self::with_config(fetcher, loader, schedule, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        fetcher: StarsFetcher,
        loader: SearchLoader,
        schedule: Schedule,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            fetcher,
            loader,
            schedule,
            config,
            run_lock: Mutex::new(()),
            shutdown_tx,
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Fetch every starred repository and index it.
    ///
    /// # Returns
    ///
    /// * `Ok(RunOutcome::Completed)` - The run finished; the report tells how
    ///   the fetch stopped and how much was indexed
    /// * `Ok(RunOutcome::Skipped)` - Another run holds the lock
    /// * `Err(PipelineError)` - Indexing failed; batches committed before the
    ///   failure stay in the index
    #[instrument(skip(self), fields(component = "pipeline"))]
    pub async fn run_once(&self) -> Result<RunOutcome, PipelineError> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("A run is already in progress, skipping trigger");
            return Ok(RunOutcome::Skipped);
        };

        let started = Instant::now();
        info!("Fetching stars");
        let (records, fetch) = self.fetcher.fetch().drain().await?;

        debug!(count = records.len(), "Indexing stars");
        let indexed = self.loader.load(&records).await?;

        let report = RunReport {
            fetch,
            indexed,
            elapsed: started.elapsed(),
        };
        info!(
            pages = report.fetch.pages,
            documents = report.indexed.documents,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Run completed"
        );
        Ok(RunOutcome::Completed(report))
    }

    /// Run on start if configured, then on every scheduled trigger until
    /// [`shutdown`](Self::shutdown) is called.
    ///
    /// Run failures are logged and do not stop the loop. A run in progress
    /// when shutdown is requested is abandoned.
    #[instrument(skip(self), fields(component = "scheduler", schedule = %self.schedule.expression()))]
    pub async fn run(&self) -> Result<(), PipelineError> {
        let mut shutdown = self.shutdown_tx.subscribe();
        info!(timezone = %self.schedule.timezone(), "Starting scheduler");

        if self.config.run_on_start && !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => {}
                _ = self.trigger("startup") => {}
            }
        }

        while !*shutdown.borrow() {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now) else {
                warn!("Schedule has no upcoming trigger");
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(next = %next, wait_secs = wait.as_secs(), "Next run scheduled");

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = self.trigger("schedule") => {}
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    async fn trigger(&self, source: &'static str) {
        match self.run_once().await {
            Ok(RunOutcome::Completed(_)) | Ok(RunOutcome::Skipped) => {}
            Err(e) => error!(error = %e, trigger = source, "Failed to index stars"),
        }
    }

    /// Trigger a graceful shutdown of [`run`](Self::run).
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}
