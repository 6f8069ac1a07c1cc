//! Dependency initialization and wiring for the stars search engine.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::AppError;
use stars_search_pipeline::{
    fetcher::{FetcherConfig, GitHubClient, GitHubClientConfig, RetryPolicy, StarsFetcher},
    loader::{LoaderConfig, SearchLoader},
    orchestrator::{Orchestrator, OrchestratorConfig},
    scheduler::Schedule,
};
use stars_search_repository::{IndexSchema, SearchIndexClient, TantivyProvider};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Client shared by the loader and the HTTP layer.
    pub search: SearchIndexClient,
    /// The configured orchestrator ready to run.
    pub orchestrator: Arc<Orchestrator>,
}

impl Dependencies {
    /// Initialize all dependencies from `settings`.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If the GitHub client, the index or the schedule
    ///   cannot be created
    pub fn new(settings: &Settings) -> Result<Self, AppError> {
        info!(
            endpoint = %settings.github_endpoint,
            index_path = %settings.index_path.display(),
            schedule = %settings.refresh_schedule,
            location = %settings.location,
            "Initializing dependencies"
        );

        // GitHub client
        let github = GitHubClient::new(
            GitHubClientConfig::new(settings.github_token.clone())
                .with_endpoint(settings.github_endpoint.clone()),
        )?;

        // Search index, created on first start
        let provider = TantivyProvider::open(&settings.index_path, IndexSchema::repository())?;
        let search = SearchIndexClient::new(Arc::new(provider));

        let schedule = Schedule::parse(&settings.refresh_schedule, &settings.location)?;

        let retry = match settings.fetch_max_retries {
            Some(max) => RetryPolicy::default().with_max_retries(max),
            None => RetryPolicy::unbounded(),
        };
        let fetcher = StarsFetcher::with_config(
            Arc::new(github),
            FetcherConfig {
                page_size: settings.fetch_page_size,
                retry,
                ..Default::default()
            },
        );

        let loader = SearchLoader::with_config(
            search.clone(),
            LoaderConfig {
                batch_size: settings.indexing_batch_size,
            },
        );

        let orchestrator = Orchestrator::with_config(
            fetcher,
            loader,
            schedule,
            OrchestratorConfig {
                run_on_start: settings.initial_index,
            },
        );

        info!("Dependencies initialized");
        Ok(Self {
            search,
            orchestrator: Arc::new(orchestrator),
        })
    }
}
