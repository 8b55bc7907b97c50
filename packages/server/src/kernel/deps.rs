//! Server dependencies for activities (using traits for testability)
//!
//! This module provides the central dependency container used by all domain activities.
//! All external services use trait abstractions to enable testing.

use std::sync::Arc;

use anyhow::{Context, Result};
use firecrawl_client::FirecrawlClient;
use openai_client::OpenAIClient;
use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::{Config, PipelineSettings};
use crate::domains::url_filters::UrlClassifier;
use crate::kernel::{
    BaseDirectoryStore, BaseExtractionGateway, BaseMediaFetcher, BaseMediaStore, BasePublishHook,
    BaseReviewGateway, BaseWebSearcher, FirecrawlGateway, HttpMediaFetcher, LocalMediaStore,
    OpenAIReviewer, PgDirectoryStore,
};

/// Dependencies accessible to activities (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseDirectoryStore>,
    pub extractor: Arc<dyn BaseExtractionGateway>,
    pub searcher: Arc<dyn BaseWebSearcher>,
    pub reviewer: Arc<dyn BaseReviewGateway>,
    pub media_fetcher: Arc<dyn BaseMediaFetcher>,
    pub media_store: Arc<dyn BaseMediaStore>,
    /// Run in order after every committed approval.
    pub publish_hooks: Vec<Arc<dyn BasePublishHook>>,
    pub classifier: Arc<UrlClassifier>,
    pub settings: PipelineSettings,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn BaseDirectoryStore>,
        extractor: Arc<dyn BaseExtractionGateway>,
        searcher: Arc<dyn BaseWebSearcher>,
        reviewer: Arc<dyn BaseReviewGateway>,
        media_fetcher: Arc<dyn BaseMediaFetcher>,
        media_store: Arc<dyn BaseMediaStore>,
        publish_hooks: Vec<Arc<dyn BasePublishHook>>,
        classifier: Arc<UrlClassifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            extractor,
            searcher,
            reviewer,
            media_fetcher,
            media_store,
            publish_hooks,
            classifier,
            settings,
        }
    }

    /// Production wiring: Postgres store, Firecrawl, OpenAI and local media.
    pub fn from_config(config: &Config, pool: PgPool) -> Result<Self> {
        let firecrawl = FirecrawlClient::with_timeout(
            config.firecrawl_api_key.expose_secret(),
            config.pipeline.scrape_timeout,
        )
        .context("Failed to create Firecrawl client")?;
        let firecrawl = Arc::new(FirecrawlGateway::new(firecrawl));

        let openai = OpenAIClient::new(config.openai_api_key.expose_secret())
            .with_timeout(config.pipeline.review_timeout);

        Ok(Self::new(
            Arc::new(PgDirectoryStore::new(pool)),
            firecrawl.clone(),
            firecrawl,
            Arc::new(OpenAIReviewer::new(openai, &config.review_model)),
            Arc::new(HttpMediaFetcher::new(config.pipeline.media_timeout)?),
            Arc::new(LocalMediaStore::new(&config.media_root)),
            Vec::new(),
            Arc::new(UrlClassifier::new(config.url_filters.clone())),
            config.pipeline.clone(),
        ))
    }
}
