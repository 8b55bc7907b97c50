// TestDependencies - mock implementations for testing
//
// Provides mock gateways and an in-memory store that can be wired into
// ServerDeps for activity tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{
    BaseExtractionGateway, BaseMediaFetcher, BaseMediaStore, BasePublishHook, BaseReviewGateway,
    BaseWebSearcher, BrandingData, FetchedMedia, GatewayError, MemoryDirectoryStore, PageMetadata,
    RetryPolicy, ScrapeRequest, ScrapedPage, ServerDeps, WebSearchHit, WebSearchRequest,
};
use crate::config::PipelineSettings;
use crate::domains::directory::models::Entry;
use crate::domains::enrichment::models::ExtractedContent;
use crate::domains::review::models::{ReviewDecision, ReviewVerdict};
use crate::domains::url_filters::{UrlClassifier, UrlFilterConfig};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A successful scrape carrying `content` as the structured result.
pub fn scraped_page(url: &str, content: &ExtractedContent) -> ScrapedPage {
    ScrapedPage {
        url: url.to_string(),
        markdown: Some(format!(
            "# {}\n\n{}",
            content.short_description.as_deref().unwrap_or("Mock product"),
            content.description.as_deref().unwrap_or("")
        )),
        structured: serde_json::to_value(content).ok(),
        branding: None,
        screenshot_url: None,
        metadata: PageMetadata {
            title: Some("Mock Page".to_string()),
            og_url: None,
            source_url: Some(url.to_string()),
        },
    }
}

// =============================================================================
// Mock Extraction Gateway
// =============================================================================

pub struct MockExtractionGateway {
    by_url: Arc<Mutex<HashMap<String, Result<ScrapedPage, GatewayError>>>>,
    responses: Arc<Mutex<Vec<Result<ScrapedPage, GatewayError>>>>,
    calls: Arc<Mutex<Vec<ScrapeRequest>>>,
}

impl MockExtractionGateway {
    pub fn new() -> Self {
        Self {
            by_url: Arc::new(Mutex::new(HashMap::new())),
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a page, returned by the next scrape of any URL
    pub fn with_page(self, page: ScrapedPage) -> Self {
        lock(&self.responses).push(Ok(page));
        self
    }

    /// Queue a failure
    pub fn with_error(self, error: GatewayError) -> Self {
        lock(&self.responses).push(Err(error));
        self
    }

    /// Always answer scrapes of `url` with this page (checked before the queue)
    pub fn with_page_for(self, url: &str, page: ScrapedPage) -> Self {
        lock(&self.by_url).insert(url.to_string(), Ok(page));
        self
    }

    pub fn calls(&self) -> Vec<ScrapeRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn was_scraped(&self, url: &str) -> bool {
        lock(&self.calls).iter().any(|c| c.url == url)
    }
}

impl Default for MockExtractionGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseExtractionGateway for MockExtractionGateway {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapedPage, GatewayError> {
        lock(&self.calls).push(request.clone());

        if let Some(response) = lock(&self.by_url).get(&request.url) {
            return response.clone();
        }

        let mut responses = lock(&self.responses);
        if !responses.is_empty() {
            responses.remove(0)
        } else {
            Ok(ScrapedPage {
                url: request.url.clone(),
                markdown: Some("# Mock Content\n\nThis is mock scraped content.".to_string()),
                ..Default::default()
            })
        }
    }
}

// =============================================================================
// Mock Web Searcher
// =============================================================================

pub struct MockWebSearcher {
    responses: Arc<Mutex<Vec<Result<Vec<WebSearchHit>, GatewayError>>>>,
    calls: Arc<Mutex<Vec<WebSearchRequest>>>,
}

impl MockWebSearcher {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_hits(self, hits: Vec<WebSearchHit>) -> Self {
        lock(&self.responses).push(Ok(hits));
        self
    }

    pub fn with_error(self, error: GatewayError) -> Self {
        lock(&self.responses).push(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<WebSearchRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl Default for MockWebSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseWebSearcher for MockWebSearcher {
    async fn search(&self, request: &WebSearchRequest) -> Result<Vec<WebSearchHit>, GatewayError> {
        lock(&self.calls).push(request.clone());

        let mut responses = lock(&self.responses);
        if !responses.is_empty() {
            responses.remove(0)
        } else {
            Ok(Vec::new())
        }
    }
}

// =============================================================================
// Mock Review Gateway
// =============================================================================

pub struct MockReviewGateway {
    responses: Arc<Mutex<Vec<Result<ReviewVerdict, GatewayError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockReviewGateway {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_verdict(self, decision: ReviewDecision, confidence: f64) -> Self {
        let verdict = ReviewVerdict {
            decision,
            is_ai_agent: decision == ReviewDecision::Approved,
            confidence,
            reasoning: format!("Mock verdict: {}", decision),
            flags: Vec::new(),
        };
        lock(&self.responses).push(Ok(verdict));
        self
    }

    pub fn with_error(self, error: GatewayError) -> Self {
        lock(&self.responses).push(Err(error));
        self
    }

    /// Get all prompts that were sent for review
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.calls).last().cloned()
    }

    pub fn was_called_with(&self, text: &str) -> bool {
        lock(&self.calls).iter().any(|p| p.contains(text))
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl Default for MockReviewGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseReviewGateway for MockReviewGateway {
    async fn classify(&self, _system: &str, prompt: &str) -> Result<ReviewVerdict, GatewayError> {
        lock(&self.calls).push(prompt.to_string());

        let mut responses = lock(&self.responses);
        if !responses.is_empty() {
            responses.remove(0)
        } else {
            Ok(ReviewVerdict {
                decision: ReviewDecision::NeedsReview,
                is_ai_agent: false,
                confidence: 0.5,
                reasoning: "Mock review".to_string(),
                flags: Vec::new(),
            })
        }
    }
}

// =============================================================================
// Mock Media Fetcher / Media Store
// =============================================================================

pub struct MockMediaFetcher {
    media: Arc<Mutex<HashMap<String, std::result::Result<FetchedMedia, String>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockMediaFetcher {
    pub fn new() -> Self {
        Self {
            media: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_media(self, url: &str, bytes: &[u8], content_type: Option<&str>) -> Self {
        let media = FetchedMedia {
            bytes: bytes.to_vec(),
            content_type: content_type.map(str::to_string),
            final_url: url.to_string(),
        };
        lock(&self.media).insert(url.to_string(), Ok(media));
        self
    }

    pub fn with_failure(self, url: &str, message: &str) -> Self {
        lock(&self.media).insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn was_fetched(&self, url: &str) -> bool {
        lock(&self.calls).iter().any(|u| u == url)
    }
}

impl Default for MockMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseMediaFetcher for MockMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        lock(&self.calls).push(url.to_string());

        match lock(&self.media).get(url) {
            Some(Ok(media)) => Ok(media.clone()),
            Some(Err(message)) => Err(anyhow!("{}", message)),
            None => Ok(FetchedMedia {
                bytes: b"\x89PNG mock".to_vec(),
                content_type: Some("image/png".to_string()),
                final_url: url.to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct MemoryMediaStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failing_prefix: Option<String>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        lock(&self.files).insert(path.to_string(), bytes.to_vec());
        self
    }

    /// Fail every `put` whose key starts with `prefix`
    pub fn failing_puts(mut self, prefix: &str) -> Self {
        self.failing_prefix = Some(prefix.to_string());
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        lock(&self.files).contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.files).get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = lock(&self.files).keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BaseMediaStore for MemoryMediaStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        if self
            .failing_prefix
            .as_deref()
            .is_some_and(|prefix| key.starts_with(prefix))
        {
            return Err(anyhow!("Media store refused {}", key));
        }
        lock(&self.files).insert(key.to_string(), bytes.to_vec());
        Ok(key.to_string())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        lock(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("No media stored at {}", path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        lock(&self.files).remove(path);
        Ok(())
    }
}

// =============================================================================
// Recording Publish Hook
// =============================================================================

#[derive(Default)]
pub struct RecordingPublishHook {
    published: Arc<Mutex<Vec<Entry>>>,
    fail: bool,
}

impl RecordingPublishHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the entry, then reports an error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<Entry> {
        lock(&self.published).clone()
    }
}

#[async_trait]
impl BasePublishHook for RecordingPublishHook {
    async fn entry_published(&self, entry: &Entry) -> Result<()> {
        lock(&self.published).push(entry.clone());
        if self.fail {
            return Err(anyhow!("publish hook failed for {}", entry.slug));
        }
        Ok(())
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub store: Arc<MemoryDirectoryStore>,
    pub extractor: Arc<MockExtractionGateway>,
    pub searcher: Arc<MockWebSearcher>,
    pub reviewer: Arc<MockReviewGateway>,
    pub media_fetcher: Arc<MockMediaFetcher>,
    pub media_store: Arc<MemoryMediaStore>,
    pub publish_hook: Arc<RecordingPublishHook>,
    pub url_filters: UrlFilterConfig,
    pub settings: PipelineSettings,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryDirectoryStore::new()),
            extractor: Arc::new(MockExtractionGateway::new()),
            searcher: Arc::new(MockWebSearcher::new()),
            reviewer: Arc::new(MockReviewGateway::new()),
            media_fetcher: Arc::new(MockMediaFetcher::new()),
            media_store: Arc::new(MemoryMediaStore::new()),
            publish_hook: Arc::new(RecordingPublishHook::new()),
            url_filters: UrlFilterConfig::default(),
            settings: PipelineSettings {
                batch_delay: std::time::Duration::ZERO,
                retry: RetryPolicy::none(),
                ..PipelineSettings::default()
            },
        }
    }

    /// Share a store between several dependency sets
    pub fn store(mut self, store: Arc<MemoryDirectoryStore>) -> Self {
        self.store = store;
        self
    }

    pub fn mock_extractor(mut self, extractor: MockExtractionGateway) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn mock_searcher(mut self, searcher: MockWebSearcher) -> Self {
        self.searcher = Arc::new(searcher);
        self
    }

    pub fn mock_reviewer(mut self, reviewer: MockReviewGateway) -> Self {
        self.reviewer = Arc::new(reviewer);
        self
    }

    pub fn mock_media_fetcher(mut self, fetcher: MockMediaFetcher) -> Self {
        self.media_fetcher = Arc::new(fetcher);
        self
    }

    pub fn media_store(mut self, store: MemoryMediaStore) -> Self {
        self.media_store = Arc::new(store);
        self
    }

    pub fn publish_hook(mut self, hook: RecordingPublishHook) -> Self {
        self.publish_hook = Arc::new(hook);
        self
    }

    pub fn url_filters(mut self, config: UrlFilterConfig) -> Self {
        self.url_filters = config;
        self
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Wire the mocks into the dependency container activities take
    pub fn into_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.store.clone(),
            self.extractor.clone(),
            self.searcher.clone(),
            self.reviewer.clone(),
            self.media_fetcher.clone(),
            self.media_store.clone(),
            vec![self.publish_hook.clone()],
            Arc::new(UrlClassifier::new(self.url_filters.clone())),
            self.settings.clone(),
        )
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

/// Branding payload as the extraction service reports it.
pub fn branding(logo: Option<&str>, og_image: Option<&str>) -> BrandingData {
    BrandingData {
        logo: logo.map(str::to_string),
        logo_image: None,
        og_image: og_image.map(str::to_string),
        raw: serde_json::json!({ "logo": logo, "images": { "ogImage": og_image } }),
    }
}
