// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (enrichment, review, sourcing) lives in domain activities that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseExtractionGateway, BaseDirectoryStore)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::{EntryId, SubmissionId};
use crate::domains::directory::models::{
    DuplicateConflict, EnrichmentLog, Entry, EntryFilter, EntryUpdate, NewEnrichmentLog, NewEntry,
};
use crate::domains::enrichment::models::EnrichmentSnapshot;
use crate::domains::review::models::{ReviewResult, ReviewVerdict};
use crate::domains::sourcing::models::{RunOutcome, SourcingRun};
use crate::domains::submissions::models::{
    NewSubmission, ReviewStamp, SourcingMetadata, Submission, SubmissionFilter,
};

// =============================================================================
// Gateway errors
// =============================================================================

/// Failure of an external collaborator call.
///
/// Ordinary scrape failures (dead site, blocked, timeout) are values of this
/// type, never panics. Only transient variants are retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("{message}")]
    Service { message: String, transient: bool },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout(_) | GatewayError::Network(_) => true,
            GatewayError::Service { transient, .. } => *transient,
            GatewayError::InvalidResponse(_) => false,
        }
    }
}

// =============================================================================
// Extraction Gateway Trait (Infrastructure - page scraping)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionFormat {
    Markdown,
    Screenshot,
    Branding,
    /// Constrained structured extraction: JSON schema plus guidance prompt.
    Structured {
        schema: serde_json::Value,
        prompt: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRequest {
    pub url: String,
    pub formats: Vec<ExtractionFormat>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>, formats: Vec<ExtractionFormat>) -> Self {
        Self {
            url: url.into(),
            formats,
        }
    }
}

/// Logo candidates reported by the extraction service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandingData {
    /// Primary logo.
    pub logo: Option<String>,
    /// `images.logo`
    pub logo_image: Option<String>,
    /// `images.ogImage`
    pub og_image: Option<String>,
    /// Everything the service returned, kept for the snapshot.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub og_url: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedPage {
    pub url: String,
    pub markdown: Option<String>,
    pub structured: Option<serde_json::Value>,
    pub branding: Option<BrandingData>,
    /// Expires within about a day.
    pub screenshot_url: Option<String>,
    pub metadata: PageMetadata,
}

#[async_trait]
pub trait BaseExtractionGateway: Send + Sync {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapedPage, GatewayError>;
}

// =============================================================================
// Web Search Trait (Infrastructure - discovery)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchRequest {
    pub query: String,
    pub limit: u32,
    /// Time window, e.g. `qdr:m`.
    pub tbs: Option<String>,
    pub location: Option<String>,
    /// Structured extraction applied to each result page.
    pub structured: Option<(serde_json::Value, String)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebSearchHit {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub position: Option<u32>,
    pub structured: Option<serde_json::Value>,
}

#[async_trait]
pub trait BaseWebSearcher: Send + Sync {
    async fn search(&self, request: &WebSearchRequest) -> Result<Vec<WebSearchHit>, GatewayError>;
}

// =============================================================================
// Review Gateway Trait (Infrastructure - LLM classification)
// =============================================================================

#[async_trait]
pub trait BaseReviewGateway: Send + Sync {
    /// Classify one candidate. Confidence is not guaranteed to be in range.
    async fn classify(&self, system: &str, prompt: &str) -> Result<ReviewVerdict, GatewayError>;
}

// =============================================================================
// Media Traits (Infrastructure - binary download and storage)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub final_url: String,
}

#[async_trait]
pub trait BaseMediaFetcher: Send + Sync {
    /// Download a binary, following redirects. Non-2xx is an error.
    async fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

#[async_trait]
pub trait BaseMediaStore: Send + Sync {
    /// Store bytes under `key` (e.g. `submissions/logos/<id>.png`), returning the stored path.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String>;

    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Remove a stored path. Missing paths are not an error.
    async fn delete(&self, path: &str) -> Result<()>;
}

// =============================================================================
// Post-approval Hook Trait
// =============================================================================

/// Called after an approval commits. Failures are logged, never surfaced.
#[async_trait]
pub trait BasePublishHook: Send + Sync {
    async fn entry_published(&self, entry: &Entry) -> Result<()>;
}

// =============================================================================
// Directory Store Trait (Infrastructure - persistence)
// =============================================================================

/// Atomic unit for approving one submission.
///
/// Holds the submission row lock (and the directory-wide uniqueness lock)
/// until `commit`. Dropping it without committing rolls everything back.
#[async_trait]
pub trait ApprovalTransaction: Send {
    /// The submission as read under the lock.
    fn submission(&self) -> &Submission;

    async fn find_conflict(
        &mut self,
        website: &str,
        name: &str,
        slug: &str,
    ) -> Result<Option<DuplicateConflict>>;

    async fn insert_entry(&mut self, entry: &NewEntry) -> Result<Entry>;

    async fn mark_approved(
        &mut self,
        entry_id: EntryId,
        stamp: &ReviewStamp,
        review: Option<&ReviewResult>,
    ) -> Result<Submission>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait BaseDirectoryStore: Send + Sync {
    // Submissions

    async fn insert_submission(&self, submission: &NewSubmission) -> Result<Submission>;

    async fn find_submission(&self, id: SubmissionId) -> Result<Option<Submission>>;

    async fn list_submissions(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>>;

    async fn update_submission_website(&self, id: SubmissionId, website: &str) -> Result<()>;

    /// Overwrites the enrichment snapshot. Media paths only replace existing
    /// ones when set.
    async fn save_enrichment(
        &self,
        id: SubmissionId,
        snapshot: &EnrichmentSnapshot,
        logo_path: Option<&str>,
        screenshot_path: Option<&str>,
    ) -> Result<()>;

    async fn save_review(
        &self,
        id: SubmissionId,
        review: &ReviewResult,
        needs_manual_review: bool,
    ) -> Result<()>;

    async fn flag_for_manual_review(
        &self,
        id: SubmissionId,
        metadata: Option<&SourcingMetadata>,
    ) -> Result<()>;

    /// PENDING to REJECTED. `None` when the submission is missing or not pending.
    async fn reject_submission(
        &self,
        id: SubmissionId,
        stamp: &ReviewStamp,
    ) -> Result<Option<Submission>>;

    /// REJECTED to PENDING. `None` when the submission is missing or not rejected.
    async fn reopen_submission(
        &self,
        id: SubmissionId,
        stamp: &ReviewStamp,
    ) -> Result<Option<Submission>>;

    /// Begins the approval transaction. `None` when the submission is missing.
    async fn begin_approval(&self, id: SubmissionId) -> Result<Option<Box<dyn ApprovalTransaction>>>;

    /// Every entry website plus every non-rejected submission website.
    async fn occupied_websites(&self) -> Result<Vec<String>>;

    // Entries

    async fn find_entry(&self, id: EntryId) -> Result<Option<Entry>>;

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>>;

    /// Applies the update and writes the log in one atomic unit.
    async fn apply_entry_enrichment(
        &self,
        id: EntryId,
        update: &EntryUpdate,
        log: &NewEnrichmentLog,
    ) -> Result<(Entry, EnrichmentLog)>;

    async fn insert_enrichment_log(&self, log: &NewEnrichmentLog) -> Result<EnrichmentLog>;

    async fn enrichment_logs(&self, entry_id: EntryId) -> Result<Vec<EnrichmentLog>>;

    // Sourcing runs

    async fn start_sourcing_run(
        &self,
        source_id: &str,
        config: &serde_json::Value,
        created_by: Option<&str>,
    ) -> Result<SourcingRun>;

    async fn finish_sourcing_run(
        &self,
        run: &SourcingRun,
        outcome: &RunOutcome,
    ) -> Result<SourcingRun>;

    async fn recent_sourcing_runs(&self, limit: i64) -> Result<Vec<SourcingRun>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_gateway_errors() {
        assert!(GatewayError::Timeout(120).is_transient());
        assert!(GatewayError::Network("reset".into()).is_transient());
        assert!(GatewayError::Service {
            message: "429".into(),
            transient: true
        }
        .is_transient());
        assert!(!GatewayError::Service {
            message: "404".into(),
            transient: false
        }
        .is_transient());
        assert!(!GatewayError::InvalidResponse("bad json".into()).is_transient());
    }
}
