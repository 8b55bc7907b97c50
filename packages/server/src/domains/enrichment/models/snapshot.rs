use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::content::ExtractedContent;
use crate::domains::submissions::models::SourcingMetadata;

/// Record of an aggregator listing being resolved to the product's own site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlExtraction {
    pub original_url: String,
    pub extracted_url: String,
    pub extraction_performed: bool,
}

/// Heuristic check that the submitted name appears in the extracted content.
/// A mismatch is flagged, never auto-corrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameVerification {
    pub submitted_name: String,
    pub matches: bool,
    pub extracted_name: Option<String>,
    /// Confidence that the name is wrong.
    pub confidence: f64,
    pub should_update: bool,
}

/// Everything one enrichment pass learned about a submission.
///
/// Overwritten on every run. Keys prefixed with `_` are pipeline
/// bookkeeping rather than extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentSnapshot {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// URL that was scraped (after any aggregator resolution).
    pub url: String,

    #[serde(default)]
    pub content: ExtractedContent,

    #[serde(default)]
    pub logo_url: Option<String>,

    #[serde(default)]
    pub screenshot_url: Option<String>,

    #[serde(default)]
    pub markdown: Option<String>,

    #[serde(default)]
    pub branding: Option<serde_json::Value>,

    #[serde(default)]
    pub page_title: Option<String>,

    pub enriched_at: DateTime<Utc>,

    #[serde(rename = "_sourcing_metadata", default, skip_serializing_if = "Option::is_none")]
    pub sourcing_metadata: Option<SourcingMetadata>,

    #[serde(rename = "_url_extraction", default, skip_serializing_if = "Option::is_none")]
    pub url_extraction: Option<UrlExtraction>,

    #[serde(rename = "_name_verification", default, skip_serializing_if = "Option::is_none")]
    pub name_verification: Option<NameVerification>,

    #[serde(rename = "_canonical_url", default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,

    #[serde(rename = "_logo_downloaded", default, skip_serializing_if = "std::ops::Not::not")]
    pub logo_downloaded: bool,

    #[serde(rename = "_logo_download_failed", default, skip_serializing_if = "Option::is_none")]
    pub logo_download_failed: Option<String>,

    #[serde(rename = "_screenshot_downloaded", default, skip_serializing_if = "std::ops::Not::not")]
    pub screenshot_downloaded: bool,

    #[serde(rename = "_screenshot_download_failed", default, skip_serializing_if = "Option::is_none")]
    pub screenshot_download_failed: Option<String>,
}

impl EnrichmentSnapshot {
    pub fn succeeded(url: impl Into<String>, enriched_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            error: None,
            url: url.into(),
            content: ExtractedContent::default(),
            logo_url: None,
            screenshot_url: None,
            markdown: None,
            branding: None,
            page_title: None,
            enriched_at,
            sourcing_metadata: None,
            url_extraction: None,
            name_verification: None,
            canonical_url: None,
            logo_downloaded: false,
            logo_download_failed: None,
            screenshot_downloaded: false,
            screenshot_download_failed: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>, enriched_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::succeeded(url, enriched_at)
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        if self.success {
            None
        } else {
            Some(self.error.as_deref().unwrap_or("unknown error"))
        }
    }
}
