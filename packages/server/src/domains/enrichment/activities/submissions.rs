//! Submission enrichment - scrape, verify, and copy media before review.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::media::{download_logo, download_screenshot};
use super::scrape::{extract_product_url, scrape_product, verify_name};
use crate::common::{pause_between_items, PipelineError, SubmissionId};
use crate::domains::enrichment::models::{EnrichmentSnapshot, UrlExtraction};
use crate::domains::submissions::models::{Submission, SubmissionFilter, SubmissionStatus};
use crate::domains::url_filters::UrlClassification;
use crate::kernel::ServerDeps;

/// Enriches one submission and returns it as stored afterwards.
///
/// Already-enriched submissions are returned untouched unless `force` is
/// set, and approved or rejected ones always are. A failed scrape is stored
/// on the snapshot, not returned as an error.
pub async fn enrich_submission(
    id: SubmissionId,
    force: bool,
    deps: &ServerDeps,
) -> Result<Submission> {
    let submission = deps
        .store
        .find_submission(id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Submission", id))?;

    if submission.status != SubmissionStatus::Pending {
        info!(submission_id = %id, status = %submission.status, "Not pending, skipping enrichment");
        return Ok(submission);
    }
    if submission.is_enriched() && !force {
        info!(submission_id = %id, "Already enriched, skipping");
        return Ok(submission);
    }

    info!(submission_id = %id, name = %submission.name, "Enriching submission");

    let original_url = submission.website.clone();
    let mut url = original_url.clone();
    let mut url_extraction = None;

    let is_aggregator = deps.classifier.classify(&original_url) == UrlClassification::Aggregator
        || submission.is_marked_aggregator();
    if is_aggregator {
        if let Some(extracted) = extract_product_url(&original_url, deps).await {
            if extracted != original_url {
                info!(submission_id = %id, from = %original_url, to = %extracted, "Resolved aggregator URL");
                deps.store.update_submission_website(id, &extracted).await?;
                url_extraction = Some(UrlExtraction {
                    original_url: original_url.clone(),
                    extracted_url: extracted.clone(),
                    extraction_performed: true,
                });
                url = extracted;
            }
        }
    }

    let mut snapshot = scrape_product(&url, deps).await;
    snapshot.sourcing_metadata = submission.sourcing_metadata.clone();
    snapshot.url_extraction = url_extraction;

    let mut logo_path = None;
    let mut screenshot_path = None;

    if snapshot.success {
        if !snapshot.content.is_empty() {
            snapshot.name_verification = Some(verify_name(&submission.name, &snapshot.content));
        }
        (logo_path, screenshot_path) = download_media(id, &mut snapshot, deps).await;
    }

    deps.store
        .save_enrichment(id, &snapshot, logo_path.as_deref(), screenshot_path.as_deref())
        .await?;

    match snapshot.failure_reason() {
        None => info!(submission_id = %id, "Submission enrichment succeeded"),
        Some(reason) => warn!(submission_id = %id, reason, "Submission enrichment failed"),
    }

    deps.store
        .find_submission(id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Submission", id).into())
}

async fn download_media(
    id: SubmissionId,
    snapshot: &mut EnrichmentSnapshot,
    deps: &ServerDeps,
) -> (Option<String>, Option<String>) {
    let mut logo_path = None;
    let mut screenshot_path = None;

    if let Some(logo_url) = snapshot.logo_url.clone() {
        match download_logo(&logo_url, &format!("submissions/logos/{}", id), deps).await {
            Ok(path) => {
                snapshot.logo_downloaded = true;
                logo_path = Some(path);
            }
            Err(e) => {
                warn!(submission_id = %id, error = %e, "Logo download failed");
                snapshot.logo_download_failed = Some(e.to_string());
            }
        }
    }

    if let Some(screenshot_url) = snapshot.screenshot_url.clone() {
        match download_screenshot(&screenshot_url, &format!("submissions/screenshots/{}", id), deps)
            .await
        {
            Ok(path) => {
                snapshot.screenshot_downloaded = true;
                screenshot_path = Some(path);
            }
            Err(e) => {
                warn!(submission_id = %id, error = %e, "Screenshot download failed");
                snapshot.screenshot_download_failed = Some(e.to_string());
            }
        }
    }

    (logo_path, screenshot_path)
}

/// Per-submission result of a batch enrichment.
#[derive(Debug, Clone)]
pub enum SubmissionEnrichment {
    Enriched(Submission),
    /// Scrape ran but failed; the reason is stored on the snapshot.
    Failed(Submission),
    /// Already enriched and not forced, or no longer pending.
    Skipped(Submission),
    Error { id: SubmissionId, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct EnrichSubmissionsResult {
    pub items: Vec<SubmissionEnrichment>,
    pub cancelled: bool,
}

impl EnrichSubmissionsResult {
    pub fn count(&self, pred: impl Fn(&SubmissionEnrichment) -> bool) -> usize {
        self.items.iter().filter(|i| pred(i)).count()
    }
}

/// Enriches the given submissions, or pending unenriched ones when `ids`
/// is `None` (all pending ones when forced).
pub async fn enrich_submissions(
    ids: Option<Vec<SubmissionId>>,
    limit: Option<i64>,
    force: bool,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<EnrichSubmissionsResult> {
    let filter = match ids {
        Some(ids) => SubmissionFilter {
            ids: Some(ids),
            limit,
            ..Default::default()
        },
        None => SubmissionFilter {
            status: Some(SubmissionStatus::Pending),
            enriched: (!force).then_some(false),
            limit,
            ..Default::default()
        },
    };
    let submissions = deps.store.list_submissions(&filter).await?;

    info!(count = submissions.len(), force, "Enriching submissions");

    let mut result = EnrichSubmissionsResult::default();
    for (index, submission) in submissions.into_iter().enumerate() {
        if index > 0 && !pause_between_items(deps.settings.batch_delay, cancel).await {
            result.cancelled = true;
            break;
        }

        let pending = submission.status == SubmissionStatus::Pending;
        if !pending || (submission.is_enriched() && !force) {
            result.items.push(SubmissionEnrichment::Skipped(submission));
            continue;
        }

        let id = submission.id;
        let item = match enrich_submission(id, force, deps).await {
            Ok(enriched) if enriched.enrichment_data.as_ref().is_some_and(|d| d.success) => {
                SubmissionEnrichment::Enriched(enriched)
            }
            Ok(enriched) => SubmissionEnrichment::Failed(enriched),
            Err(e) => {
                error!(submission_id = %id, error = %e, "Failed to enrich submission");
                SubmissionEnrichment::Error {
                    id,
                    message: e.to_string(),
                }
            }
        };
        result.items.push(item);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::enrichment::models::ExtractedContent;
    use crate::domains::submissions::models::{NewSubmission, ReviewStamp, SubmissionSource};
    use crate::kernel::test_dependencies::{scraped_page, MockExtractionGateway};
    use crate::kernel::{ScrapedPage, TestDependencies};

    fn content() -> ExtractedContent {
        ExtractedContent {
            short_description: Some("Foo Agent automates support".into()),
            ..Default::default()
        }
    }

    async fn pending(deps: &ServerDeps, website: &str) -> Submission {
        deps.store
            .insert_submission(
                &NewSubmission::builder()
                    .name("Foo Agent")
                    .website(website)
                    .source(SubmissionSource::Form)
                    .build(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn enriched_submissions_are_only_rescraped_when_forced() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.into_deps();
        let submission = pending(&deps, "https://foo.ai").await;

        enrich_submission(submission.id, false, &deps).await.unwrap();
        assert_eq!(test_deps.extractor.call_count(), 1);

        let again = enrich_submission(submission.id, false, &deps).await.unwrap();
        assert_eq!(test_deps.extractor.call_count(), 1);
        assert!(again.is_enriched());

        enrich_submission(submission.id, true, &deps).await.unwrap();
        assert_eq!(test_deps.extractor.call_count(), 2);
    }

    #[tokio::test]
    async fn decided_submissions_are_never_rescraped() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.into_deps();
        let submission = pending(&deps, "https://futuretools.io/tools/foo-agent").await;
        deps.store
            .reject_submission(submission.id, &ReviewStamp::new("alice", None))
            .await
            .unwrap();

        let result = enrich_submission(submission.id, true, &deps).await.unwrap();

        assert_eq!(test_deps.extractor.call_count(), 0);
        assert_eq!(result.status, SubmissionStatus::Rejected);
        assert_eq!(result.website, "https://futuretools.io/tools/foo-agent");
        assert!(!result.is_enriched());
    }

    #[tokio::test]
    async fn aggregator_listing_is_resolved_before_scraping() {
        let listing = "https://futuretools.io/tools/foo-agent";
        let test_deps = TestDependencies::new().mock_extractor(
            MockExtractionGateway::new()
                .with_page_for(
                    listing,
                    ScrapedPage {
                        url: listing.to_string(),
                        structured: Some(serde_json::json!({
                            "product_website": "https://foo-agent.ai",
                            "product_name": "Foo Agent",
                            "confidence": 0.9
                        })),
                        ..Default::default()
                    },
                )
                .with_page_for("https://foo-agent.ai", scraped_page("https://foo-agent.ai", &content())),
        );
        let deps = test_deps.into_deps();
        let submission = pending(&deps, listing).await;

        let enriched = enrich_submission(submission.id, false, &deps).await.unwrap();

        assert_eq!(enriched.website, "https://foo-agent.ai");
        let snapshot = enriched.enrichment_data.unwrap();
        assert!(snapshot.success);
        assert_eq!(
            snapshot.url_extraction,
            Some(UrlExtraction {
                original_url: listing.to_string(),
                extracted_url: "https://foo-agent.ai".to_string(),
                extraction_performed: true,
            })
        );
        assert_eq!(
            snapshot.content.short_description.as_deref(),
            Some("Foo Agent automates support")
        );
        assert!(test_deps.extractor.was_scraped(listing));
        assert!(test_deps.extractor.was_scraped("https://foo-agent.ai"));
    }

    #[tokio::test]
    async fn low_confidence_aggregator_lookup_keeps_the_listing_url() {
        let listing = "https://futuretools.io/tools/foo-agent";
        let test_deps = TestDependencies::new().mock_extractor(MockExtractionGateway::new().with_page_for(
            listing,
            ScrapedPage {
                url: listing.to_string(),
                structured: Some(serde_json::json!({
                    "product_website": "https://foo-agent.ai",
                    "confidence": 0.3
                })),
                ..Default::default()
            },
        ));
        let deps = test_deps.into_deps();
        let submission = pending(&deps, listing).await;

        let enriched = enrich_submission(submission.id, false, &deps).await.unwrap();

        assert_eq!(enriched.website, listing);
        assert_eq!(enriched.enrichment_data.unwrap().url_extraction, None);
        assert!(!test_deps.extractor.was_scraped("https://foo-agent.ai"));
    }
}
