//! Confidence-gated review of submissions and entries.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::prompt::{build_review_prompt, REVIEW_INSTRUCTIONS};
use crate::common::{pause_between_items, EntryId, PipelineError, SubmissionId};
use crate::domains::enrichment::models::ExtractedContent;
use crate::domains::review::models::{AutoTransition, ReviewDecision, ReviewResult};
use crate::domains::submissions::activities::approve::{
    approve_with_stamp, ensure_pending, ApprovalOutcome,
};
use crate::domains::submissions::models::{ReviewStamp, Submission, SubmissionFilter};
use crate::kernel::{call_with_retry, ServerDeps};

/// Runs the classifier once. A gateway failure becomes a safe
/// `needs_review` result instead of an error.
pub async fn classify_candidate(
    name: &str,
    website: &str,
    content: Option<&ExtractedContent>,
    markdown: Option<&str>,
    deps: &ServerDeps,
) -> ReviewResult {
    let prompt = build_review_prompt(name, website, content, markdown);

    let verdict = call_with_retry(
        deps.settings.retry,
        deps.settings.review_timeout,
        "review",
        || deps.reviewer.classify(REVIEW_INSTRUCTIONS, &prompt),
    )
    .await;

    match verdict {
        Ok(verdict) => {
            let result = ReviewResult::from_verdict(verdict, Utc::now());
            info!(
                name,
                decision = %result.decision,
                confidence = result.confidence,
                "Review complete"
            );
            result
        }
        Err(e) => {
            warn!(name, error = %e, "Review failed");
            ReviewResult::from_error(&e.to_string(), Utc::now())
        }
    }
}

/// Reviews a pending submission, stores the result and, when `auto_apply`
/// is set and the gate allows it, applies the decision.
pub async fn review_submission(
    id: SubmissionId,
    auto_apply: bool,
    deps: &ServerDeps,
) -> Result<Submission> {
    let submission = deps
        .store
        .find_submission(id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Submission", id))?;
    ensure_pending(&submission, "review")?;

    let snapshot = submission.enrichment_data.as_ref();
    let mut result = classify_candidate(
        &submission.name,
        &submission.website,
        snapshot.map(|s| &s.content),
        snapshot.and_then(|s| s.markdown.as_deref()),
        deps,
    )
    .await;

    let gate = deps.settings.gate.evaluate(&result, auto_apply);
    result.needs_manual_review = gate.needs_manual_review;
    let confidence_pct = (result.confidence * 100.0).round();

    match gate.auto_transition {
        Some(AutoTransition::Approve) => {
            let mut applied = result.clone();
            applied.auto_applied = true;
            let stamp = ReviewStamp::automated(format!(
                "Auto-approved by AI review ({}% confidence)",
                confidence_pct
            ));

            match approve_with_stamp(id, stamp, Some(&applied), deps).await {
                Ok(ApprovalOutcome::Approved(entry)) => {
                    info!(submission_id = %id, entry_id = %entry.id, "Auto-approved submission");
                    result = applied;
                }
                Ok(ApprovalOutcome::Conflict(conflict)) => {
                    let stamp = ReviewStamp::automated(format!("Auto-rejected: {}", conflict));
                    if deps.store.reject_submission(id, &stamp).await?.is_some() {
                        info!(submission_id = %id, %conflict, "Auto-approval hit a duplicate, rejected");
                        result = applied;
                    }
                }
                Err(e) if blocks_approval(&e) => {
                    warn!(submission_id = %id, error = %e, "Auto-approval blocked, needs manual review");
                    result.needs_manual_review = true;
                }
                Err(e) => {
                    result.needs_manual_review = true;
                    deps.store.save_review(id, &result, true).await?;
                    return Err(e);
                }
            }
        }
        Some(AutoTransition::Reject) => {
            let stamp = ReviewStamp::automated(format!(
                "Auto-rejected by AI review ({}% confidence): {}",
                confidence_pct, result.reasoning
            ));
            if deps.store.reject_submission(id, &stamp).await?.is_some() {
                info!(submission_id = %id, "Auto-rejected submission");
                result.auto_applied = true;
            }
        }
        None => {}
    }

    deps.store
        .save_review(id, &result, result.needs_manual_review)
        .await?;

    info!(
        submission_id = %id,
        needs_manual_review = result.needs_manual_review,
        auto_applied = result.auto_applied,
        "Review saved"
    );

    deps.store
        .find_submission(id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Submission", id).into())
}

/// Missing or failed enrichment keeps an auto-approval pending instead of
/// failing the review.
fn blocks_approval(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<PipelineError>(),
        Some(PipelineError::EnrichmentFailed { .. } | PipelineError::EnrichmentRequired { .. })
    )
}

/// Reviews an existing entry from its stored fields. Nothing is persisted.
pub async fn review_entry(entry_id: EntryId, deps: &ServerDeps) -> Result<ReviewResult> {
    let entry = deps
        .store
        .find_entry(entry_id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Entry", entry_id))?;

    let content = ExtractedContent {
        short_description: Some(entry.short_description.clone()),
        description: Some(entry.description.clone()),
        features: entry.features.clone(),
        use_cases: entry.use_cases.clone(),
        category: entry.categories.first().cloned(),
        industry: wire_name(&entry.industry),
        pricing_model: wire_name(&entry.pricing_model),
        ..Default::default()
    }
    .cleaned();

    info!(entry_id = %entry_id, name = %entry.name, "Reviewing entry");
    Ok(classify_candidate(&entry.name, &entry.website, Some(&content), None, deps).await)
}

/// Serialized name of a unit enum variant, e.g. `FREEMIUM`.
fn wire_name<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
}

#[derive(Debug, Clone)]
pub enum ReviewedSubmission {
    Reviewed(Submission),
    /// No enrichment data yet.
    Skipped { id: SubmissionId, name: String },
    Error { id: SubmissionId, name: String, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ReviewBatchResult {
    pub items: Vec<ReviewedSubmission>,
    pub cancelled: bool,
}

impl ReviewBatchResult {
    fn decisions(&self) -> impl Iterator<Item = ReviewDecision> + '_ {
        self.items.iter().filter_map(|item| match item {
            ReviewedSubmission::Reviewed(s) => s.ai_review_result.as_ref().map(|r| r.decision),
            _ => None,
        })
    }

    pub fn count(&self, decision: ReviewDecision) -> usize {
        self.decisions().filter(|d| *d == decision).count()
    }

    pub fn errors(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, ReviewedSubmission::Error { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, ReviewedSubmission::Skipped { .. }))
            .count()
    }
}

/// Reviews pending submissions: the given ids, or every enriched one not yet
/// reviewed (`force` includes already reviewed ones).
pub async fn review_submissions(
    ids: Option<Vec<SubmissionId>>,
    limit: Option<i64>,
    auto_apply: bool,
    force: bool,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<ReviewBatchResult> {
    let filter = SubmissionFilter {
        enriched: ids.is_none().then_some(true),
        reviewed: (ids.is_none() && !force).then_some(false),
        ids,
        limit,
        ..SubmissionFilter::pending()
    };
    let submissions = deps.store.list_submissions(&filter).await?;
    info!(count = submissions.len(), auto_apply, "Reviewing submissions");

    let mut result = ReviewBatchResult::default();
    let mut reviewed_any = false;
    for submission in submissions {
        if !submission.is_enriched() {
            result.items.push(ReviewedSubmission::Skipped {
                id: submission.id,
                name: submission.name,
            });
            continue;
        }

        if reviewed_any && !pause_between_items(deps.settings.batch_delay, cancel).await {
            result.cancelled = true;
            break;
        }
        reviewed_any = true;

        let item = match review_submission(submission.id, auto_apply, deps).await {
            Ok(reviewed) => ReviewedSubmission::Reviewed(reviewed),
            Err(e) => {
                error!(submission_id = %submission.id, error = %e, "Failed to review submission");
                ReviewedSubmission::Error {
                    id: submission.id,
                    name: submission.name,
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
    use crate::domains::directory::models::{NewEntry, PricingModel};
    use crate::kernel::test_dependencies::MockReviewGateway;
    use crate::kernel::{GatewayError, TestDependencies};

    #[test]
    fn wire_names_match_storage() {
        assert_eq!(wire_name(&PricingModel::Freemium).as_deref(), Some("FREEMIUM"));
    }

    #[tokio::test]
    async fn entry_review_uses_stored_fields() {
        let test_deps = TestDependencies::new()
            .mock_reviewer(MockReviewGateway::new().with_verdict(ReviewDecision::Approved, 0.9));
        let deps = test_deps.into_deps();
        let entry = test_deps
            .store
            .seed_entry(
                &NewEntry::builder()
                    .name("Foo")
                    .slug("foo")
                    .website("https://foo.ai")
                    .short_description("Autonomous QA agent")
                    .description("")
                    .pricing_model(PricingModel::Paid)
                    .categories(vec!["Developer Tools".to_string()])
                    .build(),
            )
            .await
            .unwrap();

        let result = review_entry(entry.id, &deps).await.unwrap();

        assert_eq!(result.decision, ReviewDecision::Approved);
        assert!(test_deps.reviewer.was_called_with("**Short Description:** Autonomous QA agent"));
        assert!(test_deps.reviewer.was_called_with("**Category:** Developer Tools"));
        assert!(test_deps.reviewer.was_called_with("**Pricing:** PAID"));
        assert!(!test_deps.reviewer.was_called_with("**Full Description:**"));
        assert!(!test_deps.reviewer.was_called_with("RAW MARKDOWN"));
    }

    #[tokio::test]
    async fn gateway_errors_become_needs_review() {
        let test_deps = TestDependencies::new().mock_reviewer(
            MockReviewGateway::new().with_error(GatewayError::Network("reset".into())),
        );
        let deps = test_deps.into_deps();

        let result = classify_candidate("Foo", "https://foo.ai", None, None, &deps).await;

        assert_eq!(result.decision, ReviewDecision::NeedsReview);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.flags, vec!["review_error"]);
        assert_eq!(
            result.reasoning,
            "Review failed due to error: network error: reset"
        );
    }
}
