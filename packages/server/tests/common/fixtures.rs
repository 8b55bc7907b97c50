//! Test fixtures for creating submissions in a given state.
//!
//! These go through the store trait so they work against both the in-memory
//! and the Postgres store.

use anyhow::Result;
use chrono::Utc;
use directory_core::domains::enrichment::models::{EnrichmentSnapshot, ExtractedContent};
use directory_core::domains::review::models::{ReviewDecision, ReviewResult, ReviewVerdict};
use directory_core::domains::submissions::models::{NewSubmission, Submission, SubmissionSource};
use directory_core::kernel::ServerDeps;

/// Short random suffix so shared-database tests do not collide.
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

pub fn product_content(short_description: &str) -> ExtractedContent {
    ExtractedContent {
        short_description: Some(short_description.to_string()),
        description: Some(format!("{} with autonomous workflows.", short_description)),
        features: vec!["Autonomous task execution".into()],
        use_cases: vec!["Operations".into()],
        pricing_model: Some("FREEMIUM".into()),
        category: Some("Task Automation".into()),
        ..Default::default()
    }
}

/// Create a pending form submission
pub async fn create_pending(deps: &ServerDeps, name: &str, website: &str) -> Result<Submission> {
    deps.store
        .insert_submission(
            &NewSubmission::builder()
                .name(name)
                .website(website)
                .source(SubmissionSource::Form)
                .build(),
        )
        .await
}

/// Create a pending submission with successful enrichment data
pub async fn create_enriched(deps: &ServerDeps, name: &str, website: &str) -> Result<Submission> {
    let submission = create_pending(deps, name, website).await?;
    let snapshot = EnrichmentSnapshot {
        content: product_content("AI operations agent"),
        ..EnrichmentSnapshot::succeeded(website, Utc::now())
    };
    deps.store
        .save_enrichment(submission.id, &snapshot, None, None)
        .await?;
    Ok(deps
        .store
        .find_submission(submission.id)
        .await?
        .unwrap_or(submission))
}

/// Create an enriched submission that already carries an AI review
pub async fn create_reviewed(
    deps: &ServerDeps,
    name: &str,
    website: &str,
    decision: ReviewDecision,
    confidence: f64,
) -> Result<Submission> {
    let submission = create_enriched(deps, name, website).await?;
    let review = ReviewResult::from_verdict(
        ReviewVerdict {
            decision,
            is_ai_agent: decision == ReviewDecision::Approved,
            confidence,
            reasoning: format!("Fixture verdict: {}", decision),
            flags: Vec::new(),
        },
        Utc::now(),
    );
    deps.store.save_review(submission.id, &review, false).await?;
    Ok(submission)
}
