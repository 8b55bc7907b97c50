//! Approval - the only path that creates directory entries.
//!
//! Everything from the status re-check to linking the new entry happens
//! inside one `ApprovalTransaction`, so two approvals racing for the same
//! website, name or slug cannot both succeed.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::common::text::{slugify, truncate_chars};
use crate::common::{pause_between_items, PipelineError, SubmissionId};
use crate::domains::directory::models::{
    is_valid_video_url, DuplicateConflict, Entry, Industry, NewEntry, PricingModel,
};
use crate::domains::enrichment::activities::enrich_submission;
use crate::domains::enrichment::activities::media::{image_extension, stored_extension};
use crate::domains::enrichment::models::EnrichmentSnapshot;
use crate::domains::review::models::{ReviewDecision, ReviewResult};
use crate::domains::submissions::models::{
    ReviewStamp, Submission, SubmissionFilter, SubmissionStatus,
};
use crate::kernel::ServerDeps;

const SHORT_DESCRIPTION_MAX: usize = 250;

#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    Approved(Entry),
    /// An existing entry already holds the website, name or slug. Nothing
    /// was written.
    Conflict(DuplicateConflict),
}

/// Approves a pending submission on behalf of `actor`.
pub async fn approve_submission(
    id: SubmissionId,
    actor: &str,
    notes: Option<String>,
    deps: &ServerDeps,
) -> Result<ApprovalOutcome> {
    approve_with_stamp(id, ReviewStamp::new(actor, notes), None, deps).await
}

/// Approval with an explicit stamp. `review` replaces the stored review
/// result when set (auto-applied approvals record it here).
pub(crate) async fn approve_with_stamp(
    id: SubmissionId,
    stamp: ReviewStamp,
    review: Option<&ReviewResult>,
    deps: &ServerDeps,
) -> Result<ApprovalOutcome> {
    let mut submission = deps
        .store
        .find_submission(id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Submission", id))?;
    ensure_pending(&submission, "approve")?;

    if !submission.is_enriched() {
        info!(submission_id = %id, "No enrichment data, enriching before approval");
        submission = enrich_submission(id, false, deps).await?;
    }
    let snapshot = match &submission.enrichment_data {
        Some(snapshot) => snapshot.clone(),
        None => {
            return Err(PipelineError::EnrichmentRequired {
                name: submission.name.clone(),
            }
            .into())
        }
    };
    if let Some(reason) = snapshot.failure_reason() {
        return Err(PipelineError::EnrichmentFailed {
            name: submission.name.clone(),
            reason: reason.to_string(),
        }
        .into());
    }

    // Media is read before the transaction; only the copies happen inside.
    let logo = load_media(submission.logo_path.as_deref(), snapshot.logo_url.as_deref(), deps).await;
    let screenshot = load_media(
        submission.screenshot_path.as_deref(),
        snapshot.screenshot_url.as_deref(),
        deps,
    )
    .await;

    let mut tx = deps
        .store
        .begin_approval(id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Submission", id))?;
    let locked = tx.submission().clone();
    ensure_pending(&locked, "approve")?;

    let slug = entry_slug(&locked);
    if let Some(conflict) = tx.find_conflict(&locked.website, &locked.name, &slug).await? {
        info!(submission_id = %id, %conflict, "Approval blocked by existing entry");
        return Ok(ApprovalOutcome::Conflict(conflict));
    }

    // Anything uploaded here is removed again if the transaction does not commit.
    let mut uploaded = Vec::new();
    let committed = async {
        let mut logo_path = None;
        if let Some(media) = logo {
            let key = format!("agents/logos/{}{}", slug, media.extension);
            let path = deps.media_store.put(&key, &media.bytes).await?;
            uploaded.push(path.clone());
            logo_path = Some(path);
        }
        let mut screenshots = Vec::new();
        if let Some(media) = screenshot {
            let key = format!("agents/screenshots/{}_1{}", slug, media.extension);
            let path = deps.media_store.put(&key, &media.bytes).await?;
            uploaded.push(path.clone());
            screenshots.push(path);
        }

        let new_entry = build_entry(&locked, &snapshot, slug, logo_path, screenshots);
        let entry = tx
            .insert_entry(&new_entry)
            .await
            .with_context(|| format!("Failed to create entry for submission {}", id))?;
        tx.mark_approved(entry.id, &stamp, review).await?;
        tx.commit().await?;
        Ok::<_, anyhow::Error>(entry)
    }
    .await;

    let entry = match committed {
        Ok(entry) => entry,
        Err(e) => {
            discard_media(&uploaded, deps).await;
            return Err(e);
        }
    };

    info!(
        submission_id = %id,
        entry_id = %entry.id,
        reviewer = %stamp.reviewer,
        "Submission approved"
    );

    for hook in &deps.publish_hooks {
        if let Err(e) = hook.entry_published(&entry).await {
            error!(entry_id = %entry.id, error = %e, "Post-approval hook failed");
        }
    }

    Ok(ApprovalOutcome::Approved(entry))
}

pub(crate) fn ensure_pending(submission: &Submission, action: &'static str) -> Result<(), PipelineError> {
    if submission.status == SubmissionStatus::Pending {
        return Ok(());
    }
    Err(PipelineError::InvalidTransition {
        name: submission.name.clone(),
        action,
        status: submission.status.to_string(),
    })
}

/// Slug for the new entry. Names with nothing sluggable get a short id
/// suffix so the slug is never empty.
fn entry_slug(submission: &Submission) -> String {
    let slug = slugify(&submission.name);
    if !slug.is_empty() {
        return slug;
    }
    let id = submission.id.as_uuid().simple().to_string();
    format!("agent-{}", &id[id.len() - 8..])
}

async fn discard_media(paths: &[String], deps: &ServerDeps) {
    for path in paths {
        if let Err(e) = deps.media_store.delete(path).await {
            warn!(path = %path, error = %e, "Failed to remove media of an aborted approval");
        }
    }
}

struct LoadedMedia {
    bytes: Vec<u8>,
    extension: String,
}

/// Local copy first. The remote URL is only tried when no local copy exists,
/// and a failure there just means the entry has no such media.
async fn load_media(
    local_path: Option<&str>,
    remote_url: Option<&str>,
    deps: &ServerDeps,
) -> Option<LoadedMedia> {
    if let Some(path) = local_path {
        match deps.media_store.read(path).await {
            Ok(bytes) => {
                return Some(LoadedMedia {
                    bytes,
                    extension: stored_extension(path),
                })
            }
            Err(e) => warn!(path, error = %e, "Stored media unreadable"),
        }
        return None;
    }

    let url = remote_url?;
    match deps.media_fetcher.fetch(url).await {
        Ok(media) => Some(LoadedMedia {
            extension: image_extension(url, media.content_type.as_deref()).to_string(),
            bytes: media.bytes,
        }),
        Err(e) => {
            warn!(url, error = %e, "Media download failed during approval");
            None
        }
    }
}

fn build_entry(
    submission: &Submission,
    snapshot: &EnrichmentSnapshot,
    slug: String,
    logo_path: Option<String>,
    screenshots: Vec<String>,
) -> NewEntry {
    let content = &snapshot.content;
    let submitted = submission.description.clone().unwrap_or_default();

    let short_description = content
        .short_description
        .clone()
        .unwrap_or_else(|| submitted.clone());
    let description = content.description.clone().unwrap_or(submitted);

    NewEntry::builder()
        .name(submission.name.trim())
        .slug(slug)
        .website(submission.website.clone())
        .short_description(truncate_chars(&short_description, SHORT_DESCRIPTION_MAX))
        .description(description)
        .pricing_model(
            content
                .pricing_model
                .as_deref()
                .and_then(PricingModel::from_extracted)
                .unwrap_or_default(),
        )
        .industry(
            content
                .industry
                .as_deref()
                .and_then(Industry::from_extracted)
                .unwrap_or_default(),
        )
        .is_open_source(content.is_open_source)
        .twitter_url(content.twitter_url.clone())
        .linkedin_url(content.linkedin_url.clone())
        .demo_video_url(
            content
                .demo_video_url
                .clone()
                .filter(|url| is_valid_video_url(url)),
        )
        .logo_path(logo_path)
        .categories(content.category.iter().cloned().collect::<Vec<_>>())
        .features(content.features.clone())
        .use_cases(content.use_cases.clone())
        .screenshots(screenshots)
        .build()
}

/// Per-submission result of a batch approval.
#[derive(Debug, Clone)]
pub enum BatchApproval {
    Approved { id: SubmissionId, entry: Entry },
    /// Duplicate of an existing entry; the submission was rejected instead.
    AutoRejected { id: SubmissionId, conflict: DuplicateConflict },
    Error { id: SubmissionId, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct BatchApprovalResult {
    pub items: Vec<BatchApproval>,
    pub cancelled: bool,
}

impl BatchApprovalResult {
    pub fn approved(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, BatchApproval::Approved { .. }))
            .count()
    }

    pub fn auto_rejected(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, BatchApproval::AutoRejected { .. }))
            .count()
    }

    pub fn errors(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, BatchApproval::Error { .. }))
            .count()
    }
}

/// Approves the given pending submissions, or every pending submission the
/// AI review approved when `ids` is `None`.
///
/// A duplicate is rejected with a note naming the existing entry.
pub async fn approve_submissions(
    ids: Option<Vec<SubmissionId>>,
    limit: Option<i64>,
    actor: &str,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<BatchApprovalResult> {
    let filter = SubmissionFilter {
        ai_decision: ids.is_none().then_some(ReviewDecision::Approved),
        ids,
        limit,
        ..SubmissionFilter::pending()
    };
    let submissions = deps.store.list_submissions(&filter).await?;
    info!(count = submissions.len(), actor, "Approving submissions");

    let mut result = BatchApprovalResult::default();
    for (index, submission) in submissions.into_iter().enumerate() {
        if index > 0 && !pause_between_items(deps.settings.batch_delay, cancel).await {
            result.cancelled = true;
            break;
        }

        let id = submission.id;
        let item = match approve_submission(id, actor, None, deps).await {
            Ok(ApprovalOutcome::Approved(entry)) => BatchApproval::Approved { id, entry },
            Ok(ApprovalOutcome::Conflict(conflict)) => {
                let stamp = ReviewStamp::new(actor, Some(format!("Auto-rejected: {}", conflict)));
                match deps.store.reject_submission(id, &stamp).await {
                    Ok(_) => BatchApproval::AutoRejected { id, conflict },
                    Err(e) => BatchApproval::Error {
                        id,
                        message: e.to_string(),
                    },
                }
            }
            Err(e) => {
                error!(submission_id = %id, error = %e, "Failed to approve submission");
                BatchApproval::Error {
                    id,
                    message: e.to_string(),
                }
            }
        };
        result.items.push(item);
    }

    Ok(result)
}
