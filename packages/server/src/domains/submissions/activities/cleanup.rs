//! Re-classification of pending auto-sourced submissions against the
//! current URL filters.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::common::{PipelineError, SubmissionId};
use crate::domains::enrichment::activities::scrape::extract_product_url;
use crate::domains::submissions::models::{
    ReviewStamp, Submission, SubmissionFilter, SubmissionSource,
};
use crate::domains::url_filters::UrlClassification;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupOptions {
    pub dry_run: bool,
    /// Only reject blocked submissions; no aggregator extraction.
    pub reject_only: bool,
    /// Only extract aggregator URLs; blocked submissions stay pending.
    pub extract_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CleanupAction {
    Rejected { reason: String },
    /// `to` is `None` in a dry run.
    Extracted { to: Option<String> },
    Flagged { classification: UrlClassification },
    Skipped,
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct CleanupItem {
    pub id: SubmissionId,
    pub name: String,
    pub website: String,
    pub action: CleanupAction,
}

#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub items: Vec<CleanupItem>,
    pub dry_run: bool,
    pub cancelled: bool,
}

impl CleanupReport {
    fn count(&self, pred: impl Fn(&CleanupAction) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.action)).count()
    }

    pub fn rejected(&self) -> usize {
        self.count(|a| matches!(a, CleanupAction::Rejected { .. }))
    }

    pub fn extracted(&self) -> usize {
        self.count(|a| matches!(a, CleanupAction::Extracted { .. }))
    }

    pub fn flagged(&self) -> usize {
        self.count(|a| matches!(a, CleanupAction::Flagged { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|a| matches!(a, CleanupAction::Skipped))
    }

    pub fn errors(&self) -> usize {
        self.count(|a| matches!(a, CleanupAction::Error { .. }))
    }
}

/// Rejects blocked URLs, resolves aggregator listings and flags GitHub and
/// non-root URLs for manual review.
pub async fn cleanup_submissions(
    options: CleanupOptions,
    actor: &str,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<CleanupReport> {
    if options.reject_only && options.extract_only {
        return Err(PipelineError::Validation(
            "Cannot use both reject-only and extract-only".into(),
        )
        .into());
    }

    let filter = SubmissionFilter {
        source: Some(SubmissionSource::Auto),
        limit: options.limit,
        ..SubmissionFilter::pending()
    };
    let submissions = deps.store.list_submissions(&filter).await?;
    info!(count = submissions.len(), dry_run = options.dry_run, "Cleaning up submissions");

    let mut report = CleanupReport {
        dry_run: options.dry_run,
        ..Default::default()
    };
    for submission in submissions {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let action = match clean_one(&submission, options, actor, deps).await {
            Ok(action) => action,
            Err(e) => {
                error!(submission_id = %submission.id, error = %e, "Cleanup failed");
                CleanupAction::Error {
                    message: e.to_string(),
                }
            }
        };
        report.items.push(CleanupItem {
            id: submission.id,
            name: submission.name,
            website: submission.website,
            action,
        });
    }

    Ok(report)
}

async fn clean_one(
    submission: &Submission,
    options: CleanupOptions,
    actor: &str,
    deps: &ServerDeps,
) -> Result<CleanupAction> {
    let classification = deps.classifier.classify(&submission.website);

    match classification {
        UrlClassification::Blocked if !options.extract_only => {
            let reason = deps
                .classifier
                .block_reason(&submission.website)
                .unwrap_or_else(|| "blocked".to_string());
            if !options.dry_run {
                let stamp = ReviewStamp::new(actor, Some(format!("Auto-rejected by cleanup: {}", reason)));
                deps.store.reject_submission(submission.id, &stamp).await?;
            }
            Ok(CleanupAction::Rejected { reason })
        }
        UrlClassification::Aggregator if !options.reject_only => {
            if options.dry_run {
                return Ok(CleanupAction::Extracted { to: None });
            }
            match extract_product_url(&submission.website, deps).await {
                Some(url) if url != submission.website => {
                    deps.store.update_submission_website(submission.id, &url).await?;
                    info!(submission_id = %submission.id, to = %url, "Aggregator URL extracted");
                    Ok(CleanupAction::Extracted { to: Some(url) })
                }
                _ => {
                    warn!(submission_id = %submission.id, "Could not extract product URL");
                    deps.store.flag_for_manual_review(submission.id, None).await?;
                    Ok(CleanupAction::Flagged { classification })
                }
            }
        }
        UrlClassification::Github | UrlClassification::NonRoot => {
            if !options.dry_run {
                let metadata = (classification == UrlClassification::Github).then(|| {
                    let mut metadata = submission.sourcing_metadata.clone().unwrap_or_default();
                    metadata.apply_classification(classification);
                    metadata
                });
                deps.store
                    .flag_for_manual_review(submission.id, metadata.as_ref())
                    .await?;
            }
            Ok(CleanupAction::Flagged { classification })
        }
        _ => Ok(CleanupAction::Skipped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::submissions::models::{NewSubmission, SourcingMetadata, SubmissionStatus};
    use crate::kernel::TestDependencies;

    async fn auto(deps: &ServerDeps, website: &str) -> Submission {
        deps.store
            .insert_submission(
                &NewSubmission::builder()
                    .name(website)
                    .website(website)
                    .source(SubmissionSource::Auto)
                    .sourcing_metadata(SourcingMetadata::default())
                    .build(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn dry_run_changes_nothing() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.into_deps();
        auto(&deps, "https://medium.com/@x/agents").await;
        auto(&deps, "https://github.com/foo/bar").await;
        auto(&deps, "https://foo.ai").await;

        let options = CleanupOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = cleanup_submissions(options, "admin", &CancellationToken::new(), &deps)
            .await
            .unwrap();

        assert_eq!(report.rejected(), 1);
        assert_eq!(report.flagged(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(test_deps
            .store
            .submissions()
            .await
            .iter()
            .all(|s| s.status == SubmissionStatus::Pending && !s.needs_manual_review));
    }

    #[tokio::test]
    async fn blocked_rejected_and_github_flagged() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.into_deps();
        let blocked = auto(&deps, "https://medium.com/@x/agents").await;
        let github = auto(&deps, "https://github.com/foo/bar").await;

        let report = cleanup_submissions(
            CleanupOptions::default(),
            "admin",
            &CancellationToken::new(),
            &deps,
        )
        .await
        .unwrap();
        assert_eq!(report.rejected(), 1);

        let blocked = deps.store.find_submission(blocked.id).await.unwrap().unwrap();
        assert_eq!(blocked.status, SubmissionStatus::Rejected);
        assert!(blocked
            .reviewer_notes
            .unwrap()
            .starts_with("Auto-rejected by cleanup: "));

        let github = deps.store.find_submission(github.id).await.unwrap().unwrap();
        assert!(github.needs_manual_review);
        assert!(github.sourcing_metadata.unwrap().potential_open_source);
    }

    #[tokio::test]
    async fn conflicting_modes_are_refused() {
        let deps = TestDependencies::new().into_deps();
        let options = CleanupOptions {
            reject_only: true,
            extract_only: true,
            ..Default::default()
        };
        assert!(cleanup_submissions(options, "admin", &CancellationToken::new(), &deps)
            .await
            .is_err());
    }
}
