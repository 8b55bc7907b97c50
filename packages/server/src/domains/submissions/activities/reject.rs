use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::approve::ensure_pending;
use crate::common::{PipelineError, SubmissionId};
use crate::domains::review::models::ReviewDecision;
use crate::domains::submissions::models::{
    ReviewStamp, Submission, SubmissionFilter, SubmissionStatus,
};
use crate::kernel::ServerDeps;

/// Rejects a pending submission.
pub async fn reject_submission(
    id: SubmissionId,
    actor: &str,
    notes: Option<String>,
    deps: &ServerDeps,
) -> Result<Submission> {
    reject_with_stamp(id, ReviewStamp::new(actor, notes), deps).await
}

pub(crate) async fn reject_with_stamp(
    id: SubmissionId,
    stamp: ReviewStamp,
    deps: &ServerDeps,
) -> Result<Submission> {
    let submission = deps
        .store
        .find_submission(id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Submission", id))?;
    ensure_pending(&submission, "reject")?;

    // The store re-checks the status, so a concurrent transition still wins.
    let rejected = deps.store.reject_submission(id, &stamp).await?;
    match rejected {
        Some(rejected) => {
            info!(submission_id = %id, reviewer = %stamp.reviewer, "Submission rejected");
            Ok(rejected)
        }
        None => Err(transition_lost(id, "reject", deps).await),
    }
}

/// Administrative override: puts a rejected submission back into pending.
pub async fn reopen_submission(
    id: SubmissionId,
    actor: &str,
    notes: Option<String>,
    deps: &ServerDeps,
) -> Result<Submission> {
    let submission = deps
        .store
        .find_submission(id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Submission", id))?;

    if submission.status != SubmissionStatus::Rejected {
        return Err(PipelineError::InvalidTransition {
            name: submission.name,
            action: "reopen",
            status: submission.status.to_string(),
        }
        .into());
    }

    let notes = notes.or_else(|| Some("Reopened".to_string()));
    match deps.store.reopen_submission(id, &ReviewStamp::new(actor, notes)).await? {
        Some(reopened) => {
            info!(submission_id = %id, actor, "Submission reopened");
            Ok(reopened)
        }
        None => Err(transition_lost(id, "reopen", deps).await),
    }
}

async fn transition_lost(id: SubmissionId, action: &'static str, deps: &ServerDeps) -> anyhow::Error {
    match deps.store.find_submission(id).await {
        Ok(Some(current)) => PipelineError::InvalidTransition {
            name: current.name,
            action,
            status: current.status.to_string(),
        }
        .into(),
        Ok(None) => PipelineError::not_found("Submission", id).into(),
        Err(e) => e,
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchRejectionResult {
    pub rejected: Vec<Submission>,
    pub errors: Vec<(SubmissionId, String)>,
    pub cancelled: bool,
}

/// Rejects the given pending submissions, or every pending submission the
/// AI review rejected when `ids` is `None`.
pub async fn reject_submissions(
    ids: Option<Vec<SubmissionId>>,
    limit: Option<i64>,
    actor: &str,
    notes: Option<String>,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<BatchRejectionResult> {
    let filter = SubmissionFilter {
        ai_decision: ids.is_none().then_some(ReviewDecision::Rejected),
        ids,
        limit,
        ..SubmissionFilter::pending()
    };
    let submissions = deps.store.list_submissions(&filter).await?;
    info!(count = submissions.len(), actor, "Rejecting submissions");

    let mut result = BatchRejectionResult::default();
    for submission in submissions {
        if cancel.is_cancelled() {
            result.cancelled = true;
            break;
        }

        let notes = notes.clone().or_else(|| {
            submission
                .ai_review_result
                .as_ref()
                .map(|r| format!("AI review: {}", r.reasoning))
        });
        match reject_submission(submission.id, actor, notes, deps).await {
            Ok(rejected) => result.rejected.push(rejected),
            Err(e) => {
                error!(submission_id = %submission.id, error = %e, "Failed to reject submission");
                result.errors.push((submission.id, e.to_string()));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::submissions::models::{NewSubmission, SubmissionSource};
    use crate::kernel::TestDependencies;

    async fn pending(deps: &ServerDeps) -> Submission {
        deps.store
            .insert_submission(
                &NewSubmission::builder()
                    .name("Foo")
                    .website("https://foo.ai")
                    .source(SubmissionSource::Form)
                    .build(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reject_then_reopen_restores_pending() {
        let deps = TestDependencies::new().into_deps();
        let submission = pending(&deps).await;

        let rejected = reject_submission(submission.id, "alice", Some("Not an agent".into()), &deps)
            .await
            .unwrap();
        assert_eq!(rejected.status, SubmissionStatus::Rejected);
        assert_eq!(rejected.reviewed_by.as_deref(), Some("alice"));
        assert_eq!(rejected.reviewer_notes.as_deref(), Some("Not an agent"));
        assert!(rejected.reviewed_at.is_some());

        let again = reject_submission(submission.id, "alice", None, &deps).await;
        let err = again.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidTransition { action: "reject", .. })
        ));

        let reopened = reopen_submission(submission.id, "admin", None, &deps).await.unwrap();
        assert_eq!(reopened.status, SubmissionStatus::Pending);
        assert_eq!(reopened.reviewer_notes.as_deref(), Some("Reopened"));
    }

    #[tokio::test]
    async fn only_rejected_submissions_reopen() {
        let deps = TestDependencies::new().into_deps();
        let submission = pending(&deps).await;

        let err = reopen_submission(submission.id, "admin", None, &deps)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot reopen submission 'Foo': status is pending"
        );
    }
}
