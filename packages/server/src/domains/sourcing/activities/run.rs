//! Sourcing runs - discover, classify, dedup and create pending submissions
//! with a run record for every execution.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::common::text::truncate_chars;
use crate::common::SubmissionId;
use crate::domains::enrichment::activities::enrich_submissions;
use crate::domains::sourcing::models::{DiscoveredCandidate, RunOutcome, SourcingRun};
use crate::domains::sourcing::sources::SourcePlugin;
use crate::domains::submissions::activities::intake::{NAME_MAX, WEBSITE_MAX};
use crate::domains::submissions::models::{NewSubmission, SourcingMetadata, SubmissionSource};
use crate::domains::url_filters::{DedupSet, UrlClassification};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub limit: usize,
    /// Enrich the new submissions right after the run is finalized.
    pub auto_enrich: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            auto_enrich: false,
        }
    }
}

/// Runs one source plugin end to end and returns the finalized run.
///
/// A discovery error is recorded on the run, not returned. Only failures to
/// read or write the run record itself are errors.
pub async fn run_source(
    source: &dyn SourcePlugin,
    options: RunOptions,
    actor: Option<&str>,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<SourcingRun> {
    let run = deps
        .store
        .start_sourcing_run(source.source_id(), &source.config(), actor)
        .await?;
    execute_run(run, source, options, cancel, deps).await
}

async fn execute_run(
    run: SourcingRun,
    source: &dyn SourcePlugin,
    options: RunOptions,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<SourcingRun> {
    let source_id = source.source_id();
    info!(run_id = %run.id, source_id = %source_id, limit = options.limit, "Sourcing run started");

    let mut outcome = RunOutcome::default();

    match source.discover(options.limit).await {
        Ok(candidates) => {
            outcome.discovered = candidates.len();
            if let Err(e) = process_candidates(candidates, &mut outcome, cancel, deps).await {
                error!(run_id = %run.id, error = %e, "Sourcing run aborted");
                outcome.error = Some(e.to_string());
            }
        }
        Err(e) => {
            error!(run_id = %run.id, source_id = %source_id, error = %e, "Discovery failed");
            outcome.error = Some(e.to_string());
        }
    }

    let run = finish_run(&run, &outcome, deps).await?;
    info!(
        run_id = %run.id,
        discovered = run.discovered_count,
        created = run.new_count,
        blocked = run.blocked_count,
        duplicates = run.duplicate_count,
        success = run.success,
        "Sourcing run finished"
    );

    if options.auto_enrich && !outcome.created.is_empty() && !cancel.is_cancelled() {
        // Best effort: the run is already final.
        match enrich_submissions(Some(outcome.created.clone()), None, false, cancel, deps).await {
            Ok(result) => info!(run_id = %run.id, enriched = result.items.len(), "Auto-enrichment done"),
            Err(e) => warn!(run_id = %run.id, error = %e, "Auto-enrichment failed"),
        }
    }

    Ok(run)
}

/// Finalizes `run`. When the first write fails the same run is finalized
/// once more as failed, keeping the counts of what was created.
async fn finish_run(run: &SourcingRun, outcome: &RunOutcome, deps: &ServerDeps) -> Result<SourcingRun> {
    match deps.store.finish_sourcing_run(run, outcome).await {
        Ok(run) => Ok(run),
        Err(e) => {
            error!(run_id = %run.id, error = %e, "Failed to finalize sourcing run, retrying as failed");
            let failed = RunOutcome {
                error: Some(format!("Failed to finalize run: {}", e)),
                ..outcome.clone()
            };
            deps.store
                .finish_sourcing_run(run, &failed)
                .await
                .with_context(|| format!("Sourcing run {} could not be finalized", run.id))
        }
    }
}

/// Classify, drop blocked, claim in the dedup set, create. Cancellation
/// stops between candidates and is recorded as the run's error.
async fn process_candidates(
    candidates: Vec<DiscoveredCandidate>,
    outcome: &mut RunOutcome,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<()> {
    let dedup = DedupSet::seeded(deps.store.occupied_websites().await?);

    for candidate in candidates {
        if cancel.is_cancelled() {
            anyhow::bail!(
                "Cancelled after {} of {} candidates",
                outcome.created.len() + outcome.skipped(),
                outcome.discovered
            );
        }

        let classification = deps.classifier.classify(&candidate.website);
        if classification == UrlClassification::Blocked {
            let reason = deps.classifier.block_reason(&candidate.website);
            info!(website = %candidate.website, reason = ?reason, "Skipping blocked URL");
            outcome.blocked += 1;
            continue;
        }

        if dedup.claim(&candidate.website).is_none() {
            info!(website = %candidate.website, "Skipping duplicate");
            outcome.duplicates += 1;
            continue;
        }

        match create_submission(&candidate, classification, deps).await {
            Ok(id) => outcome.created.push(id),
            Err(e) => {
                error!(website = %candidate.website, error = %e, "Failed to create submission");
            }
        }
    }

    Ok(())
}

async fn create_submission(
    candidate: &DiscoveredCandidate,
    classification: UrlClassification,
    deps: &ServerDeps,
) -> Result<SubmissionId> {
    let mut metadata = SourcingMetadata::for_classification(classification, &candidate.source_id);
    metadata.source_url = Some(candidate.source_url.clone()).filter(|u| !u.is_empty());
    metadata.discovery = candidate.metadata.clone();

    let description = if candidate.description.is_empty() {
        format!("Discovered from {}", candidate.source_id)
    } else {
        candidate.description.clone()
    };

    let new = NewSubmission::builder()
        .name(truncate_chars(&candidate.name, NAME_MAX))
        .website(truncate_chars(&candidate.website, WEBSITE_MAX))
        .description(description)
        .source(SubmissionSource::Auto)
        .sourcing_metadata(metadata)
        .needs_manual_review(classification.needs_manual_review())
        .build();

    let submission = deps.store.insert_submission(&new).await?;
    info!(
        submission_id = %submission.id,
        name = %submission.name,
        classification = ?classification,
        "Created submission"
    );
    Ok(submission.id)
}

/// Runs every available source in turn. A source whose run cannot be
/// started gets a failed run recorded and the others still run.
pub async fn run_all(
    sources: &[Box<dyn SourcePlugin>],
    options: RunOptions,
    actor: Option<&str>,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<Vec<SourcingRun>> {
    let mut runs = Vec::new();

    for source in sources {
        if cancel.is_cancelled() {
            break;
        }
        if !source.is_available() {
            warn!(source_id = %source.source_id(), "Source not available, skipping");
            continue;
        }

        let started = deps
            .store
            .start_sourcing_run(source.source_id(), &source.config(), actor)
            .await;
        let run = match started {
            Ok(run) => run,
            Err(e) => {
                error!(source_id = %source.source_id(), error = %e, "Failed to start sourcing run");
                runs.push(record_failed_run(source.as_ref(), &e.to_string(), actor, deps).await?);
                continue;
            }
        };

        // A run that was started is finalized by execute_run itself.
        match execute_run(run, source.as_ref(), options, cancel, deps).await {
            Ok(run) => runs.push(run),
            Err(e) => error!(source_id = %source.source_id(), error = %e, "Sourcing run failed"),
        }
    }

    Ok(runs)
}

async fn record_failed_run(
    source: &dyn SourcePlugin,
    error: &str,
    actor: Option<&str>,
    deps: &ServerDeps,
) -> Result<SourcingRun> {
    let run = deps
        .store
        .start_sourcing_run(source.source_id(), &source.config(), actor)
        .await?;
    let outcome = RunOutcome {
        error: Some(error.to_string()),
        ..Default::default()
    };
    deps.store.finish_sourcing_run(&run, &outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::directory::models::{NewEntry, PricingModel};
    use crate::domains::sourcing::sources::UrlListSource;
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl SourcePlugin for FailingSource {
        fn source_id(&self) -> &str {
            "broken"
        }

        async fn discover(&self, _limit: usize) -> Result<Vec<DiscoveredCandidate>> {
            anyhow::bail!("upstream unavailable")
        }

        fn is_available(&self) -> bool {
            true
        }

        fn config(&self) -> serde_json::Value {
            serde_json::json!({})
        }
    }

    #[tokio::test]
    async fn creates_pending_submissions_for_new_urls_only() {
        let test_deps = crate::kernel::TestDependencies::new();
        let deps = test_deps.into_deps();
        test_deps
            .store
            .seed_entry(
                &NewEntry::builder()
                    .name("Listed")
                    .slug("listed")
                    .website("https://listed.ai")
                    .short_description("Already in the directory")
                    .description("")
                    .pricing_model(PricingModel::Free)
                    .categories(Vec::<String>::new())
                    .build(),
            )
            .await
            .unwrap();

        let source = UrlListSource::new([
            "https://fresh-agent.ai",
            "https://twitter.com/fresh",
            "https://www.listed.ai/",
            "fresh-agent.ai/",
            "https://github.com/acme/agent",
        ]);
        let run = run_source(
            &source,
            RunOptions::default(),
            None,
            &CancellationToken::new(),
            &deps,
        )
        .await
        .unwrap();

        assert!(run.success);
        assert_eq!(run.discovered_count, 5);
        assert_eq!(run.new_count, 2);
        assert_eq!(run.blocked_count, 1);
        assert_eq!(run.duplicate_count, 2);

        let submissions = test_deps.store.submissions().await;
        assert_eq!(submissions.len(), 2);
        assert!(submissions.iter().all(|s| s.source == SubmissionSource::Auto));

        let fresh = submissions.iter().find(|s| s.name == "Fresh Agent").unwrap();
        assert_eq!(fresh.description.as_deref(), Some("Discovered from url"));
        assert!(!fresh.needs_manual_review);

        let github = submissions
            .iter()
            .find(|s| s.website.contains("github.com"))
            .unwrap();
        assert!(github.needs_manual_review);
        assert_eq!(
            github.sourcing_metadata.as_ref().and_then(|m| m.url_classification),
            Some(UrlClassification::Github)
        );
    }

    #[tokio::test]
    async fn cancellation_is_recorded_on_the_run() {
        let deps = crate::kernel::TestDependencies::new().into_deps();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let source = UrlListSource::new(["https://a-agent.ai", "https://b-agent.ai"]);
        let run = run_source(&source, RunOptions::default(), None, &cancel, &deps)
            .await
            .unwrap();

        assert!(!run.success);
        assert_eq!(run.new_count, 0);
        assert!(run.error_message.unwrap_or_default().starts_with("Cancelled"));
    }

    #[tokio::test]
    async fn run_all_skips_unavailable_and_keeps_going() {
        let deps = crate::kernel::TestDependencies::new().into_deps();
        let sources: Vec<Box<dyn SourcePlugin>> = vec![
            Box::new(UrlListSource::new(Vec::<String>::new())),
            Box::new(FailingSource),
            Box::new(UrlListSource::new(["https://c-agent.ai"])),
        ];

        let runs = run_all(&sources, RunOptions::default(), None, &CancellationToken::new(), &deps)
            .await
            .unwrap();

        assert_eq!(runs.len(), 2);
        assert!(!runs[0].success);
        assert!(runs[1].success);
        assert_eq!(runs[1].new_count, 1);
    }

    #[tokio::test]
    async fn discovery_errors_are_recorded_on_the_run() {
        let deps = crate::kernel::TestDependencies::new().into_deps();

        let run = run_source(
            &FailingSource,
            RunOptions::default(),
            Some("cron"),
            &CancellationToken::new(),
            &deps,
        )
        .await
        .unwrap();

        assert!(!run.success);
        assert!(run.is_finished());
        assert_eq!(run.error_message.as_deref(), Some("upstream unavailable"));
        assert_eq!(run.created_by.as_deref(), Some("cron"));
        assert_eq!(run.new_count, 0);
    }

    #[tokio::test]
    async fn failed_finalization_is_retried_on_the_same_run() {
        let test_deps = crate::kernel::TestDependencies::new();
        let deps = test_deps.into_deps();
        test_deps.store.fail_run_finishes(1).await;

        let sources: Vec<Box<dyn SourcePlugin>> =
            vec![Box::new(UrlListSource::new(["https://d-agent.ai"]))];
        let runs = run_all(&sources, RunOptions::default(), None, &CancellationToken::new(), &deps)
            .await
            .unwrap();

        assert_eq!(runs.len(), 1);
        let stored = test_deps.store.runs().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, runs[0].id);
        assert!(stored[0].is_finished());
        assert!(!stored[0].success);
        assert_eq!(stored[0].new_count, 1);
        assert!(stored[0]
            .error_message
            .as_deref()
            .unwrap_or_default()
            .starts_with("Failed to finalize run"));
    }

    #[tokio::test]
    async fn unfinalizable_run_is_not_recorded_twice() {
        let test_deps = crate::kernel::TestDependencies::new();
        let deps = test_deps.into_deps();
        test_deps.store.fail_run_finishes(2).await;

        let sources: Vec<Box<dyn SourcePlugin>> = vec![
            Box::new(UrlListSource::new(["https://e-agent.ai"])),
            Box::new(UrlListSource::new(["https://f-agent.ai"])),
        ];
        let runs = run_all(&sources, RunOptions::default(), None, &CancellationToken::new(), &deps)
            .await
            .unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(test_deps.store.runs().await.len(), 2);
        assert!(runs[0].success);
    }
}
