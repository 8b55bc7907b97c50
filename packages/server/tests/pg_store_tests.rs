//! Postgres store tests.
//!
//! The harness starts Postgres with testcontainers, so a Docker daemon must be
//! reachable: `cargo test -p directory-server --test pg_store_tests`

mod common;

use crate::common::harness::TestHarness;
use crate::common::{create_enriched, create_reviewed, product_content, unique};
use directory_core::domains::review::models::ReviewDecision;
use directory_core::domains::sourcing::activities::{run_source, RunOptions};
use directory_core::domains::sourcing::sources::UrlListSource;
use directory_core::domains::submissions::activities::{
    approve_submission, approve_submissions, reopen_submission, reject_submission,
    ApprovalOutcome,
};
use directory_core::domains::submissions::models::SubmissionStatus;
use directory_core::kernel::TestDependencies;
use test_context::test_context;
use tokio_util::sync::CancellationToken;

#[test_context(TestHarness)]
#[tokio::test]
async fn approval_persists_entry_and_links_submission(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let name = unique("Pg Agent");
    let website = format!("https://{}.ai", unique("pg-agent"));
    let submission = create_enriched(&deps, &name, &website).await.unwrap();

    let outcome = approve_submission(submission.id, "alice", None, &deps)
        .await
        .unwrap();

    let ApprovalOutcome::Approved(entry) = outcome else {
        panic!("expected approval, got {:?}", outcome);
    };
    assert_eq!(entry.name, name);
    assert_eq!(entry.categories, vec!["Task Automation"]);
    assert_eq!(entry.features, vec!["Autonomous task execution"]);

    let stored = deps.store.find_submission(submission.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Approved);
    assert_eq!(stored.entry_id, Some(entry.id));

    let again = deps.store.find_entry(entry.id).await.unwrap().unwrap();
    assert_eq!(again.slug, entry.slug);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn approval_without_open_source_flag_publishes(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let website = format!("https://{}.ai", unique("closed"));
    let submission = create_enriched(&deps, &unique("Closed Agent"), &website)
        .await
        .unwrap();
    assert_eq!(product_content("AI operations agent").is_open_source, None);

    let outcome = approve_submission(submission.id, "alice", None, &deps)
        .await
        .unwrap();

    let ApprovalOutcome::Approved(entry) = outcome else {
        panic!("expected approval, got {:?}", outcome);
    };
    assert_eq!(entry.is_open_source, None);
    let stored = deps.store.find_entry(entry.id).await.unwrap().unwrap();
    assert_eq!(stored.is_open_source, None);
    assert_eq!(stored.sort_order, 10);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn entry_columns_default_for_bare_inserts(ctx: &TestHarness) {
    let host = unique("bare");
    let (sort_order, is_open_source): (i32, Option<bool>) = sqlx::query_as(
        "INSERT INTO entries (id, name, slug, website, normalized_website)
         VALUES (gen_random_uuid(), $1, $1, $2, $3)
         RETURNING sort_order, is_open_source",
    )
    .bind(&host)
    .bind(format!("https://{}.ai", host))
    .bind(format!("{}.ai", host))
    .fetch_one(&ctx.db_pool)
    .await
    .unwrap();

    assert_eq!(sort_order, 10);
    assert_eq!(is_open_source, None);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_approvals_publish_once(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let host = unique("race");
    let first = create_enriched(&deps, &unique("Race"), &format!("https://{}.ai", host))
        .await
        .unwrap();
    let second = create_enriched(&deps, &unique("Race"), &format!("https://www.{}.ai/", host))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        approve_submission(first.id, "alice", None, &deps),
        approve_submission(second.id, "bob", None, &deps),
    );
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, ApprovalOutcome::Approved(_)))
            .count(),
        1
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(o, ApprovalOutcome::Conflict(_)))
            .count(),
        1
    );
}

#[test_context(TestHarness)]
#[tokio::test]
async fn batch_approval_with_ids_ignores_ai_decision(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let approved = create_reviewed(
        &deps,
        &unique("Yes"),
        &format!("https://{}.ai", unique("yes")),
        ReviewDecision::Approved,
        0.9,
    )
    .await
    .unwrap();
    let rejected = create_reviewed(
        &deps,
        &unique("No"),
        &format!("https://{}.ai", unique("no")),
        ReviewDecision::Rejected,
        0.9,
    )
    .await
    .unwrap();

    let ids = vec![approved.id, rejected.id];
    let result = approve_submissions(Some(ids), None, "alice", &CancellationToken::new(), &deps)
        .await
        .unwrap();

    assert_eq!(result.approved(), 2);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn reject_and_reopen_round_trip(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let submission = create_enriched(&deps, &unique("Flip"), &format!("https://{}.ai", unique("flip")))
        .await
        .unwrap();

    let rejected = reject_submission(submission.id, "alice", Some("Not an agent".into()), &deps)
        .await
        .unwrap();
    assert_eq!(rejected.status, SubmissionStatus::Rejected);
    assert_eq!(rejected.reviewer_notes.as_deref(), Some("Not an agent"));

    let reopened = reopen_submission(submission.id, "admin", None, &deps).await.unwrap();
    assert_eq!(reopened.status, SubmissionStatus::Pending);
    assert_eq!(reopened.entry_id, None);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn sourcing_run_is_recorded(ctx: &TestHarness) {
    let deps = ctx.deps(&TestDependencies::new());
    let website = format!("https://{}.ai", unique("sourced"));
    let source = UrlListSource::new([website.clone(), website.clone()]);

    let run = run_source(
        &source,
        RunOptions::default(),
        Some("cron"),
        &CancellationToken::new(),
        &deps,
    )
    .await
    .unwrap();

    assert!(run.success);
    assert_eq!(run.discovered_count, 2);
    assert_eq!(run.new_count, 1);
    assert_eq!(run.duplicate_count, 1);
    assert_eq!(run.created_by.as_deref(), Some("cron"));

    let recent = deps.store.recent_sourcing_runs(20).await.unwrap();
    assert!(recent.iter().any(|r| r.id == run.id && r.completed_at.is_some()));
}
