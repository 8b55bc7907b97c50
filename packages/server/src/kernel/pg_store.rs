//! Postgres implementation of the directory store.
//!
//! All SQL lives in the domain models; this type only wires the models to
//! the store trait and owns the transaction boundaries.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::traits::{ApprovalTransaction, BaseDirectoryStore};
use crate::common::{EntryId, SubmissionId};
use crate::domains::directory::models::{
    DuplicateConflict, EnrichmentLog, Entry, EntryFilter, EntryUpdate, NewEnrichmentLog, NewEntry,
};
use crate::domains::enrichment::models::EnrichmentSnapshot;
use crate::domains::review::models::ReviewResult;
use crate::domains::sourcing::models::{RunOutcome, SourcingRun};
use crate::domains::submissions::models::{
    NewSubmission, ReviewStamp, SourcingMetadata, Submission, SubmissionFilter,
};

/// Advisory lock serializing entry creation across approvals, so the
/// duplicate check and the insert cannot interleave.
const APPROVAL_LOCK_KEY: i64 = 0x0A9E_D1EC;

#[derive(Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

struct PgApprovalTransaction {
    tx: Transaction<'static, Postgres>,
    submission: Submission,
}

#[async_trait]
impl ApprovalTransaction for PgApprovalTransaction {
    fn submission(&self) -> &Submission {
        &self.submission
    }

    async fn find_conflict(
        &mut self,
        website: &str,
        name: &str,
        slug: &str,
    ) -> Result<Option<DuplicateConflict>> {
        Entry::find_conflict(website, name, slug, &mut self.tx).await
    }

    async fn insert_entry(&mut self, entry: &NewEntry) -> Result<Entry> {
        Entry::insert(entry, &mut self.tx).await
    }

    async fn mark_approved(
        &mut self,
        entry_id: EntryId,
        stamp: &ReviewStamp,
        review: Option<&ReviewResult>,
    ) -> Result<Submission> {
        let submission =
            Submission::mark_approved(self.submission.id, entry_id, stamp, review, &mut self.tx)
                .await?;
        self.submission = submission.clone();
        Ok(submission)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl BaseDirectoryStore for PgDirectoryStore {
    async fn insert_submission(&self, submission: &NewSubmission) -> Result<Submission> {
        Submission::insert(submission, &self.pool).await
    }

    async fn find_submission(&self, id: SubmissionId) -> Result<Option<Submission>> {
        Submission::find_by_id(id, &self.pool).await
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        Submission::find_filtered(filter, &self.pool).await
    }

    async fn update_submission_website(&self, id: SubmissionId, website: &str) -> Result<()> {
        Submission::update_website(id, website, &self.pool).await
    }

    async fn save_enrichment(
        &self,
        id: SubmissionId,
        snapshot: &EnrichmentSnapshot,
        logo_path: Option<&str>,
        screenshot_path: Option<&str>,
    ) -> Result<()> {
        Submission::save_enrichment(id, snapshot, logo_path, screenshot_path, &self.pool).await
    }

    async fn save_review(
        &self,
        id: SubmissionId,
        review: &ReviewResult,
        needs_manual_review: bool,
    ) -> Result<()> {
        Submission::save_review(id, review, needs_manual_review, &self.pool).await
    }

    async fn flag_for_manual_review(
        &self,
        id: SubmissionId,
        metadata: Option<&SourcingMetadata>,
    ) -> Result<()> {
        Submission::flag_for_manual_review(id, metadata, &self.pool).await
    }

    async fn reject_submission(
        &self,
        id: SubmissionId,
        stamp: &ReviewStamp,
    ) -> Result<Option<Submission>> {
        Submission::reject(id, stamp, &self.pool).await
    }

    async fn reopen_submission(
        &self,
        id: SubmissionId,
        stamp: &ReviewStamp,
    ) -> Result<Option<Submission>> {
        Submission::reopen(id, stamp, &self.pool).await
    }

    async fn begin_approval(&self, id: SubmissionId) -> Result<Option<Box<dyn ApprovalTransaction>>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPROVAL_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        match Submission::lock_for_update(id, &mut tx).await? {
            Some(submission) => Ok(Some(Box::new(PgApprovalTransaction { tx, submission }))),
            None => Ok(None),
        }
    }

    async fn occupied_websites(&self) -> Result<Vec<String>> {
        Submission::occupied_websites(&self.pool).await
    }

    async fn find_entry(&self, id: EntryId) -> Result<Option<Entry>> {
        Entry::find_by_id(id, &self.pool).await
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        Entry::find_filtered(filter, &self.pool).await
    }

    async fn apply_entry_enrichment(
        &self,
        id: EntryId,
        update: &EntryUpdate,
        log: &NewEnrichmentLog,
    ) -> Result<(Entry, EnrichmentLog)> {
        let mut tx = self.pool.begin().await?;
        let entry = Entry::apply_update(id, update, &mut tx).await?;
        let log = EnrichmentLog::insert(log, &mut tx).await?;
        tx.commit().await?;
        Ok((entry, log))
    }

    async fn insert_enrichment_log(&self, log: &NewEnrichmentLog) -> Result<EnrichmentLog> {
        let mut conn = self.pool.acquire().await?;
        EnrichmentLog::insert(log, &mut conn).await
    }

    async fn enrichment_logs(&self, entry_id: EntryId) -> Result<Vec<EnrichmentLog>> {
        EnrichmentLog::find_by_entry(entry_id, &self.pool).await
    }

    async fn start_sourcing_run(
        &self,
        source_id: &str,
        config: &serde_json::Value,
        created_by: Option<&str>,
    ) -> Result<SourcingRun> {
        SourcingRun::start(source_id, config, created_by, &self.pool).await
    }

    async fn finish_sourcing_run(
        &self,
        run: &SourcingRun,
        outcome: &RunOutcome,
    ) -> Result<SourcingRun> {
        SourcingRun::finalize(run.id, outcome, &self.pool).await
    }

    async fn recent_sourcing_runs(&self, limit: i64) -> Result<Vec<SourcingRun>> {
        SourcingRun::find_recent(limit, &self.pool).await
    }
}
