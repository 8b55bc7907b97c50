//! In-memory directory store.
//!
//! Same contract as the Postgres store. The approval transaction holds the
//! state lock for its whole lifetime and works on a copy that only replaces
//! the shared state on commit.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::traits::{ApprovalTransaction, BaseDirectoryStore};
use crate::common::{EntryId, SubmissionId};
use crate::domains::directory::models::{
    find_conflict, DuplicateConflict, EnrichmentLog, Entry, EntryFilter, EntryScreenshot,
    EntryUpdate, NewEnrichmentLog, NewEntry,
};
use crate::domains::enrichment::models::EnrichmentSnapshot;
use crate::domains::review::models::ReviewResult;
use crate::domains::sourcing::models::{RunOutcome, SourcingRun};
use crate::domains::submissions::models::{
    NewSubmission, ReviewStamp, SourcingMetadata, Submission, SubmissionFilter, SubmissionStatus,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    submissions: Vec<Submission>,
    entries: Vec<Entry>,
    logs: Vec<EnrichmentLog>,
    runs: Vec<SourcingRun>,
    /// Number of upcoming `finish_sourcing_run` calls that fail.
    failing_run_finishes: usize,
}

impl MemoryState {
    fn submission_mut(&mut self, id: SubmissionId) -> Option<&mut Submission> {
        self.submissions.iter_mut().find(|s| s.id == id)
    }

    fn insert_entry(&mut self, new: &NewEntry) -> Result<Entry> {
        if let Some(conflict) = find_conflict(&self.entries, &new.website, &new.name, &new.slug) {
            bail!("unique constraint violated: {}", conflict);
        }

        let mut categories: Vec<String> = Vec::new();
        for name in &new.categories {
            let name = name.trim().to_string();
            if !categories.iter().any(|c| c.eq_ignore_ascii_case(&name)) {
                categories.push(name);
            }
        }

        let now = Utc::now();
        let entry = Entry {
            id: EntryId::new(),
            name: new.name.clone(),
            slug: new.slug.clone(),
            website: new.website.clone(),
            short_description: new.short_description.clone(),
            description: new.description.clone(),
            pricing_model: new.pricing_model,
            industry: new.industry,
            is_open_source: new.is_open_source,
            twitter_url: new.twitter_url.clone(),
            linkedin_url: new.linkedin_url.clone(),
            demo_video_url: new.demo_video_url.clone(),
            logo_path: new.logo_path.clone(),
            status: new.status,
            sort_order: new.sort_order,
            featured: false,
            categories,
            features: new.features.clone(),
            use_cases: new.use_cases.clone(),
            screenshots: new
                .screenshots
                .iter()
                .enumerate()
                .map(|(i, path)| EntryScreenshot {
                    path: path.clone(),
                    is_primary: i == 0,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }
}

#[derive(Clone, Default)]
pub struct MemoryDirectoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a published entry directly, bypassing the approval flow.
    pub async fn seed_entry(&self, entry: &NewEntry) -> Result<Entry> {
        self.state.lock().await.insert_entry(entry)
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.state.lock().await.submissions.clone()
    }

    pub async fn entries(&self) -> Vec<Entry> {
        self.state.lock().await.entries.clone()
    }

    pub async fn runs(&self) -> Vec<SourcingRun> {
        self.state.lock().await.runs.clone()
    }

    /// Make the next `count` run finalizations fail, as a lost connection would.
    pub async fn fail_run_finishes(&self, count: usize) {
        self.state.lock().await.failing_run_finishes = count;
    }
}

struct MemoryApprovalTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    submission: Submission,
}

#[async_trait]
impl ApprovalTransaction for MemoryApprovalTransaction {
    fn submission(&self) -> &Submission {
        &self.submission
    }

    async fn find_conflict(
        &mut self,
        website: &str,
        name: &str,
        slug: &str,
    ) -> Result<Option<DuplicateConflict>> {
        Ok(find_conflict(&self.working.entries, website, name, slug))
    }

    async fn insert_entry(&mut self, entry: &NewEntry) -> Result<Entry> {
        self.working.insert_entry(entry)
    }

    async fn mark_approved(
        &mut self,
        entry_id: EntryId,
        stamp: &ReviewStamp,
        review: Option<&ReviewResult>,
    ) -> Result<Submission> {
        let id = self.submission.id;
        let Some(submission) = self.working.submission_mut(id) else {
            bail!("submission {} disappeared during approval", id);
        };
        if submission.status != SubmissionStatus::Pending {
            bail!("submission {} is no longer pending", id);
        }

        submission.status = SubmissionStatus::Approved;
        submission.entry_id = Some(entry_id);
        submission.reviewed_by = Some(stamp.reviewer.clone());
        submission.reviewer_notes = stamp.notes.clone();
        submission.reviewed_at = Some(stamp.at);
        if let Some(review) = review {
            submission.ai_review_result = Some(review.clone());
        }
        submission.updated_at = Utc::now();

        self.submission = submission.clone();
        Ok(self.submission.clone())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryApprovalTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl BaseDirectoryStore for MemoryDirectoryStore {
    async fn insert_submission(&self, new: &NewSubmission) -> Result<Submission> {
        let now = Utc::now();
        let submission = Submission {
            id: SubmissionId::new(),
            name: new.name.clone(),
            website: new.website.clone(),
            description: new.description.clone(),
            email: new.email.clone(),
            source: new.source,
            status: SubmissionStatus::Pending,
            sourcing_metadata: new.sourcing_metadata.clone(),
            enrichment_data: None,
            ai_review_result: None,
            needs_manual_review: new.needs_manual_review,
            logo_path: None,
            screenshot_path: None,
            entry_id: None,
            reviewed_by: None,
            reviewer_notes: None,
            reviewed_at: None,
            submitted_at: now,
            updated_at: now,
        };
        self.state.lock().await.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn find_submission(&self, id: SubmissionId) -> Result<Option<Submission>> {
        let state = self.state.lock().await;
        Ok(state.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        let state = self.state.lock().await;
        let matching = state.submissions.iter().filter(|s| filter.matches(s)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit.max(0) as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn update_submission_website(&self, id: SubmissionId, website: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(submission) = state.submission_mut(id) {
            submission.website = website.to_string();
            submission.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn save_enrichment(
        &self,
        id: SubmissionId,
        snapshot: &EnrichmentSnapshot,
        logo_path: Option<&str>,
        screenshot_path: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(submission) = state.submission_mut(id) {
            submission.enrichment_data = Some(snapshot.clone());
            if let Some(path) = logo_path {
                submission.logo_path = Some(path.to_string());
            }
            if let Some(path) = screenshot_path {
                submission.screenshot_path = Some(path.to_string());
            }
            submission.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn save_review(
        &self,
        id: SubmissionId,
        review: &ReviewResult,
        needs_manual_review: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(submission) = state.submission_mut(id) {
            submission.ai_review_result = Some(review.clone());
            submission.needs_manual_review = needs_manual_review;
            submission.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn flag_for_manual_review(
        &self,
        id: SubmissionId,
        metadata: Option<&SourcingMetadata>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(submission) = state.submission_mut(id) {
            submission.needs_manual_review = true;
            if let Some(metadata) = metadata {
                submission.sourcing_metadata = Some(metadata.clone());
            }
            submission.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reject_submission(
        &self,
        id: SubmissionId,
        stamp: &ReviewStamp,
    ) -> Result<Option<Submission>> {
        let mut state = self.state.lock().await;
        Ok(state
            .submission_mut(id)
            .filter(|s| s.status == SubmissionStatus::Pending)
            .map(|submission| {
                submission.status = SubmissionStatus::Rejected;
                submission.reviewed_by = Some(stamp.reviewer.clone());
                submission.reviewer_notes = stamp.notes.clone();
                submission.reviewed_at = Some(stamp.at);
                submission.updated_at = Utc::now();
                submission.clone()
            }))
    }

    async fn reopen_submission(
        &self,
        id: SubmissionId,
        stamp: &ReviewStamp,
    ) -> Result<Option<Submission>> {
        let mut state = self.state.lock().await;
        Ok(state
            .submission_mut(id)
            .filter(|s| s.status == SubmissionStatus::Rejected)
            .map(|submission| {
                submission.status = SubmissionStatus::Pending;
                submission.reviewed_by = Some(stamp.reviewer.clone());
                submission.reviewer_notes = stamp.notes.clone();
                submission.reviewed_at = Some(stamp.at);
                submission.updated_at = Utc::now();
                submission.clone()
            }))
    }

    async fn begin_approval(&self, id: SubmissionId) -> Result<Option<Box<dyn ApprovalTransaction>>> {
        let guard = self.state.clone().lock_owned().await;
        let Some(submission) = guard.submissions.iter().find(|s| s.id == id).cloned() else {
            return Ok(None);
        };
        let working = (*guard).clone();

        Ok(Some(Box::new(MemoryApprovalTransaction {
            guard,
            working,
            submission,
        })))
    }

    async fn occupied_websites(&self) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        let entries = state.entries.iter().map(|e| e.website.clone());
        let submissions = state
            .submissions
            .iter()
            .filter(|s| s.status != SubmissionStatus::Rejected)
            .map(|s| s.website.clone());
        Ok(entries.chain(submissions).collect())
    }

    async fn find_entry(&self, id: EntryId) -> Result<Option<Entry>> {
        let state = self.state.lock().await;
        Ok(state.entries.iter().find(|e| e.id == id).cloned())
    }

    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let state = self.state.lock().await;
        let matching = state.entries.iter().filter(|e| filter.matches(e)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit.max(0) as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn apply_entry_enrichment(
        &self,
        id: EntryId,
        update: &EntryUpdate,
        log: &NewEnrichmentLog,
    ) -> Result<(Entry, EnrichmentLog)> {
        let mut state = self.state.lock().await;
        let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
            bail!("entry {} not found", id);
        };
        entry.apply(update);
        let entry = entry.clone();

        let log = log.clone().into_log(Utc::now());
        state.logs.push(log.clone());
        Ok((entry, log))
    }

    async fn insert_enrichment_log(&self, log: &NewEnrichmentLog) -> Result<EnrichmentLog> {
        let log = log.clone().into_log(Utc::now());
        self.state.lock().await.logs.push(log.clone());
        Ok(log)
    }

    async fn enrichment_logs(&self, entry_id: EntryId) -> Result<Vec<EnrichmentLog>> {
        let state = self.state.lock().await;
        Ok(state
            .logs
            .iter()
            .rev()
            .filter(|l| l.entry_id == entry_id)
            .cloned()
            .collect())
    }

    async fn start_sourcing_run(
        &self,
        source_id: &str,
        config: &serde_json::Value,
        created_by: Option<&str>,
    ) -> Result<SourcingRun> {
        let run = SourcingRun::started(
            source_id,
            config.clone(),
            created_by.map(str::to_string),
            Utc::now(),
        );
        self.state.lock().await.runs.push(run.clone());
        Ok(run)
    }

    async fn finish_sourcing_run(
        &self,
        run: &SourcingRun,
        outcome: &RunOutcome,
    ) -> Result<SourcingRun> {
        let mut state = self.state.lock().await;
        if state.failing_run_finishes > 0 {
            state.failing_run_finishes -= 1;
            bail!("connection lost while finishing run {}", run.id);
        }
        let Some(stored) = state
            .runs
            .iter_mut()
            .find(|r| r.id == run.id && !r.is_finished())
        else {
            bail!("Sourcing run {} is missing or already finalized", run.id);
        };
        stored.finish(outcome, Utc::now());
        Ok(stored.clone())
    }

    async fn recent_sourcing_runs(&self, limit: i64) -> Result<Vec<SourcingRun>> {
        let state = self.state.lock().await;
        Ok(state
            .runs
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::submissions::models::SubmissionSource;

    fn new_submission(name: &str, website: &str) -> NewSubmission {
        NewSubmission::builder()
            .name(name)
            .website(website)
            .source(SubmissionSource::Form)
            .build()
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = MemoryDirectoryStore::new();
        let submission = store.insert_submission(&new_submission("Foo", "https://foo.ai")).await.unwrap();

        {
            let mut tx = store.begin_approval(submission.id).await.unwrap().unwrap();
            let entry = tx
                .insert_entry(
                    &NewEntry::builder()
                        .name("Foo")
                        .slug("foo")
                        .website("https://foo.ai")
                        .short_description("")
                        .description("")
                        .build(),
                )
                .await
                .unwrap();
            tx.mark_approved(entry.id, &ReviewStamp::new("admin", None), None)
                .await
                .unwrap();
        }

        assert!(store.entries().await.is_empty());
        let stored = store.find_submission(submission.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn rejected_submissions_free_their_website() {
        let store = MemoryDirectoryStore::new();
        let a = store.insert_submission(&new_submission("A", "https://a.ai")).await.unwrap();
        store.insert_submission(&new_submission("B", "https://b.ai")).await.unwrap();

        store
            .reject_submission(a.id, &ReviewStamp::new("admin", None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.occupied_websites().await.unwrap(), vec!["https://b.ai"]);
        assert!(store
            .reject_submission(a.id, &ReviewStamp::new("admin", None))
            .await
            .unwrap()
            .is_none());
    }
}
