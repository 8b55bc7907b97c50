use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use crate::common::{SourcingRunId, SubmissionId};

/// Audit record of one execution of a source plugin.
///
/// Created when the run starts and finalized exactly once. A run with
/// `completed_at == None` is still in progress (or its process died).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcingRun {
    pub id: SourcingRunId,
    pub source_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub discovered_count: i32,
    pub new_count: i32,
    /// Blocked plus duplicate candidates.
    pub skipped_count: i32,
    pub blocked_count: i32,
    pub duplicate_count: i32,
    pub success: bool,
    pub error_message: Option<String>,
    pub config: serde_json::Value,
    pub created_submission_ids: Vec<SubmissionId>,
    pub created_by: Option<String>,
}

impl SourcingRun {
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at.map(|done| done - self.started_at)
    }

    pub fn is_finished(&self) -> bool {
        self.completed_at.is_some()
    }

    /// A fresh, unfinished run. Stores use this for the in-memory variant.
    pub fn started(
        source_id: impl Into<String>,
        config: serde_json::Value,
        created_by: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SourcingRunId::new(),
            source_id: source_id.into(),
            started_at,
            completed_at: None,
            discovered_count: 0,
            new_count: 0,
            skipped_count: 0,
            blocked_count: 0,
            duplicate_count: 0,
            success: false,
            error_message: None,
            config,
            created_submission_ids: Vec::new(),
            created_by,
        }
    }

    pub fn finish(&mut self, outcome: &RunOutcome, completed_at: DateTime<Utc>) {
        self.completed_at = Some(completed_at);
        self.discovered_count = outcome.discovered as i32;
        self.blocked_count = outcome.blocked as i32;
        self.duplicate_count = outcome.duplicates as i32;
        self.skipped_count = outcome.skipped() as i32;
        self.new_count = outcome.created.len() as i32;
        self.created_submission_ids = outcome.created.clone();
        self.success = outcome.error.is_none();
        self.error_message = outcome.error.clone();
    }
}

/// Tallies collected while a run processes its candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    pub discovered: usize,
    pub blocked: usize,
    pub duplicates: usize,
    pub created: Vec<SubmissionId>,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn skipped(&self) -> usize {
        self.blocked + self.duplicates
    }
}

// ============================================================================
// SQL Queries - ALL queries must be in models/
// ============================================================================

const RUN_COLUMNS: &str = "id, source_id, started_at, completed_at, discovered_count, new_count, \
     skipped_count, blocked_count, duplicate_count, success, error_message, config, \
     created_submission_ids, created_by";

#[derive(FromRow)]
struct SourcingRunRow {
    id: SourcingRunId,
    source_id: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    discovered_count: i32,
    new_count: i32,
    skipped_count: i32,
    blocked_count: i32,
    duplicate_count: i32,
    success: bool,
    error_message: Option<String>,
    config: Json<serde_json::Value>,
    created_submission_ids: Vec<SubmissionId>,
    created_by: Option<String>,
}

impl From<SourcingRunRow> for SourcingRun {
    fn from(row: SourcingRunRow) -> Self {
        Self {
            id: row.id,
            source_id: row.source_id,
            started_at: row.started_at,
            completed_at: row.completed_at,
            discovered_count: row.discovered_count,
            new_count: row.new_count,
            skipped_count: row.skipped_count,
            blocked_count: row.blocked_count,
            duplicate_count: row.duplicate_count,
            success: row.success,
            error_message: row.error_message,
            config: row.config.0,
            created_submission_ids: row.created_submission_ids,
            created_by: row.created_by,
        }
    }
}

impl SourcingRun {
    pub async fn start(
        source_id: &str,
        config: &serde_json::Value,
        created_by: Option<&str>,
        pool: &PgPool,
    ) -> Result<Self> {
        let row = sqlx::query_as::<_, SourcingRunRow>(&format!(
            "INSERT INTO sourcing_runs (id, source_id, config, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(SourcingRunId::new())
        .bind(source_id)
        .bind(Json(config))
        .bind(created_by)
        .fetch_one(pool)
        .await?;
        Ok(row.into())
    }

    /// Only an unfinished run can be finalized.
    pub async fn finalize(id: SourcingRunId, outcome: &RunOutcome, pool: &PgPool) -> Result<Self> {
        let row = sqlx::query_as::<_, SourcingRunRow>(&format!(
            "UPDATE sourcing_runs
             SET completed_at = NOW(),
                 discovered_count = $2,
                 new_count = $3,
                 skipped_count = $4,
                 blocked_count = $5,
                 duplicate_count = $6,
                 success = $7,
                 error_message = $8,
                 created_submission_ids = $9
             WHERE id = $1 AND completed_at IS NULL
             RETURNING {RUN_COLUMNS}"
        ))
        .bind(id)
        .bind(outcome.discovered as i32)
        .bind(outcome.created.len() as i32)
        .bind(outcome.skipped() as i32)
        .bind(outcome.blocked as i32)
        .bind(outcome.duplicates as i32)
        .bind(outcome.error.is_none())
        .bind(&outcome.error)
        .bind(&outcome.created)
        .fetch_optional(pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| anyhow::anyhow!("Sourcing run {} is missing or already finalized", id))
    }

    /// Newest first.
    pub async fn find_recent(limit: i64, pool: &PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, SourcingRunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM sourcing_runs ORDER BY started_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_records_counts_and_duration() {
        let started = Utc::now();
        let mut run = SourcingRun::started("serp", serde_json::json!({"limit": 5}), None, started);
        assert!(!run.is_finished());
        assert_eq!(run.duration(), None);

        let outcome = RunOutcome {
            discovered: 6,
            blocked: 2,
            duplicates: 1,
            created: vec![SubmissionId::new(), SubmissionId::new(), SubmissionId::new()],
            error: None,
        };
        run.finish(&outcome, started + Duration::seconds(3));

        assert!(run.success);
        assert_eq!(run.skipped_count, 3);
        assert_eq!(run.new_count, 3);
        assert_eq!(run.duration(), Some(Duration::seconds(3)));
    }

    #[test]
    fn error_marks_run_failed() {
        let mut run = SourcingRun::started("serp", serde_json::Value::Null, None, Utc::now());
        run.finish(
            &RunOutcome {
                error: Some("search failed".into()),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(!run.success);
        assert_eq!(run.error_message.as_deref(), Some("search failed"));
    }
}
