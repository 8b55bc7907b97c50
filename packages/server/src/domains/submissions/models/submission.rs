use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use typed_builder::TypedBuilder;

use crate::common::{EntryId, SubmissionId};
use crate::domains::enrichment::models::EnrichmentSnapshot;
use crate::domains::review::models::{ReviewDecision, ReviewResult};
use crate::domains::url_filters::{normalize_url, UrlClassification};

/// Reviewer recorded for transitions applied by the confidence gate.
pub const AUTO_REVIEWER: &str = "auto-review";

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    /// Pending moves to either terminal state. Rejected can only go back to
    /// pending through the administrative reopen override.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Rejected, Self::Pending)
        )
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Approved => write!(f, "approved"),
            SubmissionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid submission status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "submission_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSource {
    /// Submitted by a person through the public form
    Form,
    /// Created by a sourcing run
    Auto,
}

impl std::fmt::Display for SubmissionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionSource::Form => write!(f, "form"),
            SubmissionSource::Auto => write!(f, "auto"),
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Provenance attached to auto-discovered submissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcingMetadata {
    #[serde(default)]
    pub url_classification: Option<UrlClassification>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_aggregator: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub needs_url_extraction: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_github: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub potential_open_source: bool,
    /// Whatever the source plugin reported (query, position, extraction mode).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub discovery: serde_json::Map<String, serde_json::Value>,
}

impl SourcingMetadata {
    /// Metadata for a freshly classified discovery.
    pub fn for_classification(classification: UrlClassification, source_id: &str) -> Self {
        let mut metadata = Self {
            url_classification: Some(classification),
            source_id: Some(source_id.to_string()),
            ..Default::default()
        };
        metadata.apply_classification(classification);
        metadata
    }

    pub fn apply_classification(&mut self, classification: UrlClassification) {
        self.url_classification = Some(classification);
        match classification {
            UrlClassification::Aggregator => {
                self.is_aggregator = true;
                self.needs_url_extraction = true;
            }
            UrlClassification::Github => {
                self.is_github = true;
                self.potential_open_source = true;
            }
            _ => {}
        }
    }
}

/// Who moved a submission out of (or back into) pending, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStamp {
    pub reviewer: String,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

impl ReviewStamp {
    pub fn new(reviewer: impl Into<String>, notes: Option<String>) -> Self {
        Self {
            reviewer: reviewer.into(),
            notes,
            at: Utc::now(),
        }
    }

    pub fn automated(notes: impl Into<String>) -> Self {
        Self::new(AUTO_REVIEWER, Some(notes.into()))
    }
}

// ============================================================================
// Submission
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub name: String,
    pub website: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub source: SubmissionSource,
    pub status: SubmissionStatus,
    pub sourcing_metadata: Option<SourcingMetadata>,
    pub enrichment_data: Option<EnrichmentSnapshot>,
    pub ai_review_result: Option<ReviewResult>,
    pub needs_manual_review: bool,
    pub logo_path: Option<String>,
    pub screenshot_path: Option<String>,
    /// Set if and only if the submission is approved.
    pub entry_id: Option<EntryId>,
    pub reviewed_by: Option<String>,
    pub reviewer_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_enriched(&self) -> bool {
        self.enrichment_data.is_some()
    }

    /// Sourcing flagged it as an aggregator listing still awaiting extraction.
    pub fn is_marked_aggregator(&self) -> bool {
        self.sourcing_metadata
            .as_ref()
            .is_some_and(|m| m.is_aggregator && m.needs_url_extraction)
    }
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct NewSubmission {
    pub name: String,
    pub website: String,
    #[builder(default)]
    pub description: Option<String>,
    #[builder(default)]
    pub email: Option<String>,
    pub source: SubmissionSource,
    #[builder(default)]
    pub sourcing_metadata: Option<SourcingMetadata>,
    #[builder(default)]
    pub needs_manual_review: bool,
}

/// Selection used by batch commands. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub ids: Option<Vec<SubmissionId>>,
    pub status: Option<SubmissionStatus>,
    pub source: Option<SubmissionSource>,
    pub enriched: Option<bool>,
    pub reviewed: Option<bool>,
    pub ai_decision: Option<ReviewDecision>,
    pub limit: Option<i64>,
}

impl SubmissionFilter {
    pub fn pending() -> Self {
        Self {
            status: Some(SubmissionStatus::Pending),
            ..Default::default()
        }
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&submission.id) {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != submission.status) {
            return false;
        }
        if self.source.is_some_and(|s| s != submission.source) {
            return false;
        }
        if self.enriched.is_some_and(|e| e != submission.is_enriched()) {
            return false;
        }
        if self
            .reviewed
            .is_some_and(|r| r != submission.ai_review_result.is_some())
        {
            return false;
        }
        if let Some(decision) = self.ai_decision {
            if submission.ai_review_result.as_ref().map(|r| r.decision) != Some(decision) {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// SQL Queries - ALL queries must be in models/
// ============================================================================

const SUBMISSION_COLUMNS: &str = "id, name, website, description, email, source, status, \
     sourcing_metadata, enrichment_data, ai_review_result, needs_manual_review, logo_path, \
     screenshot_path, entry_id, reviewed_by, reviewer_notes, reviewed_at, submitted_at, updated_at";

#[derive(FromRow)]
struct SubmissionRow {
    id: SubmissionId,
    name: String,
    website: String,
    description: Option<String>,
    email: Option<String>,
    source: SubmissionSource,
    status: SubmissionStatus,
    sourcing_metadata: Option<Json<SourcingMetadata>>,
    enrichment_data: Option<Json<EnrichmentSnapshot>>,
    ai_review_result: Option<Json<ReviewResult>>,
    needs_manual_review: bool,
    logo_path: Option<String>,
    screenshot_path: Option<String>,
    entry_id: Option<EntryId>,
    reviewed_by: Option<String>,
    reviewer_notes: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    submitted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            website: row.website,
            description: row.description,
            email: row.email,
            source: row.source,
            status: row.status,
            sourcing_metadata: row.sourcing_metadata.map(|j| j.0),
            enrichment_data: row.enrichment_data.map(|j| j.0),
            ai_review_result: row.ai_review_result.map(|j| j.0),
            needs_manual_review: row.needs_manual_review,
            logo_path: row.logo_path,
            screenshot_path: row.screenshot_path,
            entry_id: row.entry_id,
            reviewed_by: row.reviewed_by,
            reviewer_notes: row.reviewer_notes,
            reviewed_at: row.reviewed_at,
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
        }
    }
}

impl Submission {
    pub async fn insert(new: &NewSubmission, pool: &PgPool) -> Result<Self> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "INSERT INTO submissions
                (id, name, website, normalized_website, description, email, source,
                 sourcing_metadata, needs_manual_review)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(SubmissionId::new())
        .bind(&new.name)
        .bind(&new.website)
        .bind(normalize_url(&new.website))
        .bind(&new.description)
        .bind(&new.email)
        .bind(new.source)
        .bind(new.sourcing_metadata.as_ref().map(Json))
        .bind(new.needs_manual_review)
        .fetch_one(pool)
        .await?;
        Ok(row.into())
    }

    pub async fn find_by_id(id: SubmissionId, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Oldest first, so batch commands work through the backlog in order.
    pub async fn find_filtered(filter: &SubmissionFilter, pool: &PgPool) -> Result<Vec<Self>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE TRUE"
        ));

        if let Some(ids) = &filter.ids {
            query.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(source) = filter.source {
            query.push(" AND source = ").push_bind(source);
        }
        if let Some(enriched) = filter.enriched {
            query.push(if enriched {
                " AND enrichment_data IS NOT NULL"
            } else {
                " AND enrichment_data IS NULL"
            });
        }
        if let Some(reviewed) = filter.reviewed {
            query.push(if reviewed {
                " AND ai_review_result IS NOT NULL"
            } else {
                " AND ai_review_result IS NULL"
            });
        }
        if let Some(decision) = filter.ai_decision {
            query
                .push(" AND ai_review_result->>'decision' = ")
                .push_bind(decision.as_str());
        }

        query.push(" ORDER BY submitted_at ASC, id ASC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rows = query
            .build_query_as::<SubmissionRow>()
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update_website(id: SubmissionId, website: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE submissions
             SET website = $2, normalized_website = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(website)
        .bind(normalize_url(website))
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn save_enrichment(
        id: SubmissionId,
        snapshot: &EnrichmentSnapshot,
        logo_path: Option<&str>,
        screenshot_path: Option<&str>,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE submissions
             SET enrichment_data = $2,
                 logo_path = COALESCE($3, logo_path),
                 screenshot_path = COALESCE($4, screenshot_path),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(snapshot))
        .bind(logo_path)
        .bind(screenshot_path)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn save_review(
        id: SubmissionId,
        review: &ReviewResult,
        needs_manual_review: bool,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE submissions
             SET ai_review_result = $2, needs_manual_review = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(Json(review))
        .bind(needs_manual_review)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn flag_for_manual_review(
        id: SubmissionId,
        metadata: Option<&SourcingMetadata>,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE submissions
             SET needs_manual_review = TRUE,
                 sourcing_metadata = COALESCE($2, sourcing_metadata),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(metadata.map(Json))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Pending to rejected. `None` when the submission is missing or no longer pending.
    pub async fn reject(id: SubmissionId, stamp: &ReviewStamp, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "UPDATE submissions
             SET status = 'rejected', reviewed_by = $2, reviewer_notes = $3, reviewed_at = $4,
                 updated_at = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(id)
        .bind(&stamp.reviewer)
        .bind(&stamp.notes)
        .bind(stamp.at)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Rejected back to pending (administrative override).
    pub async fn reopen(id: SubmissionId, stamp: &ReviewStamp, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "UPDATE submissions
             SET status = 'pending', reviewed_by = $2, reviewer_notes = $3, reviewed_at = $4,
                 updated_at = NOW()
             WHERE id = $1 AND status = 'rejected'
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(id)
        .bind(&stamp.reviewer)
        .bind(&stamp.notes)
        .bind(stamp.at)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Row-locks the submission for the rest of the transaction.
    pub async fn lock_for_update(id: SubmissionId, conn: &mut PgConnection) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn mark_approved(
        id: SubmissionId,
        entry_id: EntryId,
        stamp: &ReviewStamp,
        review: Option<&ReviewResult>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "UPDATE submissions
             SET status = 'approved', entry_id = $2, reviewed_by = $3, reviewer_notes = $4,
                 reviewed_at = $5, ai_review_result = COALESCE($6, ai_review_result),
                 updated_at = NOW()
             WHERE id = $1 AND status = 'pending'
             RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(id)
        .bind(entry_id)
        .bind(&stamp.reviewer)
        .bind(&stamp.notes)
        .bind(stamp.at)
        .bind(review.map(Json))
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    /// Websites that occupy the uniqueness space: every entry plus every
    /// submission that was not rejected.
    pub async fn occupied_websites(pool: &PgPool) -> Result<Vec<String>> {
        let websites = sqlx::query_scalar::<_, String>(
            "SELECT website FROM entries
             UNION
             SELECT website FROM submissions WHERE status <> 'rejected'",
        )
        .fetch_all(pool)
        .await?;
        Ok(websites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        use SubmissionStatus::*;

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Rejected.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn classification_metadata() {
        let aggregator = SourcingMetadata::for_classification(UrlClassification::Aggregator, "serp");
        assert!(aggregator.is_aggregator && aggregator.needs_url_extraction);
        assert!(!aggregator.is_github);

        let github = SourcingMetadata::for_classification(UrlClassification::Github, "serp");
        assert!(github.is_github && github.potential_open_source);

        let json = serde_json::to_value(SourcingMetadata::for_classification(
            UrlClassification::NonRoot,
            "serp",
        ))
        .unwrap();
        assert_eq!(json["url_classification"], "non_root");
        assert_eq!(json["source_id"], "serp");
        assert!(json.get("is_aggregator").is_none());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<SubmissionStatus>().unwrap(), status);
        }
        assert!("archived".parse::<SubmissionStatus>().is_err());
    }
}
