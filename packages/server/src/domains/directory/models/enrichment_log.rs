use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use typed_builder::TypedBuilder;

use super::entry::EntryState;
use crate::common::{EnrichmentLogId, EntryId};
use crate::domains::enrichment::models::EnrichmentSnapshot;

/// Audit record of one enrichment of a published entry. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentLog {
    pub id: EnrichmentLogId,
    pub entry_id: EntryId,
    pub previous_data: EntryState,
    /// What the scrape returned; `None` when the run failed before scraping.
    pub extracted_data: Option<EnrichmentSnapshot>,
    pub applied_fields: Vec<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct NewEnrichmentLog {
    pub entry_id: EntryId,
    pub previous_data: EntryState,
    #[builder(default)]
    pub extracted_data: Option<EnrichmentSnapshot>,
    #[builder(default)]
    pub applied_fields: Vec<String>,
    pub success: bool,
    #[builder(default)]
    pub error_message: Option<String>,
    #[builder(default)]
    pub created_by: Option<String>,
}

impl NewEnrichmentLog {
    pub fn into_log(self, created_at: DateTime<Utc>) -> EnrichmentLog {
        EnrichmentLog {
            id: EnrichmentLogId::new(),
            entry_id: self.entry_id,
            previous_data: self.previous_data,
            extracted_data: self.extracted_data,
            applied_fields: self.applied_fields,
            success: self.success,
            error_message: self.error_message,
            created_at,
            created_by: self.created_by,
        }
    }
}

// ============================================================================
// SQL Queries - ALL queries must be in models/
// ============================================================================

const LOG_COLUMNS: &str = "id, entry_id, previous_data, extracted_data, applied_fields, \
     success, error_message, created_at, created_by";

#[derive(FromRow)]
struct EnrichmentLogRow {
    id: EnrichmentLogId,
    entry_id: EntryId,
    previous_data: Json<EntryState>,
    extracted_data: Option<Json<EnrichmentSnapshot>>,
    applied_fields: Vec<String>,
    success: bool,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
}

impl From<EnrichmentLogRow> for EnrichmentLog {
    fn from(row: EnrichmentLogRow) -> Self {
        Self {
            id: row.id,
            entry_id: row.entry_id,
            previous_data: row.previous_data.0,
            extracted_data: row.extracted_data.map(|j| j.0),
            applied_fields: row.applied_fields,
            success: row.success,
            error_message: row.error_message,
            created_at: row.created_at,
            created_by: row.created_by,
        }
    }
}

impl EnrichmentLog {
    pub async fn insert(new: &NewEnrichmentLog, conn: &mut PgConnection) -> Result<Self> {
        let row = sqlx::query_as::<_, EnrichmentLogRow>(&format!(
            "INSERT INTO enrichment_logs
                (id, entry_id, previous_data, extracted_data, applied_fields, success,
                 error_message, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {LOG_COLUMNS}"
        ))
        .bind(EnrichmentLogId::new())
        .bind(new.entry_id)
        .bind(Json(&new.previous_data))
        .bind(new.extracted_data.as_ref().map(Json))
        .bind(&new.applied_fields)
        .bind(new.success)
        .bind(&new.error_message)
        .bind(&new.created_by)
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    /// Newest first.
    pub async fn find_by_entry(entry_id: EntryId, pool: &PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, EnrichmentLogRow>(&format!(
            "SELECT {LOG_COLUMNS} FROM enrichment_logs
             WHERE entry_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(entry_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
