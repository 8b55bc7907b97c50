//! Entry enrichment - refresh published entries from their websites,
//! with an enrichment log per invocation.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::media::{download_logo, download_screenshot};
use super::scrape::scrape_product;
use crate::common::text::truncate_chars;
use crate::common::{pause_between_items, EntryId, PipelineError};
use crate::domains::directory::models::{
    is_valid_video_url, EnrichmentLog, Entry, EntryFilter, EntryUpdate, Industry,
    NewEnrichmentLog, PricingModel,
};
use crate::domains::enrichment::models::EnrichmentSnapshot;
use crate::kernel::ServerDeps;

/// Fields `enrich_entry` may update.
pub const ENRICHABLE_FIELDS: &[&str] = &[
    "short_description",
    "description",
    "features",
    "use_cases",
    "pricing_model",
    "category",
    "is_open_source",
    "industry",
    "twitter_url",
    "linkedin_url",
    "demo_video_url",
    "logo",
    "screenshot",
];

const SHORT_DESCRIPTION_MAX: usize = 250;

/// Rejects unknown field names. `None` or an empty list selects every field.
pub fn validate_fields(fields: Option<&[String]>) -> Result<Vec<&'static str>, PipelineError> {
    let Some(requested) = fields.filter(|f| !f.is_empty()) else {
        return Ok(ENRICHABLE_FIELDS.to_vec());
    };

    let mut invalid: Vec<&str> = requested
        .iter()
        .map(String::as_str)
        .filter(|f| !ENRICHABLE_FIELDS.contains(f))
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        return Err(PipelineError::Validation(format!(
            "Invalid fields: {}",
            invalid.join(", ")
        )));
    }

    Ok(ENRICHABLE_FIELDS
        .iter()
        .copied()
        .filter(|f| requested.iter().any(|r| r == f))
        .collect())
}

/// Enriches one entry and returns the log written for it.
pub async fn enrich_entry(
    entry_id: EntryId,
    fields: Option<&[String]>,
    actor: Option<&str>,
    deps: &ServerDeps,
) -> Result<EnrichmentLog> {
    let selected = validate_fields(fields)?;

    let entry = deps
        .store
        .find_entry(entry_id)
        .await?
        .ok_or_else(|| PipelineError::not_found("Entry", entry_id))?;

    info!(entry_id = %entry_id, name = %entry.name, fields = ?selected, "Enriching entry");

    let previous_data = entry.state();
    let snapshot = scrape_product(&entry.website, deps).await;

    if let Some(reason) = snapshot.failure_reason() {
        warn!(entry_id = %entry_id, reason, "Entry enrichment scrape failed");
        let log = NewEnrichmentLog::builder()
            .entry_id(entry_id)
            .previous_data(previous_data)
            .error_message(reason.to_string())
            .extracted_data(snapshot.clone())
            .success(false)
            .created_by(actor.map(str::to_string))
            .build();
        return deps.store.insert_enrichment_log(&log).await;
    }

    let update = build_update(&entry, &snapshot, &selected, deps).await;
    let log = NewEnrichmentLog::builder()
        .entry_id(entry_id)
        .previous_data(previous_data)
        .extracted_data(snapshot)
        .applied_fields(update.applied_fields())
        .success(true)
        .created_by(actor.map(str::to_string))
        .build();

    let (_, log) = deps
        .store
        .apply_entry_enrichment(entry_id, &update, &log)
        .await?;

    info!(entry_id = %entry_id, applied = ?log.applied_fields, "Entry enrichment complete");
    Ok(log)
}

/// Per-field transforms. Empty extracted values leave the entry untouched.
async fn build_update(
    entry: &Entry,
    snapshot: &EnrichmentSnapshot,
    selected: &[&str],
    deps: &ServerDeps,
) -> EntryUpdate {
    let wants = |field: &str| selected.contains(&field);
    let content = &snapshot.content;
    let mut update = EntryUpdate::default();

    if wants("short_description") {
        update.short_description = content
            .short_description
            .as_deref()
            .map(|v| truncate_chars(v, SHORT_DESCRIPTION_MAX));
    }
    if wants("description") {
        update.description = content.description.clone();
    }
    if wants("pricing_model") {
        update.pricing_model = content.pricing_model.as_deref().and_then(PricingModel::from_extracted);
    }
    if wants("industry") {
        update.industry = content.industry.as_deref().and_then(Industry::from_extracted);
    }
    if wants("is_open_source") {
        update.is_open_source = content.is_open_source;
    }
    if wants("twitter_url") {
        update.twitter_url = content.twitter_url.clone();
    }
    if wants("linkedin_url") {
        update.linkedin_url = content.linkedin_url.clone();
    }
    if wants("demo_video_url") {
        update.demo_video_url = content
            .demo_video_url
            .clone()
            .filter(|url| is_valid_video_url(url));
    }
    if wants("features") && !content.features.is_empty() {
        update.features = Some(content.features.clone());
    }
    if wants("use_cases") && !content.use_cases.is_empty() {
        update.use_cases = Some(content.use_cases.clone());
    }
    if wants("category") {
        update.category = content.category.clone();
    }

    if wants("logo") {
        if let Some(logo_url) = &snapshot.logo_url {
            match download_logo(logo_url, &format!("agents/logos/{}", entry.slug), deps).await {
                Ok(path) => update.logo_path = Some(path),
                Err(e) => warn!(entry_id = %entry.id, error = %e, "Logo download failed"),
            }
        }
    }
    if wants("screenshot") {
        if let Some(screenshot_url) = &snapshot.screenshot_url {
            let key = format!("agents/screenshots/{}_{}", entry.slug, entry.screenshots.len() + 1);
            match download_screenshot(screenshot_url, &key, deps).await {
                Ok(path) => update.screenshot_path = Some(path),
                Err(e) => warn!(entry_id = %entry.id, error = %e, "Screenshot download failed"),
            }
        }
    }

    update
}

/// Enriches the given entries (all published ones when `ids` is `None`).
///
/// An unexpected error on one entry is written as a failed log and the
/// batch continues.
pub async fn enrich_entries(
    ids: Option<Vec<EntryId>>,
    fields: Option<&[String]>,
    actor: Option<&str>,
    cancel: &CancellationToken,
    deps: &ServerDeps,
) -> Result<Vec<EnrichmentLog>> {
    validate_fields(fields)?;

    let filter = EntryFilter {
        ids,
        ..Default::default()
    };
    let entries = deps.store.list_entries(&filter).await?;
    info!(count = entries.len(), "Enriching entries");

    let mut logs = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if index > 0 && !pause_between_items(deps.settings.batch_delay, cancel).await {
            info!(done = logs.len(), "Entry enrichment cancelled");
            break;
        }

        match enrich_entry(entry.id, fields, actor, deps).await {
            Ok(log) => logs.push(log),
            Err(e) => {
                error!(entry_id = %entry.id, error = %e, "Failed to enrich entry");
                let log = NewEnrichmentLog::builder()
                    .entry_id(entry.id)
                    .previous_data(entry.state())
                    .success(false)
                    .error_message(e.to_string())
                    .created_by(actor.map(str::to_string))
                    .build();
                logs.push(deps.store.insert_enrichment_log(&log).await?);
            }
        }
    }

    Ok(logs)
}
