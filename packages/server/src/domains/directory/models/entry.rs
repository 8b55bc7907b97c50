use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use typed_builder::TypedBuilder;

use super::category::Category;
use crate::common::EntryId;
use crate::domains::url_filters::normalize_url;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "entry_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Draft,
    Submitted,
    #[default]
    Published,
    Archived,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Draft => write!(f, "draft"),
            EntryStatus::Submitted => write!(f, "submitted"),
            EntryStatus::Published => write!(f, "published"),
            EntryStatus::Archived => write!(f, "archived"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "pricing_model", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingModel {
    #[default]
    Unknown,
    Free,
    Freemium,
    Paid,
    Enterprise,
    Contact,
}

impl PricingModel {
    /// Lenient mapping from extracted text. Anything unrecognized is `None`.
    pub fn from_extracted(value: &str) -> Option<Self> {
        match screaming(value).as_str() {
            "UNKNOWN" => Some(Self::Unknown),
            "FREE" => Some(Self::Free),
            "FREEMIUM" => Some(Self::Freemium),
            "PAID" => Some(Self::Paid),
            "ENTERPRISE" => Some(Self::Enterprise),
            "CONTACT" => Some(Self::Contact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "industry", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Industry {
    #[default]
    Unknown,
    General,
    Healthcare,
    Finance,
    Education,
    Ecommerce,
    Marketing,
    Legal,
    Hr,
    Tech,
    CustomerService,
    Research,
    Content,
}

impl Industry {
    pub fn from_extracted(value: &str) -> Option<Self> {
        match screaming(value).as_str() {
            "UNKNOWN" => Some(Self::Unknown),
            "GENERAL" => Some(Self::General),
            "HEALTHCARE" => Some(Self::Healthcare),
            "FINANCE" => Some(Self::Finance),
            "EDUCATION" => Some(Self::Education),
            "ECOMMERCE" | "E_COMMERCE" => Some(Self::Ecommerce),
            "MARKETING" => Some(Self::Marketing),
            "LEGAL" => Some(Self::Legal),
            "HR" => Some(Self::Hr),
            "TECH" => Some(Self::Tech),
            "CUSTOMER_SERVICE" => Some(Self::CustomerService),
            "RESEARCH" => Some(Self::Research),
            "CONTENT" => Some(Self::Content),
            _ => None,
        }
    }
}

fn screaming(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

/// Demo videos are only accepted from YouTube, Vimeo or Loom, and never
/// when the link is really an image.
pub fn is_valid_video_url(url: &str) -> bool {
    const VIDEO_DOMAINS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com", "loom.com"];
    const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp"];

    let url = url.trim().to_lowercase();
    if url.is_empty() || IMAGE_EXTENSIONS.iter().any(|ext| url.ends_with(ext)) {
        return false;
    }
    VIDEO_DOMAINS.iter().any(|domain| url.contains(domain))
}

// ============================================================================
// Entry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryScreenshot {
    pub path: String,
    pub is_primary: bool,
}

/// A published directory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub name: String,
    pub slug: String,
    pub website: String,
    pub short_description: String,
    pub description: String,
    pub pricing_model: PricingModel,
    pub industry: Industry,
    pub is_open_source: Option<bool>,
    pub twitter_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub demo_video_url: Option<String>,
    pub logo_path: Option<String>,
    pub status: EntryStatus,
    pub sort_order: i32,
    pub featured: bool,
    pub categories: Vec<String>,
    pub features: Vec<String>,
    pub use_cases: Vec<String>,
    pub screenshots: Vec<EntryScreenshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Snapshot of the enrichable fields, stored as the "before" side of an
    /// enrichment log.
    pub fn state(&self) -> EntryState {
        EntryState {
            short_description: self.short_description.clone(),
            description: self.description.clone(),
            features: self.features.clone(),
            use_cases: self.use_cases.clone(),
            pricing_model: self.pricing_model,
            categories: self.categories.clone(),
            is_open_source: self.is_open_source,
            industry: self.industry,
            twitter_url: self.twitter_url.clone(),
            linkedin_url: self.linkedin_url.clone(),
            demo_video_url: self.demo_video_url.clone(),
            logo: self.logo_path.clone(),
            screenshots: self.screenshots.iter().map(|s| s.path.clone()).collect(),
        }
    }

    /// Applies an update in place. The in-memory store and the SQL below
    /// must agree on these rules.
    pub fn apply(&mut self, update: &EntryUpdate) {
        if let Some(v) = &update.short_description {
            self.short_description = v.clone();
        }
        if let Some(v) = &update.description {
            self.description = v.clone();
        }
        if let Some(v) = update.pricing_model {
            self.pricing_model = v;
        }
        if let Some(v) = update.industry {
            self.industry = v;
        }
        if let Some(v) = update.is_open_source {
            self.is_open_source = Some(v);
        }
        if let Some(v) = &update.twitter_url {
            self.twitter_url = Some(v.clone());
        }
        if let Some(v) = &update.linkedin_url {
            self.linkedin_url = Some(v.clone());
        }
        if let Some(v) = &update.demo_video_url {
            self.demo_video_url = Some(v.clone());
        }
        if let Some(v) = &update.features {
            self.features = v.clone();
        }
        if let Some(v) = &update.use_cases {
            self.use_cases = v.clone();
        }
        if let Some(v) = &update.category {
            self.categories = vec![v.clone()];
        }
        if let Some(v) = &update.logo_path {
            self.logo_path = Some(v.clone());
        }
        if let Some(v) = &update.screenshot_path {
            let is_primary = self.screenshots.is_empty();
            self.screenshots.push(EntryScreenshot {
                path: v.clone(),
                is_primary,
            });
        }
        self.updated_at = Utc::now();
    }
}

/// Enrichable fields of an entry at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryState {
    pub short_description: String,
    pub description: String,
    pub features: Vec<String>,
    pub use_cases: Vec<String>,
    pub pricing_model: PricingModel,
    pub categories: Vec<String>,
    pub is_open_source: Option<bool>,
    pub industry: Industry,
    pub twitter_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub demo_video_url: Option<String>,
    pub logo: Option<String>,
    pub screenshots: Vec<String>,
}

#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct NewEntry {
    pub name: String,
    pub slug: String,
    pub website: String,
    pub short_description: String,
    pub description: String,
    #[builder(default)]
    pub pricing_model: PricingModel,
    #[builder(default)]
    pub industry: Industry,
    #[builder(default)]
    pub is_open_source: Option<bool>,
    #[builder(default)]
    pub twitter_url: Option<String>,
    #[builder(default)]
    pub linkedin_url: Option<String>,
    #[builder(default)]
    pub demo_video_url: Option<String>,
    #[builder(default)]
    pub logo_path: Option<String>,
    #[builder(default)]
    pub status: EntryStatus,
    #[builder(default = 10)]
    pub sort_order: i32,
    #[builder(default)]
    pub categories: Vec<String>,
    #[builder(default)]
    pub features: Vec<String>,
    #[builder(default)]
    pub use_cases: Vec<String>,
    /// Stored in order; the first one is primary.
    #[builder(default)]
    pub screenshots: Vec<String>,
}

/// Field changes from one enrichment pass. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub features: Option<Vec<String>>,
    pub use_cases: Option<Vec<String>>,
    pub pricing_model: Option<PricingModel>,
    pub category: Option<String>,
    pub is_open_source: Option<bool>,
    pub industry: Option<Industry>,
    pub twitter_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub demo_video_url: Option<String>,
    pub logo_path: Option<String>,
    /// Appended as an extra screenshot.
    pub screenshot_path: Option<String>,
}

impl EntryUpdate {
    /// Names of the fields this update changes, in enrichable-field order.
    pub fn applied_fields(&self) -> Vec<String> {
        let fields = [
            ("short_description", self.short_description.is_some()),
            ("description", self.description.is_some()),
            ("features", self.features.is_some()),
            ("use_cases", self.use_cases.is_some()),
            ("pricing_model", self.pricing_model.is_some()),
            ("category", self.category.is_some()),
            ("is_open_source", self.is_open_source.is_some()),
            ("industry", self.industry.is_some()),
            ("twitter_url", self.twitter_url.is_some()),
            ("linkedin_url", self.linkedin_url.is_some()),
            ("demo_video_url", self.demo_video_url.is_some()),
            ("logo", self.logo_path.is_some()),
            ("screenshot", self.screenshot_path.is_some()),
        ];
        fields
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub ids: Option<Vec<EntryId>>,
    pub status: Option<EntryStatus>,
    pub limit: Option<i64>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&entry.id) {
                return false;
            }
        }
        !self.status.is_some_and(|s| s != entry.status)
    }
}

// ============================================================================
// Duplicate conflicts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Website,
    Name,
    Slug,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::Website => write!(f, "website"),
            ConflictKind::Name => write!(f, "name"),
            ConflictKind::Slug => write!(f, "slug"),
        }
    }
}

/// An existing entry that blocks creating a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateConflict {
    pub kind: ConflictKind,
    /// The value that collided (website, name or slug of the candidate).
    pub value: String,
    pub existing: Entry,
}

impl std::fmt::Display for DuplicateConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entry with {} '{}' already exists: '{}' (id={})",
            self.kind, self.value, self.existing.name, self.existing.id
        )
    }
}

/// Checks a candidate against existing entries in website, name, slug order.
pub fn find_conflict<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    website: &str,
    name: &str,
    slug: &str,
) -> Option<DuplicateConflict> {
    let normalized = normalize_url(website);
    let name_lower = name.trim().to_lowercase();
    let entries: Vec<&Entry> = entries.into_iter().collect();

    let conflict = |kind: ConflictKind, value: &str, existing: &Entry| DuplicateConflict {
        kind,
        value: value.to_string(),
        existing: existing.clone(),
    };

    if let Some(e) = entries.iter().find(|e| normalize_url(&e.website) == normalized) {
        return Some(conflict(ConflictKind::Website, website, e));
    }
    if let Some(e) = entries.iter().find(|e| e.name.trim().to_lowercase() == name_lower) {
        return Some(conflict(ConflictKind::Name, name, e));
    }
    entries
        .iter()
        .find(|e| e.slug == slug)
        .map(|e| conflict(ConflictKind::Slug, slug, e))
}

// ============================================================================
// SQL Queries - ALL queries must be in models/
// ============================================================================

const ENTRY_COLUMNS: &str = "id, name, slug, website, short_description, description, \
     pricing_model, industry, is_open_source, twitter_url, linkedin_url, demo_video_url, \
     logo_path, status, sort_order, featured, created_at, updated_at";

#[derive(FromRow)]
struct EntryRow {
    id: EntryId,
    name: String,
    slug: String,
    website: String,
    short_description: String,
    description: String,
    pricing_model: PricingModel,
    industry: Industry,
    is_open_source: Option<bool>,
    twitter_url: Option<String>,
    linkedin_url: Option<String>,
    demo_video_url: Option<String>,
    logo_path: Option<String>,
    status: EntryStatus,
    sort_order: i32,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ScreenshotRow {
    path: String,
    is_primary: bool,
}

impl Entry {
    async fn hydrate(row: EntryRow, conn: &mut PgConnection) -> Result<Self> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT c.name FROM categories c
             JOIN entry_categories ec ON ec.category_id = c.id
             WHERE ec.entry_id = $1
             ORDER BY c.sort_order, c.name",
        )
        .bind(row.id)
        .fetch_all(&mut *conn)
        .await?;

        let features = sqlx::query_scalar::<_, String>(
            "SELECT name FROM entry_features WHERE entry_id = $1 ORDER BY position",
        )
        .bind(row.id)
        .fetch_all(&mut *conn)
        .await?;

        let use_cases = sqlx::query_scalar::<_, String>(
            "SELECT name FROM entry_use_cases WHERE entry_id = $1 ORDER BY position",
        )
        .bind(row.id)
        .fetch_all(&mut *conn)
        .await?;

        let screenshots = sqlx::query_as::<_, ScreenshotRow>(
            "SELECT path, is_primary FROM entry_screenshots
             WHERE entry_id = $1 ORDER BY created_at, id",
        )
        .bind(row.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            website: row.website,
            short_description: row.short_description,
            description: row.description,
            pricing_model: row.pricing_model,
            industry: row.industry,
            is_open_source: row.is_open_source,
            twitter_url: row.twitter_url,
            linkedin_url: row.linkedin_url,
            demo_video_url: row.demo_video_url,
            logo_path: row.logo_path,
            status: row.status,
            sort_order: row.sort_order,
            featured: row.featured,
            categories,
            features,
            use_cases,
            screenshots: screenshots
                .into_iter()
                .map(|s| EntryScreenshot {
                    path: s.path,
                    is_primary: s.is_primary,
                })
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    pub async fn find_by_id(id: EntryId, pool: &PgPool) -> Result<Option<Self>> {
        let mut conn = pool.acquire().await?;
        Self::find_by_id_in(id, &mut conn).await
    }

    pub async fn find_by_id_in(id: EntryId, conn: &mut PgConnection) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::hydrate(row, conn).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_filtered(filter: &EntryFilter, pool: &PgPool) -> Result<Vec<Self>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE TRUE"));
        if let Some(ids) = &filter.ids {
            query.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        query.push(" ORDER BY created_at ASC, id ASC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let mut conn = pool.acquire().await?;
        let rows = query
            .build_query_as::<EntryRow>()
            .fetch_all(&mut *conn)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(Self::hydrate(row, &mut conn).await?);
        }
        Ok(entries)
    }

    /// Duplicate check run inside the approval transaction.
    pub async fn find_conflict(
        website: &str,
        name: &str,
        slug: &str,
        conn: &mut PgConnection,
    ) -> Result<Option<DuplicateConflict>> {
        let checks = [
            (ConflictKind::Website, website, "normalized_website = $1", normalize_url(website)),
            (ConflictKind::Name, name, "lower(name) = lower($1)", name.trim().to_string()),
            (ConflictKind::Slug, slug, "slug = $1", slug.to_string()),
        ];

        for (kind, value, predicate, bind) in checks {
            let row = sqlx::query_as::<_, EntryRow>(&format!(
                "SELECT {ENTRY_COLUMNS} FROM entries WHERE {predicate} LIMIT 1"
            ))
            .bind(bind)
            .fetch_optional(&mut *conn)
            .await?;

            if let Some(row) = row {
                return Ok(Some(DuplicateConflict {
                    kind,
                    value: value.to_string(),
                    existing: Self::hydrate(row, conn).await?,
                }));
            }
        }
        Ok(None)
    }

    pub async fn insert(new: &NewEntry, conn: &mut PgConnection) -> Result<Self> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "INSERT INTO entries
                (id, name, slug, website, normalized_website, short_description, description,
                 pricing_model, industry, is_open_source, twitter_url, linkedin_url,
                 demo_video_url, logo_path, status, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(EntryId::new())
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.website)
        .bind(normalize_url(&new.website))
        .bind(&new.short_description)
        .bind(&new.description)
        .bind(new.pricing_model)
        .bind(new.industry)
        .bind(new.is_open_source)
        .bind(&new.twitter_url)
        .bind(&new.linkedin_url)
        .bind(&new.demo_video_url)
        .bind(&new.logo_path)
        .bind(new.status)
        .bind(new.sort_order)
        .fetch_one(&mut *conn)
        .await?;

        let id = row.id;
        for name in &new.categories {
            Self::add_category(id, name, conn).await?;
        }
        Self::replace_names("entry_features", id, &new.features, conn).await?;
        Self::replace_names("entry_use_cases", id, &new.use_cases, conn).await?;
        for path in &new.screenshots {
            Self::add_screenshot(id, path, conn).await?;
        }

        Self::hydrate(row, conn).await
    }

    pub async fn apply_update(
        id: EntryId,
        update: &EntryUpdate,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "UPDATE entries
             SET short_description = COALESCE($2, short_description),
                 description = COALESCE($3, description),
                 pricing_model = COALESCE($4, pricing_model),
                 industry = COALESCE($5, industry),
                 is_open_source = COALESCE($6, is_open_source),
                 twitter_url = COALESCE($7, twitter_url),
                 linkedin_url = COALESCE($8, linkedin_url),
                 demo_video_url = COALESCE($9, demo_video_url),
                 logo_path = COALESCE($10, logo_path),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(id)
        .bind(&update.short_description)
        .bind(&update.description)
        .bind(update.pricing_model)
        .bind(update.industry)
        .bind(update.is_open_source)
        .bind(&update.twitter_url)
        .bind(&update.linkedin_url)
        .bind(&update.demo_video_url)
        .bind(&update.logo_path)
        .fetch_one(&mut *conn)
        .await?;

        if let Some(features) = &update.features {
            Self::replace_names("entry_features", id, features, conn).await?;
        }
        if let Some(use_cases) = &update.use_cases {
            Self::replace_names("entry_use_cases", id, use_cases, conn).await?;
        }
        if let Some(category) = &update.category {
            sqlx::query("DELETE FROM entry_categories WHERE entry_id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?;
            Self::add_category(id, category, conn).await?;
        }
        if let Some(path) = &update.screenshot_path {
            Self::add_screenshot(id, path, conn).await?;
        }

        Self::hydrate(row, conn).await
    }

    async fn add_category(id: EntryId, name: &str, conn: &mut PgConnection) -> Result<()> {
        let category = Category::get_or_create(name, conn).await?;
        sqlx::query(
            "INSERT INTO entry_categories (entry_id, category_id)
             VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(category.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// `table` is one of the fixed child tables, never user input.
    async fn replace_names(
        table: &'static str,
        id: EntryId,
        names: &[String],
        conn: &mut PgConnection,
    ) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {table} WHERE entry_id = $1"))
            .bind(id)
            .execute(&mut *conn)
            .await?;

        for (position, name) in names.iter().enumerate() {
            sqlx::query(&format!(
                "INSERT INTO {table} (entry_id, position, name) VALUES ($1, $2, $3)"
            ))
            .bind(id)
            .bind(position as i32)
            .bind(name)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn add_screenshot(id: EntryId, path: &str, conn: &mut PgConnection) -> Result<()> {
        sqlx::query(
            "INSERT INTO entry_screenshots (id, entry_id, path, is_primary)
             VALUES ($1, $2, $3,
                     NOT EXISTS (SELECT 1 FROM entry_screenshots WHERE entry_id = $2))",
        )
        .bind(uuid::Uuid::now_v7())
        .bind(id)
        .bind(path)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, slug: &str, website: &str) -> Entry {
        Entry {
            id: EntryId::new(),
            name: name.into(),
            slug: slug.into(),
            website: website.into(),
            short_description: String::new(),
            description: String::new(),
            pricing_model: PricingModel::Unknown,
            industry: Industry::Unknown,
            is_open_source: None,
            twitter_url: None,
            linkedin_url: None,
            demo_video_url: None,
            logo_path: None,
            status: EntryStatus::Published,
            sort_order: 10,
            featured: false,
            categories: vec![],
            features: vec![],
            use_cases: vec![],
            screenshots: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn video_urls() {
        assert!(is_valid_video_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_valid_video_url("https://youtu.be/abc"));
        assert!(is_valid_video_url("https://www.loom.com/share/abc"));
        assert!(!is_valid_video_url("https://youtube.com/thumb.png"));
        assert!(!is_valid_video_url("https://foo.ai/demo.mp4"));
        assert!(!is_valid_video_url(""));
    }

    #[test]
    fn lenient_enum_parsing() {
        assert_eq!(PricingModel::from_extracted(" freemium "), Some(PricingModel::Freemium));
        assert_eq!(PricingModel::from_extracted("pay what you want"), None);
        assert_eq!(
            Industry::from_extracted("customer service"),
            Some(Industry::CustomerService)
        );
        assert_eq!(Industry::from_extracted("E-Commerce"), Some(Industry::Ecommerce));
    }

    #[test]
    fn conflict_precedence_is_website_name_slug() {
        let existing = vec![
            entry("ZenFlow", "zenflow", "https://zenflow.ai"),
            entry("Other", "other", "https://www.foo.ai/"),
        ];

        let by_website = find_conflict(&existing, "https://foo.ai", "ZenFlow", "zenflow").unwrap();
        assert_eq!(by_website.kind, ConflictKind::Website);
        assert_eq!(by_website.existing.name, "Other");

        let by_name = find_conflict(&existing, "https://new.ai", "zenflow", "zenflow").unwrap();
        assert_eq!(by_name.kind, ConflictKind::Name);

        let by_slug = find_conflict(&existing, "https://new.ai", "Zen Flow!", "zenflow").unwrap();
        assert_eq!(by_slug.kind, ConflictKind::Slug);
        assert_eq!(
            by_slug.to_string(),
            format!(
                "Entry with slug 'zenflow' already exists: 'ZenFlow' (id={})",
                existing[0].id
            )
        );

        assert!(find_conflict(&existing, "https://new.ai", "New", "new").is_none());
    }

    #[test]
    fn update_leaves_unset_fields_alone() {
        let mut e = entry("Foo", "foo", "https://foo.ai");
        e.description = "Curated".into();
        e.is_open_source = Some(true);

        let update = EntryUpdate {
            short_description: Some("Short".into()),
            is_open_source: Some(false),
            screenshot_path: Some("agents/screenshots/foo_1.png".into()),
            ..Default::default()
        };
        e.apply(&update);

        assert_eq!(e.description, "Curated");
        assert_eq!(e.short_description, "Short");
        assert_eq!(e.is_open_source, Some(false));
        assert!(e.screenshots[0].is_primary);
        assert_eq!(
            update.applied_fields(),
            vec!["short_description", "is_open_source", "screenshot"]
        );
    }
}
