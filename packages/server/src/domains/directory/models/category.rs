use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::common::text::slugify;
use crate::common::CategoryId;

/// Categories the extraction prompt chooses from, in display order.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Commerce",
    "Developer Tools",
    "Digital Workers",
    "General Assistant",
    "Hardware + Software",
    "Open Source",
    "Research Labs",
    "Task Automation",
    "Voice Agents",
    "Agent Platform",
    "Blockchain",
    "Business Automation",
    "Customer Support",
    "Marketing",
    "AI Agent Framework",
    "Social Media",
    "AI Agency",
    "Risk Management",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub sort_order: i32,
}

// ============================================================================
// SQL Queries - ALL queries must be in models/
// ============================================================================

impl Category {
    /// Looks a category up by case-insensitive name or slug, creating it
    /// when neither exists.
    pub async fn get_or_create(name: &str, conn: &mut PgConnection) -> Result<Self> {
        let name = name.trim();
        let slug = slugify(name);

        sqlx::query(
            "INSERT INTO categories (id, name, slug, sort_order)
             VALUES ($1, $2, $3, 1)
             ON CONFLICT DO NOTHING",
        )
        .bind(CategoryId::new())
        .bind(name)
        .bind(&slug)
        .execute(&mut *conn)
        .await?;

        let category = sqlx::query_as::<_, Self>(
            "SELECT id, name, slug, sort_order FROM categories
             WHERE lower(name) = lower($1) OR slug = $2
             ORDER BY (lower(name) = lower($1)) DESC
             LIMIT 1",
        )
        .bind(name)
        .bind(&slug)
        .fetch_one(&mut *conn)
        .await?;
        Ok(category)
    }

    pub async fn seed_defaults(pool: &PgPool) -> Result<u64> {
        let mut inserted = 0;
        for (index, name) in DEFAULT_CATEGORIES.iter().enumerate() {
            let result = sqlx::query(
                "INSERT INTO categories (id, name, slug, sort_order)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT DO NOTHING",
            )
            .bind(CategoryId::new())
            .bind(name)
            .bind(slugify(name))
            .bind(index as i32 + 1)
            .execute(pool)
            .await?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        let categories = sqlx::query_as::<_, Self>(
            "SELECT id, name, slug, sort_order FROM categories ORDER BY sort_order, name",
        )
        .fetch_all(pool)
        .await?;
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_category_slugs_are_unique() {
        let mut slugs: Vec<String> = DEFAULT_CATEGORIES.iter().map(|c| slugify(c)).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), DEFAULT_CATEGORIES.len());
        assert!(slugs.contains(&"hardware-software".to_string()));
    }
}
