//! Source plugins - where candidate products come from.

pub mod queries;
pub mod serp;
pub mod url_list;

use anyhow::Result;
use async_trait::async_trait;

use crate::domains::sourcing::models::DiscoveredCandidate;

pub use serp::SerpSource;
pub use url_list::UrlListSource;

/// A discovery backend driven by the sourcing orchestrator.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Stable identifier recorded on runs and submissions (e.g. `serp`).
    fn source_id(&self) -> &str;

    /// Up to `limit` candidates. Classification and dedup happen afterwards.
    async fn discover(&self, limit: usize) -> Result<Vec<DiscoveredCandidate>>;

    fn is_available(&self) -> bool;

    /// Configuration snapshot stored on the sourcing run.
    fn config(&self) -> serde_json::Value;
}
