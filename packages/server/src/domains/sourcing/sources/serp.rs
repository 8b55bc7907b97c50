//! Web search discovery.
//!
//! In extraction mode every search result page is scraped with a listing
//! schema, so blog posts and listicles yield the products they mention. In
//! direct mode the search results themselves are the candidates.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};
use typed_builder::TypedBuilder;

use super::SourcePlugin;
use crate::domains::sourcing::models::DiscoveredCandidate;
use crate::kernel::{
    call_with_retry, BaseWebSearcher, GatewayError, RetryPolicy, StructuredOutput,
    WebSearchHit, WebSearchRequest,
};

pub const SERP_SOURCE_ID: &str = "serp";

pub const AGENT_LISTING_PROMPT: &str = "Extract all AI agent products mentioned on this page. An AI agent is:
- Autonomous software that performs tasks using AI/ML
- Software that can take actions on behalf of users
- AI-powered automation tools with agent-like capabilities
- Platforms for building or running AI agents

For each AI agent found, extract:
- name: The product name
- website: The official product website URL (NOT social media, blog posts, or directory links)
- description: A brief description of what it does

IMPORTANT:
- Only include actual AI agent products, not blog posts or directories
- Skip social media links (twitter, linkedin, etc.)
- Skip generic tools that aren't AI agents
- The website should be the product's homepage (e.g., https://example.com not https://blog.example.com/article)";

/// Products listed on one search result page.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct AgentListing {
    /// List of AI agent products found on this page
    #[serde(default)]
    pub agents: Vec<ListedAgent>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListedAgent {
    /// Name of the AI agent product
    #[serde(default)]
    pub name: String,
    /// Official website URL of the AI agent (not social media or blog links)
    #[serde(default)]
    pub website: String,
    /// Brief description of what the AI agent does
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(TypedBuilder)]
pub struct SerpSource {
    searcher: Arc<dyn BaseWebSearcher>,
    #[builder(setter(into))]
    queries: Vec<String>,
    #[builder(default = 10)]
    results_per_query: u32,
    /// Scrape each result with the listing schema instead of using the
    /// result itself.
    #[builder(default = true)]
    extract_agents: bool,
    /// Search time window, e.g. `qdr:w`.
    #[builder(default, setter(into))]
    tbs: Option<String>,
    #[builder(default, setter(into))]
    location: Option<String>,
    #[builder(default = Duration::from_secs(120))]
    timeout: Duration,
    #[builder(default)]
    retry: RetryPolicy,
}

impl SerpSource {
    async fn search(&self, query: &str) -> Result<Vec<DiscoveredCandidate>, GatewayError> {
        let request = WebSearchRequest {
            query: query.to_string(),
            limit: self.results_per_query,
            tbs: self.tbs.clone(),
            location: self.location.clone(),
            structured: self
                .extract_agents
                .then(|| (AgentListing::openai_schema(), AGENT_LISTING_PROMPT.to_string())),
        };

        let hits = call_with_retry(self.retry, self.timeout, "search", || {
            self.searcher.search(&request)
        })
        .await?;

        let candidates = if self.extract_agents {
            hits.iter().flat_map(|hit| listed_candidates(query, hit)).collect()
        } else {
            hits.iter().filter_map(|hit| direct_candidate(query, hit)).collect()
        };
        Ok(candidates)
    }
}

fn listed_candidates(query: &str, hit: &WebSearchHit) -> Vec<DiscoveredCandidate> {
    let listing = hit
        .structured
        .clone()
        .and_then(|value| serde_json::from_value::<AgentListing>(value).ok())
        .unwrap_or_default();

    if listing.agents.is_empty() {
        debug!(url = %hit.url, "No agents extracted");
    }

    listing
        .agents
        .into_iter()
        .filter(|agent| !agent.name.trim().is_empty() && !agent.website.trim().is_empty())
        .map(|agent| {
            DiscoveredCandidate::new(
                &agent.name,
                &agent.website,
                agent.description.as_deref().unwrap_or_default(),
                SERP_SOURCE_ID,
            )
            .with_source_url(hit.url.clone())
            .with_metadata("query", query)
            .with_metadata("found_in", hit.title.clone().unwrap_or_default())
            .with_metadata("extraction_method", "json")
        })
        .collect()
}

fn direct_candidate(query: &str, hit: &WebSearchHit) -> Option<DiscoveredCandidate> {
    if hit.url.trim().is_empty() {
        return None;
    }
    Some(
        DiscoveredCandidate::new(
            hit.title.as_deref().unwrap_or("Unknown"),
            &hit.url,
            hit.description.as_deref().unwrap_or_default(),
            SERP_SOURCE_ID,
        )
        .with_source_url(format!("search:{}", query))
        .with_metadata("query", query)
        .with_metadata("position", json!(hit.position))
        .with_metadata("extraction_method", "direct"),
    )
}

/// Key for per-source dedup: lowercase, trailing slashes dropped.
fn seen_key(website: &str) -> String {
    website.to_lowercase().trim_end_matches('/').to_string()
}

#[async_trait]
impl SourcePlugin for SerpSource {
    fn source_id(&self) -> &str {
        SERP_SOURCE_ID
    }

    /// Runs queries in order until `limit` unique candidates are found. A
    /// failed query is logged and skipped; the run only fails when every
    /// query failed.
    async fn discover(&self, limit: usize) -> Result<Vec<DiscoveredCandidate>> {
        let mut discovered = Vec::new();
        let mut seen = HashSet::new();
        let mut failures = 0;
        let mut last_error = None;

        for query in &self.queries {
            if discovered.len() >= limit {
                break;
            }

            match self.search(query).await {
                Ok(candidates) => {
                    for candidate in candidates {
                        if discovered.len() >= limit {
                            break;
                        }
                        if seen.insert(seen_key(&candidate.website)) {
                            discovered.push(candidate);
                        }
                    }
                }
                Err(e) => {
                    error!(query = %query, error = %e, "Search failed");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            if failures == self.queries.len() {
                anyhow::bail!("All {} search queries failed, last error: {}", failures, e);
            }
        }

        info!(
            discovered = discovered.len(),
            queries = self.queries.len(),
            "SERP discovery complete"
        );
        Ok(discovered)
    }

    fn is_available(&self) -> bool {
        !self.queries.is_empty()
    }

    fn config(&self) -> serde_json::Value {
        json!({
            "queries": self.queries,
            "results_per_query": self.results_per_query,
            "extract_agents": self.extract_agents,
            "tbs": self.tbs,
            "location": self.location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockWebSearcher;

    fn listing_hit(url: &str, agents: serde_json::Value) -> WebSearchHit {
        WebSearchHit {
            url: url.to_string(),
            title: Some("Top agents".into()),
            structured: Some(json!({ "agents": agents })),
            ..Default::default()
        }
    }

    fn source(searcher: Arc<MockWebSearcher>, queries: &[&str]) -> SerpSource {
        SerpSource::builder()
            .searcher(searcher)
            .queries(queries.iter().map(|q| q.to_string()).collect::<Vec<_>>())
            .retry(RetryPolicy::none())
            .build()
    }

    #[tokio::test]
    async fn extraction_mode_dedups_and_stops_at_limit() {
        let searcher = Arc::new(
            MockWebSearcher::new()
                .with_hits(vec![listing_hit(
                    "https://blog.example.com/top-agents",
                    json!([
                        {"name": "Foo", "website": "foo.ai", "description": "Support agent"},
                        {"name": "", "website": "https://nameless.ai"},
                        {"name": "Foo again", "website": "https://FOO.ai/"},
                        {"name": "Bar", "website": "https://bar.ai"}
                    ]),
                )])
                .with_hits(vec![listing_hit(
                    "https://news.example.com/agents",
                    json!([{"name": "Baz", "website": "https://baz.ai"}]),
                )]),
        );
        let serp = source(searcher.clone(), &["AI agent tool", "LLM agent"]);

        let found = serp.discover(2).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].website, "https://foo.ai");
        assert_eq!(found[0].source_url, "https://blog.example.com/top-agents");
        assert_eq!(found[0].metadata["query"], "AI agent tool");
        assert_eq!(found[0].metadata["extraction_method"], "json");
        assert_eq!(found[1].name, "Bar");
        assert_eq!(searcher.call_count(), 1);
        assert!(searcher.calls()[0].structured.is_some());
    }

    #[tokio::test]
    async fn direct_mode_uses_results() {
        let searcher = Arc::new(MockWebSearcher::new().with_hits(vec![WebSearchHit {
            url: "https://foo.ai".into(),
            title: Some("Foo - autonomous agent".into()),
            position: Some(1),
            ..Default::default()
        }]));
        let serp = SerpSource::builder()
            .searcher(searcher.clone())
            .queries(vec!["AI agent tool".to_string()])
            .extract_agents(false)
            .tbs(Some("qdr:w".to_string()))
            .retry(RetryPolicy::none())
            .build();

        let found = serp.discover(10).await.unwrap();

        assert_eq!(found[0].name, "Foo - autonomous agent");
        assert_eq!(found[0].source_url, "search:AI agent tool");
        assert_eq!(found[0].metadata["position"], 1);
        let call = &searcher.calls()[0];
        assert!(call.structured.is_none());
        assert_eq!(call.tbs.as_deref(), Some("qdr:w"));
        assert_eq!(call.limit, 10);
    }

    #[tokio::test]
    async fn fails_only_when_every_query_fails() {
        let searcher = Arc::new(
            MockWebSearcher::new()
                .with_error(GatewayError::Network("reset".into()))
                .with_hits(vec![]),
        );
        let partial = source(searcher, &["a", "b"]);
        assert!(partial.discover(10).await.unwrap().is_empty());

        let searcher = Arc::new(
            MockWebSearcher::new().with_error(GatewayError::Network("reset".into())),
        );
        let failing = source(searcher, &["a"]);
        assert!(failing.discover(10).await.is_err());
    }
}
