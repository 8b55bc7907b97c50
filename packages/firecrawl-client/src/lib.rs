//! Pure Firecrawl REST API client
//!
//! Covers the two endpoints the directory pipeline needs: single-page
//! `/scrape` with multiple output formats, and `/search`.
//!
//! ```rust,ignore
//! use firecrawl_client::{FirecrawlClient, Format, ScrapeRequest};
//!
//! let client = FirecrawlClient::from_env()?;
//! let page = client
//!     .scrape(&ScrapeRequest::new("https://example.com", vec![Format::Markdown]))
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{FirecrawlError, Result};
pub use types::*;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v2";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct FirecrawlClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl FirecrawlClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    /// Client whose every request is bounded by `timeout`.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(FirecrawlError::Config("Firecrawl API key is empty".into()));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FirecrawlError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: FIRECRAWL_API_URL.to_string(),
            timeout,
        })
    }

    /// Create from environment variable `FIRECRAWL_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("FIRECRAWL_API_KEY")
            .map_err(|_| FirecrawlError::Config("FIRECRAWL_API_KEY not set".into()))?;
        Self::new(api_key)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Scrape one page in the requested formats.
    pub async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeData> {
        let response: types::ScrapeResponse = self.post("/scrape", request).await?;

        if !response.success {
            return Err(FirecrawlError::Unsuccessful(
                response.error.unwrap_or_else(|| format!("scrape of {} failed", request.url)),
            ));
        }

        response
            .data
            .ok_or_else(|| FirecrawlError::Parse("No data returned from Firecrawl".into()))
    }

    /// Web search. Returns the `web` result list in rank order.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let response: types::SearchResponse = self.post("/search", request).await?;

        if !response.success {
            return Err(FirecrawlError::Unsuccessful(
                response
                    .error
                    .unwrap_or_else(|| format!("search for '{}' failed", request.query)),
            ));
        }

        Ok(response.data.unwrap_or_default().web)
    }

    async fn post<T: Serialize, R: DeserializeOwned>(&self, endpoint: &str, body: &T) -> Result<R> {
        let start = std::time::Instant::now();
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(endpoint, status = %status, error = %message, "Firecrawl API error");
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = response
            .json()
            .await
            .map_err(|e| FirecrawlError::Parse(e.to_string()))?;

        debug!(
            endpoint,
            duration_ms = start.elapsed().as_millis() as u64,
            "Firecrawl request completed"
        );

        Ok(parsed)
    }

    fn transport_error(&self, endpoint: &str, error: reqwest::Error) -> FirecrawlError {
        if error.is_timeout() {
            warn!(endpoint, timeout_secs = self.timeout.as_secs(), "Firecrawl request timed out");
            FirecrawlError::Timeout(self.timeout.as_secs())
        } else {
            warn!(endpoint, error = %error, "Firecrawl request failed");
            FirecrawlError::Network(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(matches!(
            FirecrawlClient::new("  "),
            Err(FirecrawlError::Config(_))
        ));
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let client = FirecrawlClient::new("fc-test")
            .unwrap()
            .with_base_url("http://localhost:3002/v2/");
        assert_eq!(client.base_url(), "http://localhost:3002/v2");
    }

    #[test]
    fn transient_errors() {
        assert!(FirecrawlError::Timeout(120).is_transient());
        assert!(FirecrawlError::Api { status: 502, message: String::new() }.is_transient());
        assert!(!FirecrawlError::Api { status: 402, message: String::new() }.is_transient());
        assert!(!FirecrawlError::Unsuccessful("blocked".into()).is_transient());
    }
}
