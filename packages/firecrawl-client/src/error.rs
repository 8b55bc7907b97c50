//! Error types for the Firecrawl client.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FirecrawlError>;

#[derive(Debug, Error)]
pub enum FirecrawlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx HTTP response
    #[error("Firecrawl API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 2xx response with `success: false`
    #[error("Firecrawl reported failure: {0}")]
    Unsuccessful(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FirecrawlError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status == 408 || *status >= 500,
            Self::Config(_) | Self::Unsuccessful(_) | Self::Parse(_) => false,
        }
    }
}
