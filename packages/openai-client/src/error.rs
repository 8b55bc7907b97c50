//! Error types for the OpenAI client.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpenAIError>;

#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Missing API key or invalid client settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request did not finish within the client timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Connection failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The model declined to produce the requested structure
    #[error("Model refused: {0}")]
    Refusal(String),

    /// Unexpected or undeserializable response body
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OpenAIError {
    /// Timeouts, connection failures, rate limits and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) | Self::Refusal(_) | Self::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        let limited = OpenAIError::Api { status: 429, message: "slow down".into() };
        let outage = OpenAIError::Api { status: 503, message: "unavailable".into() };
        let bad_request = OpenAIError::Api { status: 400, message: "bad schema".into() };

        assert!(limited.is_transient());
        assert!(outage.is_transient());
        assert!(!bad_request.is_transient());
        assert!(OpenAIError::Timeout(30).is_transient());
        assert!(!OpenAIError::Parse("eof".into()).is_transient());
    }
}
