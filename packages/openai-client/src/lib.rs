//! Pure OpenAI REST API client
//!
//! A small client for chat completions and strict structured outputs with no
//! directory-specific logic.
//!
//! ```rust,ignore
//! use openai_client::OpenAIClient;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Verdict {
//!     decision: String,
//!     confidence: f64,
//! }
//!
//! let client = OpenAIClient::from_env()?.with_timeout(Duration::from_secs(60));
//! let verdict: Verdict = client.extract("gpt-4o-mini", system_prompt, user_prompt).await?;
//! ```

pub mod error;
pub mod schema;
pub mod types;

pub use error::{OpenAIError, Result};
pub use schema::StructuredOutput;
pub use types::*;

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Point at a proxy or a local mock server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Per-request timeout. Expiry surfaces as [`OpenAIError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Type-safe structured output.
    ///
    /// Generates a strict schema for `T`, sends it as the response format and
    /// deserializes the returned JSON.
    pub async fn extract<T: StructuredOutput>(
        &self,
        model: &str,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let request = StructuredRequest::new(
            model,
            system_prompt,
            user_prompt,
            T::type_name(),
            T::openai_schema(),
        );
        let json = self.structured_output(request).await?;

        serde_json::from_str(&json)
            .map_err(|e| OpenAIError::Parse(format!("Failed to deserialize {}: {}", T::type_name(), e)))
    }

    /// Structured output with a caller-provided schema. Returns the raw JSON text.
    pub async fn structured_output(&self, request: StructuredRequest) -> Result<String> {
        let raw = self.post_chat(&request.model, &request).await?;
        first_content(raw)
    }

    async fn post_chat<B: Serialize>(&self, model: &str, body: &B) -> Result<types::ChatResponseRaw> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, "OpenAI API error");
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        debug!(
            model = %model,
            duration_ms = start.elapsed().as_millis() as u64,
            total_tokens = raw.usage.as_ref().map(|u| u.total_tokens),
            "OpenAI chat completion"
        );

        Ok(raw)
    }

    fn transport_error(&self, error: reqwest::Error) -> OpenAIError {
        if error.is_timeout() {
            warn!(timeout_secs = self.timeout.as_secs(), "OpenAI request timed out");
            OpenAIError::Timeout(self.timeout.as_secs())
        } else {
            warn!(error = %error, "OpenAI request failed");
            OpenAIError::Network(error.to_string())
        }
    }
}

fn first_content(raw: types::ChatResponseRaw) -> Result<String> {
    let message = raw
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| OpenAIError::Parse("response contained no choices".into()))?;

    if let Some(refusal) = message.refusal {
        return Err(OpenAIError::Refusal(refusal));
    }

    message
        .content
        .ok_or_else(|| OpenAIError::Parse("response message had no content".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> types::ChatResponseRaw {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn client_builder() {
        let client = OpenAIClient::new("sk-test")
            .with_base_url("http://localhost:8089/v1/")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(client.base_url(), "http://localhost:8089/v1");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn first_content_returns_message_text() {
        let response = raw(serde_json::json!({
            "choices": [{"message": {"content": "{\"decision\":\"approved\"}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }));

        assert_eq!(first_content(response).unwrap(), "{\"decision\":\"approved\"}");
    }

    #[test]
    fn refusals_are_errors() {
        let response = raw(serde_json::json!({
            "choices": [{"message": {"content": null, "refusal": "I can't help with that"}}]
        }));

        assert!(matches!(first_content(response), Err(OpenAIError::Refusal(_))));
    }

    #[test]
    fn empty_choices_are_parse_errors() {
        let response = raw(serde_json::json!({"choices": []}));
        assert!(matches!(first_content(response), Err(OpenAIError::Parse(_))));
    }
}
