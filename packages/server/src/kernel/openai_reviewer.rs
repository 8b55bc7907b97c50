//! OpenAI implementation of the review gateway (strict structured output).

use async_trait::async_trait;
use openai_client::{OpenAIClient, OpenAIError};

use super::traits::{BaseReviewGateway, GatewayError};
use crate::domains::review::models::ReviewVerdict;

pub struct OpenAIReviewer {
    client: OpenAIClient,
    model: String,
}

impl OpenAIReviewer {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

fn map_error(error: OpenAIError) -> GatewayError {
    let transient = error.is_transient();
    match error {
        OpenAIError::Timeout(secs) => GatewayError::Timeout(secs),
        OpenAIError::Network(message) => GatewayError::Network(message),
        OpenAIError::Parse(message) => GatewayError::InvalidResponse(message),
        other => GatewayError::Service {
            message: other.to_string(),
            transient,
        },
    }
}

#[async_trait]
impl BaseReviewGateway for OpenAIReviewer {
    async fn classify(&self, system: &str, prompt: &str) -> Result<ReviewVerdict, GatewayError> {
        self.client
            .extract::<ReviewVerdict>(&self.model, system, prompt)
            .await
            .map_err(map_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusals_are_permanent() {
        let mapped = map_error(OpenAIError::Refusal("no".into()));
        assert!(!mapped.is_transient());
        assert_eq!(mapped.to_string(), "Model refused: no");

        assert!(map_error(OpenAIError::Api {
            status: 429,
            message: "slow down".into()
        })
        .is_transient());
    }
}
