use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::types::{GenerateContentRequest, GenerateContentResponse};
use super::ContentGenerator;
use crate::config::{GeminiConfig, RequestConfig};
use crate::error::{AiError, AiResult};

/// Client for the Gemini `generateContent` REST API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// A missing API key is accepted here and reported on the first call.
    pub fn new(config: &GeminiConfig, request_config: &RequestConfig) -> AiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model name requests are sent to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether an API key is configured
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Send one request and return the parsed response body
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> AiResult<GenerateContentResponse> {
        let api_key = self.api_key.as_deref().ok_or(AiError::MissingCredentials)?;

        debug!(
            model = %self.model,
            turns = request.contents.len(),
            structured = request.is_structured(),
            "Calling Gemini"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "Gemini request failed");
                AiError::from(e)
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(
                model = %self.model,
                status = status.as_u16(),
                latency_ms = start.elapsed().as_millis(),
                "Gemini returned an error status"
            );
            return Err(AiError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| AiError::EmptyOrInvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        info!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis(),
            total_tokens = body.usage_metadata.as_ref().and_then(|u| u.total_token_count),
            "Gemini call succeeded"
        );

        Ok(body)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: GenerateContentRequest) -> AiResult<String> {
        let response = self.generate_content(&request).await?;

        match response.text() {
            Some(text) => Ok(text),
            None => Err(AiError::EmptyOrInvalidResponse {
                message: match response.prompt_feedback.and_then(|f| f.block_reason) {
                    Some(reason) => format!("prompt blocked: {}", reason),
                    None => "no candidates returned".to_string(),
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = GeminiConfig {
            api_key: Some("test_key".to_string()),
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
            model: "gemini-2.5-flash".to_string(),
        };

        let client = GeminiClient::new(&config, &RequestConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://generativelanguage.googleapis.com");
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(client.has_credentials());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let config = GeminiConfig {
            api_key: None,
            // Unroutable; a network attempt would surface as TransportFailure.
            base_url: "http://127.0.0.1:9".to_string(),
            model: "gemini-2.5-flash".to_string(),
        };
        let client = GeminiClient::new(&config, &RequestConfig::default()).unwrap();

        let err = client
            .generate(GenerateContentRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::MissingCredentials));
    }
}
