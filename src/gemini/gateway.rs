use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{ChatSession, ContentGenerator, GenerateContentRequest};
use crate::error::{AiError, AiResult};
use crate::model::ComparativeAnalysis;
use crate::prompts::PromptPayload;

/// A type the model can be asked to produce as JSON.
pub trait StructuredResponse: DeserializeOwned {
    /// Reject values the response schema cannot rule out.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl StructuredResponse for ComparativeAnalysis {
    fn validate(&self) -> Result<(), String> {
        self.check_ranges()
    }
}

/// Enforces the output contract of every AI call.
#[derive(Clone)]
pub struct AiGateway {
    generator: Arc<dyn ContentGenerator>,
}

impl AiGateway {
    /// Gateway over any generator.
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }

    /// Request free text; empty answers are errors.
    pub async fn send_text(&self, payload: &PromptPayload) -> AiResult<String> {
        let start = Instant::now();
        debug!(prompt_chars = payload.prompt.len(), "Sending text request");

        let text = self
            .generator
            .generate(GenerateContentRequest::from(payload))
            .await?;

        if text.trim().is_empty() {
            warn!("Model returned an empty answer");
            return Err(AiError::EmptyOrInvalidResponse {
                message: "model returned no text".to_string(),
            });
        }

        info!(
            latency_ms = start.elapsed().as_millis(),
            answer_chars = text.len(),
            "Text generation completed"
        );
        Ok(text)
    }

    /// Request JSON constrained to the payload's schema and decode it as `T`.
    pub async fn send_structured<T: StructuredResponse>(
        &self,
        payload: &PromptPayload,
    ) -> AiResult<T> {
        if !payload.is_structured() {
            return Err(AiError::EmptyOrInvalidResponse {
                message: "structured request is missing a response schema".to_string(),
            });
        }

        let start = Instant::now();
        let text = self
            .generator
            .generate(GenerateContentRequest::from(payload))
            .await?;

        let value = parse_structured::<T>(&text)?;

        info!(
            latency_ms = start.elapsed().as_millis(),
            "Structured generation completed"
        );
        Ok(value)
    }

    /// Open a chat bound to `system_instruction`.
    pub fn chat(&self, system_instruction: impl Into<String>) -> ChatSession {
        ChatSession::new(Arc::clone(&self.generator), system_instruction)
    }
}

/// Decode and validate a JSON answer.
pub(crate) fn parse_structured<T: StructuredResponse>(text: &str) -> AiResult<T> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(AiError::EmptyOrInvalidResponse {
            message: "model returned no text".to_string(),
        });
    }

    let value: T = serde_json::from_str(body).map_err(|e| AiError::EmptyOrInvalidResponse {
        message: format!("response does not match schema: {}", e),
    })?;

    value
        .validate()
        .map_err(|message| AiError::EmptyOrInvalidResponse { message })?;
    Ok(value)
}

/// Unwrap a ```json fenced block if the model added one.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::MockContentGenerator;
    use serde_json::json;

    fn analysis_json() -> serde_json::Value {
        json!({
            "executiveSummary": "Winners quantified impact.",
            "winningStrengths": ["metrics"],
            "losingWeaknesses": ["vague plans"],
            "keyThemes": [{
                "name": "Impact",
                "description": "Measured outcomes",
                "sentiment": "POSITIVE",
                "impactScore": 9,
                "frequency": 2
            }],
            "actionableAdvice": ["add numbers"],
            "successRateByTheme": [{ "theme": "Impact", "rate": 0.9 }]
        })
    }

    fn gateway_returning(answer: &'static str) -> AiGateway {
        let mut mock = MockContentGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(move |_| Ok(answer.to_string()));
        AiGateway::new(Arc::new(mock))
    }

    #[test]
    fn test_parse_structured_valid() {
        let analysis: ComparativeAnalysis =
            parse_structured(&analysis_json().to_string()).unwrap();
        assert_eq!(analysis.key_themes[0].impact_score, 9.0);
    }

    #[test]
    fn test_parse_structured_fenced() {
        let text = format!("```json\n{}\n```", analysis_json());
        assert!(parse_structured::<ComparativeAnalysis>(&text).is_ok());
    }

    #[test]
    fn test_parse_structured_missing_field() {
        let mut value = analysis_json();
        value.as_object_mut().unwrap().remove("keyThemes");
        let err = parse_structured::<ComparativeAnalysis>(&value.to_string()).unwrap_err();
        assert!(matches!(err, AiError::EmptyOrInvalidResponse { .. }));
    }

    #[test]
    fn test_parse_structured_out_of_range() {
        let mut value = analysis_json();
        value["successRateByTheme"][0]["rate"] = json!(90);
        let err = parse_structured::<ComparativeAnalysis>(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("outside 0.0-1.0"));
    }

    #[test]
    fn test_parse_structured_empty() {
        let err = parse_structured::<ComparativeAnalysis>("   ").unwrap_err();
        assert!(matches!(err, AiError::EmptyOrInvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_send_text_rejects_blank_answer() {
        let gateway = gateway_returning("  \n ");
        let err = gateway
            .send_text(&PromptPayload::text("Write"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyOrInvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_send_text_returns_answer() {
        let gateway = gateway_returning("A fine draft.");
        let text = gateway.send_text(&PromptPayload::text("Write")).await.unwrap();
        assert_eq!(text, "A fine draft.");
    }

    #[tokio::test]
    async fn test_send_structured_requires_schema() {
        let mock = MockContentGenerator::new();
        let gateway = AiGateway::new(Arc::new(mock));
        let err = gateway
            .send_structured::<ComparativeAnalysis>(&PromptPayload::text("Analyze"))
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyOrInvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_send_structured_sends_json_config() {
        let mut mock = MockContentGenerator::new();
        mock.expect_generate()
            .withf(|request| request.is_structured())
            .times(1)
            .returning(|_| Ok(analysis_json().to_string()));
        let gateway = AiGateway::new(Arc::new(mock));

        let payload = PromptPayload::text("Analyze").with_schema(json!({ "type": "OBJECT" }));
        let analysis: ComparativeAnalysis = gateway.send_structured(&payload).await.unwrap();
        assert_eq!(analysis.winning_strengths, vec!["metrics".to_string()]);
    }
}
