use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{ChatMessage, ChatRole};
use crate::prompts::PromptPayload;

/// Role of a content turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    /// End user turn
    User,
    /// Model turn
    Model,
}

/// One text part of a content turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Text of the part
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on reasoning parts that are not part of the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

/// A content turn: role plus parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Absent on system instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ContentRole>,
    /// Ordered parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Generation parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// `application/json` for structured output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// OpenAPI-style schema the JSON must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns, oldest first
    pub contents: Vec<Content>,
    /// System instruction, role-less
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// Generation parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Response body from `generateContent`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidates; empty when the prompt was blocked
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Block information
    pub prompt_feedback: Option<PromptFeedback>,
    /// Token counts
    pub usage_metadata: Option<UsageMetadata>,
}

/// A response candidate
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content
    pub content: Option<Content>,
    /// e.g. `STOP`, `MAX_TOKENS`, `SAFETY`
    pub finish_reason: Option<String>,
}

/// Why a prompt was blocked, if it was
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// e.g. `SAFETY`
    pub block_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the request
    pub prompt_token_count: Option<u32>,
    /// Tokens generated
    pub candidates_token_count: Option<u32>,
    /// Sum of both
    pub total_token_count: Option<u32>,
}

impl Part {
    /// Plain text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }
}

impl Content {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some(ContentRole::User),
            parts: vec![Part::text(text)],
        }
    }

    /// Create a model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Some(ContentRole::Model),
            parts: vec![Part::text(text)],
        }
    }

    /// Create a role-less content block, as used for system instructions
    pub fn instruction(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

impl From<&ChatMessage> for Content {
    fn from(message: &ChatMessage) -> Self {
        match message.role {
            ChatRole::User => Content::user(&message.content),
            ChatRole::Model => Content::model(&message.content),
        }
    }
}

impl GenerateContentRequest {
    /// Create a request from content turns
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            system_instruction: None,
            generation_config: None,
        }
    }

    /// Set the system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::instruction(instruction));
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
            .temperature = Some(temperature);
        self
    }

    /// Constrain output to JSON matching `schema`
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        let config = self
            .generation_config
            .get_or_insert_with(GenerationConfig::default);
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = Some(schema);
        self
    }

    /// Whether the request asks for JSON output
    pub fn is_structured(&self) -> bool {
        self.generation_config
            .as_ref()
            .is_some_and(|c| c.response_schema.is_some())
    }
}

impl From<&PromptPayload> for GenerateContentRequest {
    fn from(payload: &PromptPayload) -> Self {
        let mut request = GenerateContentRequest::new(vec![Content::user(&payload.prompt)]);
        if let Some(temperature) = payload.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(schema) = &payload.response_schema {
            request = request.with_json_schema(schema.clone());
        }
        request
    }
}

impl GenerateContentResponse {
    /// Answer text of the first candidate, reasoning parts skipped.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter(|p| p.thought != Some(true))
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_shape() {
        let request = GenerateContentRequest::new(vec![Content::user("Hi")])
            .with_system_instruction("Be brief")
            .with_temperature(0.2)
            .with_json_schema(json!({ "type": "OBJECT" }));

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Hi");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["generationConfig"]["temperature"], 0.2);
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(request.is_structured());
    }

    #[test]
    fn test_plain_request_omits_config() {
        let request = GenerateContentRequest::new(vec![Content::user("Hi")]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_none());
        assert!(value.get("systemInstruction").is_none());
        assert!(!request.is_structured());
    }

    #[test]
    fn test_request_from_payload() {
        let payload = PromptPayload::text("Analyze")
            .with_schema(json!({ "type": "OBJECT" }))
            .with_temperature(0.2);
        let request = GenerateContentRequest::from(&payload);
        assert_eq!(request.contents.len(), 1);
        assert!(request.is_structured());
        assert!(request.system_instruction.is_none());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Analyze");
        assert_eq!(value["generationConfig"]["temperature"], 0.2);
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_parts_and_skips_thoughts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "Hello " },
                        { "text": "world" }
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 10, "totalTokenCount": 14 }
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(response.text().is_none());
        assert_eq!(
            response.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("SAFETY")
        );
    }

    #[test]
    fn test_chat_message_conversion() {
        let content = Content::from(&ChatMessage::model("Sure"));
        assert_eq!(content.role, Some(ContentRole::Model));
    }
}
