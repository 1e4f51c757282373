use std::sync::Arc;
use tracing::{debug, warn};

use super::{Content, ContentGenerator, GenerateContentRequest};
use crate::error::{AiError, AiResult};
use crate::model::ChatMessage;

/// A conversation bound to a fixed system instruction.
///
/// The transcript only grows on successful turns; a failed turn leaves it
/// exactly as it was. Taking `&mut self` keeps turns strictly sequential.
pub struct ChatSession {
    generator: Arc<dyn ContentGenerator>,
    system_instruction: String,
    transcript: Vec<ChatMessage>,
    dataset_revision: u64,
}

impl ChatSession {
    pub(crate) fn new(
        generator: Arc<dyn ContentGenerator>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            system_instruction: system_instruction.into(),
            transcript: Vec::new(),
            dataset_revision: 0,
        }
    }

    /// Tag the session with the dataset revision it was built from.
    pub fn bound_to_revision(mut self, revision: u64) -> Self {
        self.dataset_revision = revision;
        self
    }

    /// Revision passed to [`Self::bound_to_revision`], 0 if never bound.
    pub fn dataset_revision(&self) -> u64 {
        self.dataset_revision
    }

    /// Instruction sent with every turn.
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Completed turns, oldest first.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Send a user message and return the model's reply.
    pub async fn send(&mut self, text: &str) -> AiResult<String> {
        let mut contents: Vec<Content> = self.transcript.iter().map(Content::from).collect();
        contents.push(Content::user(text));

        debug!(turns = contents.len(), "Sending chat turn");

        let request = GenerateContentRequest::new(contents)
            .with_system_instruction(self.system_instruction.clone());
        let reply = self.generator.generate(request).await?;

        if reply.trim().is_empty() {
            warn!("Chat model returned an empty reply");
            return Err(AiError::EmptyOrInvalidResponse {
                message: "model returned no text".to_string(),
            });
        }

        self.transcript.push(ChatMessage::user(text));
        self.transcript.push(ChatMessage::model(reply.clone()));
        Ok(reply)
    }
}
