//! Gateway to the generative model.
//!
//! [`ContentGenerator`] is the transport seam: one request in, the model's
//! answer text out. [`GeminiClient`] implements it over HTTP. [`AiGateway`]
//! layers the output contract on top (non-empty text, schema-validated JSON)
//! and hands out [`ChatSession`]s.

mod chat;
mod client;
mod gateway;
mod types;

pub use chat::ChatSession;
pub use client::GeminiClient;
pub use gateway::{AiGateway, StructuredResponse};
pub use types::*;

use async_trait::async_trait;

use crate::error::AiResult;

/// Sends one request to a generative model and returns its answer text.
///
/// Implementations perform a single call: no retries, no response shaping.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Run one generation request.
    async fn generate(&self, request: GenerateContentRequest) -> AiResult<String>;
}
