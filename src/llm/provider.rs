use async_trait::async_trait;

use crate::core::errors::ApiError;
use super::types::ChatRequest;

/// Text-generation capability shared by classification and synthesis.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "groq", "openai")
    fn name(&self) -> &str;

    /// model identifier requests are sent to
    fn model(&self) -> &str;

    /// chat completion (non-streaming), single attempt
    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError>;
}
