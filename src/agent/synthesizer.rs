use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};

use super::prompts::synthesis_prompt;

/// Produces the final answer from retrieved context.
pub struct Synthesizer {
    llm: Arc<dyn LlmProvider>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// The model output is returned verbatim.
    pub async fn synthesize(&self, context: &str, question: &str) -> Result<String, ApiError> {
        self.llm
            .chat(ChatRequest::from_prompt(synthesis_prompt(context, question)))
            .await
    }
}
