use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::graph::state::RouteDecision;
use crate::llm::{ChatRequest, LlmProvider};

use super::prompts::classification_prompt;

/// The reply is a single label; anything longer is noise.
const LABEL_MAX_TOKENS: i32 = 10;

/// Routes a question to the weather or document backend with one LLM call.
pub struct Classifier {
    llm: Arc<dyn LlmProvider>,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn classify(&self, question: &str) -> Result<RouteDecision, ApiError> {
        let label = self
            .llm
            .chat(
                ChatRequest::from_prompt(classification_prompt(question))
                    .with_max_tokens(LABEL_MAX_TOKENS),
            )
            .await?;

        let route = RouteDecision::from_label(&label);
        tracing::debug!("Classifier label {:?} decoded as {}", label.trim(), route.as_str());
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    struct LabelLlm {
        label: &'static str,
        max_tokens: Mutex<Option<i32>>,
    }

    #[async_trait]
    impl LlmProvider for LabelLlm {
        fn name(&self) -> &str {
            "label"
        }

        fn model(&self) -> &str {
            "label-1"
        }

        async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
            *self.max_tokens.lock().unwrap() = request.max_tokens;
            Ok(self.label.to_string())
        }
    }

    #[tokio::test]
    async fn classification_requests_a_short_label() {
        let llm = Arc::new(LabelLlm {
            label: " Weather\n",
            max_tokens: Mutex::new(None),
        });
        let classifier = Classifier::new(llm.clone());

        let route = classifier.classify("Delhi").await.unwrap();

        assert_eq!(route, RouteDecision::Weather);
        assert_eq!(*llm.max_tokens.lock().unwrap(), Some(LABEL_MAX_TOKENS));
    }
}
