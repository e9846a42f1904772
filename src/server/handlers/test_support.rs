//! Stub services for handler tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::core::config::{AgentConfig, AppPaths, ConfigService};
use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};
use crate::rag::{
    CollectionSpec, EmbeddingProvider, IndexPoint, PointPayload, SqliteVectorIndex, VectorIndex,
};
use crate::state::AppState;
use crate::tools::weather::WeatherProvider;

#[derive(Default)]
pub(crate) struct StubLlm {
    pub delay: Option<Duration>,
    pub fail: bool,
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-1"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ApiError::Upstream("stub llm failure".to_string()));
        }
        let prompt = &request.messages[0].content;
        if prompt.contains("Classification:") {
            Ok("weather".to_string())
        } else {
            Ok("It is sunny.".to_string())
        }
    }
}

pub(crate) struct StubWeather;

#[async_trait]
impl WeatherProvider for StubWeather {
    fn name(&self) -> &str {
        "stub"
    }

    async fn current_weather(&self, location: &str) -> Result<String, ApiError> {
        Ok(format!("Sunny in {}", location))
    }
}

pub(crate) struct StubEmbedder;

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

pub(crate) async fn test_state(configure: impl FnOnce(&mut AgentConfig)) -> Arc<AppState> {
    test_state_with_llm(configure, StubLlm::default()).await
}

pub(crate) async fn test_state_with_llm(
    configure: impl FnOnce(&mut AgentConfig),
    llm: StubLlm,
) -> Arc<AppState> {
    let root = std::env::temp_dir().join(format!("weather-rag-test-{}", uuid::Uuid::new_v4()));
    let paths = Arc::new(AppPaths::with_root(root));
    let config_service = ConfigService::new(paths.clone());

    let mut config = AgentConfig::default();
    configure(&mut config);

    let index = Arc::new(SqliteVectorIndex::in_memory().await.unwrap());
    index
        .create_collection(&CollectionSpec::cosine(&config.index.collection, 2))
        .await
        .unwrap();
    index
        .upsert(
            &config.index.collection,
            vec![IndexPoint {
                id: "p1".to_string(),
                vector: vec![1.0, 0.0],
                payload: PointPayload {
                    text: "Avdeep is a data engineer.".to_string(),
                    metadata: json!({ "source": "resume.pdf" }),
                },
            }],
        )
        .await
        .unwrap();

    let state = AppState::new(
        config_service,
        config,
        index,
        Arc::new(StubEmbedder),
        Arc::new(llm),
        Arc::new(StubWeather),
    )
    .unwrap_or_else(|e| panic!("failed to build test state: {}", e));
    Arc::new(state)
}
