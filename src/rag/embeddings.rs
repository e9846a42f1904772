//! Embedding providers.
//!
//! The same provider must be used at ingestion and query time so that
//! vectors share one space and dimension.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::config::{EmbeddingBackend, EmbeddingConfig};
use crate::core::errors::ApiError;

pub const DEFAULT_HF_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::Upstream("embedding response was empty".to_string()))
    }

    /// Embed many texts, output order matching input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Builds the provider selected by `config.backend`.
pub fn provider_from_config(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>, ApiError> {
    match config.backend {
        EmbeddingBackend::HuggingFace => Ok(Box::new(HuggingFaceEmbeddings::from_config(config)?)),
        EmbeddingBackend::OpenAi => Ok(Box::new(OpenAiEmbeddings::from_config(config)?)),
    }
}

fn http_client(timeout_secs: u64) -> Result<Client, ApiError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(ApiError::internal)
}

fn check_batch(vectors: &[Vec<f32>], expected_len: usize, dimension: usize) -> Result<(), ApiError> {
    if vectors.len() != expected_len {
        return Err(ApiError::Upstream(format!(
            "embedding count mismatch: sent {}, received {}",
            expected_len,
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(ApiError::Upstream(format!(
            "embedding dimension mismatch: expected {}, received {}",
            dimension,
            bad.len()
        )));
    }
    Ok(())
}

/// Hugging Face Inference API, feature-extraction pipeline.
pub struct HuggingFaceEmbeddings {
    base_url: String,
    model: String,
    dimension: usize,
    api_token: Option<String>,
    client: Client,
}

impl HuggingFaceEmbeddings {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_HF_INFERENCE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            api_token: config.api_token.clone(),
            client: http_client(config.timeout_secs)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/pipeline/feature-extraction", self.base_url, self.model)
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "inputs": texts,
            "options": { "wait_for_model": true },
        });

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let res = builder.send().await.map_err(ApiError::upstream)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "huggingface embedding error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let vectors = parse_feature_extraction(&payload)?;
        check_batch(&vectors, texts.len(), self.dimension)?;
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Accepts pooled output (`[n][dim]`) or token-level output (`[n][tokens][dim]`),
/// mean-pooling the latter.
fn parse_feature_extraction(payload: &Value) -> Result<Vec<Vec<f32>>, ApiError> {
    let rows = payload.as_array().ok_or_else(|| {
        ApiError::Upstream("feature-extraction response is not an array".to_string())
    })?;

    rows.iter()
        .map(|row| {
            let items = row.as_array().ok_or_else(|| {
                ApiError::Upstream("feature-extraction row is not an array".to_string())
            })?;
            match items.first() {
                Some(Value::Array(_)) => {
                    let tokens = items
                        .iter()
                        .map(to_vector)
                        .collect::<Result<Vec<_>, _>>()?;
                    mean_pool(&tokens)
                }
                _ => to_vector(row),
            }
        })
        .collect()
}

fn to_vector(value: &Value) -> Result<Vec<f32>, ApiError> {
    value
        .as_array()
        .ok_or_else(|| ApiError::Upstream("embedding is not an array".to_string()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| ApiError::Upstream("embedding contains a non-number".to_string()))
        })
        .collect()
}

fn mean_pool(tokens: &[Vec<f32>]) -> Result<Vec<f32>, ApiError> {
    let Some(first) = tokens.first() else {
        return Err(ApiError::Upstream("token embeddings were empty".to_string()));
    };
    let mut sum = vec![0.0f32; first.len()];
    for token in tokens {
        if token.len() != sum.len() {
            return Err(ApiError::Upstream("ragged token embeddings".to_string()));
        }
        for (acc, x) in sum.iter_mut().zip(token) {
            *acc += x;
        }
    }
    let n = tokens.len() as f32;
    Ok(sum.into_iter().map(|x| x / n).collect())
}

/// OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddings {
    base_url: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiEmbeddings {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_OPENAI_URL)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            api_key: config.api_token.clone(),
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({ "model": self.model, "input": texts });

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let res = builder.send().await.map_err(ApiError::upstream)?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "openai embedding error ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let vectors = parse_openai_embeddings(&payload)?;
        check_batch(&vectors, texts.len(), self.dimension)?;
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn parse_openai_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>, ApiError> {
    let data = payload["data"]
        .as_array()
        .ok_or_else(|| ApiError::Upstream("embedding response has no data".to_string()))?;

    let mut indexed = data
        .iter()
        .enumerate()
        .map(|(pos, item)| {
            let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(pos);
            to_vector(&item["embedding"]).map(|v| (index, v))
        })
        .collect::<Result<Vec<_>, _>>()?;

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pooled_feature_extraction() {
        let payload = json!([[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]);
        let vectors = parse_feature_extraction(&payload).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn mean_pools_token_level_output() {
        let payload = json!([[[1.0, 0.0], [3.0, 2.0]]]);
        let vectors = parse_feature_extraction(&payload).unwrap();
        assert_eq!(vectors, vec![vec![2.0, 1.0]]);
    }

    #[test]
    fn rejects_error_objects() {
        let err = parse_feature_extraction(&json!({ "error": "Model is loading" })).unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[test]
    fn openai_embeddings_are_reordered_by_index() {
        let payload = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vectors = parse_openai_embeddings(&payload).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn batch_check_catches_wrong_dimension() {
        let err = check_batch(&[vec![0.0; 3]], 1, 384).unwrap_err();
        assert!(err.to_string().contains("expected 384"));
        assert!(check_batch(&[vec![0.0; 384]], 1, 384).is_ok());
    }

    #[test]
    fn hugging_face_endpoint_uses_model_path() {
        let provider = HuggingFaceEmbeddings::from_config(&EmbeddingConfig::default()).unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction"
        );
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_hugging_face_embedding() {
        let provider = HuggingFaceEmbeddings::from_config(&EmbeddingConfig {
            api_token: std::env::var("HUGGINGFACEHUB_API_TOKEN").ok(),
            ..EmbeddingConfig::default()
        })
        .unwrap();

        match provider.embed("What is the capital of France?").await {
            Ok(vector) => assert_eq!(vector.len(), 384),
            Err(e) => panic!("Failed to reach Hugging Face: {}", e),
        }
    }
}
