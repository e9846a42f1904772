//! Qdrant REST client implementing [`VectorIndex`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use super::store::{check_dimension, CollectionSpec, IndexPoint, PointPayload, ScoredPoint, VectorIndex};
use crate::core::config::IndexConfig;
use crate::core::errors::ApiError;

pub struct QdrantVectorIndex {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl QdrantVectorIndex {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::internal)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self, ApiError> {
        Self::new(config.qdrant_url.clone(), config.qdrant_api_key.clone())
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/collections/{}",
            self.base_url,
            urlencoding::encode(collection)
        )
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, action: &str) -> Result<Value, ApiError> {
        let res = self
            .authorize(builder)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Qdrant {} failed ({}): {}",
                action, status, text
            )));
        }

        res.json().await.map_err(ApiError::upstream)
    }

    async fn require_dimension(&self, collection: &str) -> Result<usize, ApiError> {
        self.collection_dimension(collection)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Collection '{}' does not exist", collection)))
    }
}

#[async_trait]
impl VectorIndex for QdrantVectorIndex {
    fn backend(&self) -> &str {
        "qdrant"
    }

    async fn collection_dimension(&self, collection: &str) -> Result<Option<usize>, ApiError> {
        let res = self
            .authorize(self.client.get(self.collection_url(collection)))
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "Qdrant collection lookup failed ({}): {}",
                status, text
            )));
        }

        let body: Value = res.json().await.map_err(ApiError::upstream)?;
        parse_collection_dimension(&body).map(Some)
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), ApiError> {
        let body = json!({
            "vectors": {
                "size": spec.dimension,
                "distance": spec.distance.as_str(),
            }
        });
        self.send(
            self.client.put(self.collection_url(&spec.name)).json(&body),
            "create collection",
        )
        .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<usize, ApiError> {
        let dimension = self.require_dimension(collection).await?;
        for point in &points {
            check_dimension(dimension, &point.vector)?;
        }
        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        let body = json!({
            "points": points
                .into_iter()
                .map(|p| json!({
                    "id": p.id,
                    "vector": p.vector,
                    "payload": { "text": p.payload.text, "metadata": p.payload.metadata },
                }))
                .collect::<Vec<_>>()
        });

        let url = format!("{}/points?wait=true", self.collection_url(collection));
        self.send(self.client.put(url).json(&body), "upsert").await?;
        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        let url = format!("{}/points/search", self.collection_url(collection));
        let response = self.send(self.client.post(url).json(&body), "search").await?;
        parse_search_response(&response)
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let url = format!("{}/points/count", self.collection_url(collection));
        let response = self
            .send(self.client.post(url).json(&json!({ "exact": true })), "count")
            .await?;

        response["result"]["count"]
            .as_u64()
            .map(|c| c as usize)
            .ok_or_else(|| ApiError::Upstream("Qdrant count response has no count".to_string()))
    }
}

fn parse_collection_dimension(body: &Value) -> Result<usize, ApiError> {
    body["result"]["config"]["params"]["vectors"]["size"]
        .as_u64()
        .map(|size| size as usize)
        .ok_or_else(|| {
            ApiError::Upstream("Qdrant collection info has no single unnamed vector size".to_string())
        })
}

fn parse_search_response(body: &Value) -> Result<Vec<ScoredPoint>, ApiError> {
    let hits = body["result"]
        .as_array()
        .ok_or_else(|| ApiError::Upstream("Qdrant search response has no result".to_string()))?;

    Ok(hits
        .iter()
        .filter_map(|hit| {
            let id = match &hit["id"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let payload = &hit["payload"];
            // Points written by LangChain keep their text under `page_content`.
            let text = payload["text"]
                .as_str()
                .or_else(|| payload["page_content"].as_str())
                .filter(|t| !t.trim().is_empty());
            let Some(text) = text else {
                tracing::warn!("Skipping Qdrant point {} with no text payload", id);
                return None;
            };

            Some(ScoredPoint {
                id,
                score: hit["score"].as_f64().unwrap_or(0.0) as f32,
                payload: PointPayload {
                    text: text.to_string(),
                    metadata: payload["metadata"].clone(),
                },
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vector_size_from_collection_info() {
        let body = json!({
            "result": {
                "status": "green",
                "config": { "params": { "vectors": { "size": 384, "distance": "Cosine" } } }
            },
            "status": "ok"
        });
        assert_eq!(parse_collection_dimension(&body).unwrap(), 384);
    }

    #[test]
    fn search_response_reads_text_and_page_content() {
        let body = json!({
            "result": [
                { "id": "a1", "score": 0.93, "payload": { "text": "first", "metadata": { "chunk_index": 0 } } },
                { "id": 7, "score": 0.5, "payload": { "page_content": "legacy", "metadata": {} } }
            ]
        });

        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a1");
        assert_eq!(hits[0].payload.text, "first");
        assert_eq!(hits[0].payload.metadata["chunk_index"], 0);
        assert_eq!(hits[1].id, "7");
        assert_eq!(hits[1].payload.text, "legacy");
    }

    #[test]
    fn hits_without_text_are_skipped() {
        let body = json!({
            "result": [
                { "id": "a1", "score": 0.9, "payload": { "metadata": {} } },
                { "id": "a2", "score": 0.8, "payload": { "text": "  " } },
                { "id": "a3", "score": 0.7, "payload": { "text": "kept" } }
            ]
        });

        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a3");
    }

    #[test]
    fn malformed_search_response_is_upstream_error() {
        let err = parse_search_response(&json!({ "status": "ok" })).unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[test]
    fn collection_url_escapes_name() {
        let index = QdrantVectorIndex::new("http://localhost:6333/", None).unwrap();
        assert_eq!(
            index.collection_url("pdf docs"),
            "http://localhost:6333/collections/pdf%20docs"
        );
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_qdrant_collection_lookup() {
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6333".to_string());
        let index = QdrantVectorIndex::new(url, std::env::var("QDRANT_API_KEY").ok()).unwrap();
        let res = index.collection_dimension("pdf_document_collection").await;
        match res {
            Ok(dim) => println!("Qdrant collection dimension: {:?}", dim),
            Err(e) => panic!("Failed to reach Qdrant: {}", e),
        }
    }
}
