//! Offline ingestion: document -> chunks -> embeddings -> index points.

use std::path::Path;
use std::sync::Arc;

use futures_util::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::embeddings::EmbeddingProvider;
use super::engine::{load_document, ChunkerConfig, DocumentChunker, TextChunk};
use super::store::{
    check_dimension, create_collection_if_not_exists, CollectionSpec, IndexPoint, PointPayload,
    VectorIndex,
};
use crate::core::config::IngestConfig;
use crate::core::errors::ApiError;

const EMBED_BATCH_SIZE: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub collection: String,
    pub created_collection: bool,
    pub chunks: usize,
    pub upserted: usize,
}

pub struct IngestPipeline {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    chunker: DocumentChunker,
    embed_concurrency: usize,
}

impl IngestPipeline {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            collection: collection.into(),
            chunker: DocumentChunker::new(ChunkerConfig::from(config)),
            embed_concurrency: config.embed_concurrency.max(1),
        }
    }

    /// Load `path` and ingest its text.
    pub async fn ingest_file(&self, path: &Path) -> anyhow::Result<IngestReport> {
        let text = load_document(path)?;
        let report = self.ingest_text(&text, &path.display().to_string()).await?;
        Ok(report)
    }

    pub async fn ingest_text(&self, text: &str, source: &str) -> Result<IngestReport, ApiError> {
        let spec = CollectionSpec::cosine(&self.collection, self.embedder.dimensions());
        let created_collection = create_collection_if_not_exists(self.index.as_ref(), &spec).await?;

        let chunks = self.chunker.split_into_chunks(text, source);
        tracing::info!(
            "Split {} into {} chunks (size={}, overlap={})",
            source,
            chunks.len(),
            self.chunker.config().chunk_size,
            self.chunker.config().chunk_overlap
        );

        if chunks.is_empty() {
            return Ok(IngestReport {
                source: source.to_string(),
                collection: self.collection.clone(),
                created_collection,
                chunks: 0,
                upserted: 0,
            });
        }

        let vectors = self.embed_chunks(&chunks).await?;
        for vector in &vectors {
            check_dimension(spec.dimension, vector)?;
        }

        let ingested_at = chrono::Utc::now().to_rfc3339();
        let points: Vec<IndexPoint> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexPoint {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: PointPayload {
                    text: chunk.text.clone(),
                    metadata: json!({
                        "source": chunk.source,
                        "chunk_index": chunk.chunk_index,
                        "start_offset": chunk.start_offset,
                        "ingested_at": ingested_at,
                    }),
                },
            })
            .collect();

        let upserted = self.index.upsert(&self.collection, points).await?;
        tracing::info!(
            "Upserted {} points into '{}' ({} backend)",
            upserted,
            self.collection,
            self.index.backend()
        );

        Ok(IngestReport {
            source: source.to_string(),
            collection: self.collection.clone(),
            created_collection,
            chunks: chunks.len(),
            upserted,
        })
    }

    async fn embed_chunks(&self, chunks: &[TextChunk]) -> Result<Vec<Vec<f32>>, ApiError> {
        let batches: Vec<Vec<String>> = chunks
            .chunks(EMBED_BATCH_SIZE)
            .map(|batch| batch.iter().map(|c| c.text.clone()).collect())
            .collect();
        let total = batches.len();

        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches.into_iter().enumerate())
            .map(|(i, batch)| async move {
                tracing::debug!("Embedding batch {}/{} ({} chunks)", i + 1, total, batch.len());
                self.embedder.embed_batch(&batch).await
            })
            .buffered(self.embed_concurrency)
            .try_collect()
            .await?;

        Ok(embedded.into_iter().flatten().collect())
    }
}
