use std::sync::Arc;

use super::embeddings::EmbeddingProvider;
use super::store::VectorIndex;
use crate::core::errors::ApiError;

pub const PASSAGE_SEPARATOR: &str = "\n\n---\n\n";
pub const NO_RESULTS_MESSAGE: &str =
    "No relevant information found in the document for this question.";

/// Embeds a question and returns the nearest passages of one collection.
pub struct DocumentRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl DocumentRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
        }
    }

    /// Passages joined by [`PASSAGE_SEPARATOR`] in ranked order, or
    /// [`NO_RESULTS_MESSAGE`] when the search comes back empty.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<String, ApiError> {
        let vector = self.embedder.embed(question).await?;
        let hits = self.index.search(&self.collection, &vector, top_k).await?;

        tracing::info!(
            "Retrieved {} passages from '{}' (top_k={})",
            hits.len(),
            self.collection,
            top_k
        );

        if hits.is_empty() {
            return Ok(NO_RESULTS_MESSAGE.to_string());
        }

        Ok(hits
            .into_iter()
            .map(|hit| hit.payload.text)
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR))
    }
}
