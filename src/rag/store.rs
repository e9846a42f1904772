//! VectorIndex trait: abstract interface over the persisted similarity index.
//!
//! One index holds named collections. Every collection has a fixed vector
//! dimension and a distance metric fixed at creation; every point belongs to
//! exactly one collection and carries its original text in the payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Distance {
    #[default]
    Cosine,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
        }
    }
}

/// Parameters a collection is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub distance: Distance,
}

impl CollectionSpec {
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance: Distance::Cosine,
        }
    }
}

/// Stored payload: the chunk text plus arbitrary source metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub text: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPoint {
    /// Unique identifier; upserting an existing id overwrites it.
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    /// Similarity score (higher = closer).
    pub score: f32,
    pub payload: PointPayload,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logs ("local", "qdrant").
    fn backend(&self) -> &str;

    /// Vector dimension of the collection, `None` when it does not exist.
    async fn collection_dimension(&self, collection: &str) -> Result<Option<usize>, ApiError>;

    async fn collection_exists(&self, collection: &str) -> Result<bool, ApiError> {
        Ok(self.collection_dimension(collection).await?.is_some())
    }

    /// Create a collection. Fails if it already exists; use
    /// [`create_collection_if_not_exists`] for the idempotent form.
    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), ApiError>;

    /// Insert or overwrite points by id. Returns the number written.
    async fn upsert(&self, collection: &str, points: Vec<IndexPoint>) -> Result<usize, ApiError>;

    /// Nearest neighbours of `vector`, closest first, payload attached.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError>;

    async fn count(&self, collection: &str) -> Result<usize, ApiError>;
}

/// Ensure `spec.name` exists without ever recreating a populated collection.
///
/// Returns `true` when the collection was created by this call. An existing
/// collection with a different dimension is reported as an error.
pub async fn create_collection_if_not_exists(
    index: &dyn VectorIndex,
    spec: &CollectionSpec,
) -> Result<bool, ApiError> {
    match index.collection_dimension(&spec.name).await? {
        Some(dimension) if dimension == spec.dimension => {
            tracing::info!("Collection '{}' already exists.", spec.name);
            Ok(false)
        }
        Some(dimension) => Err(ApiError::BadRequest(format!(
            "Collection '{}' exists with dimension {} but {} was requested",
            spec.name, dimension, spec.dimension
        ))),
        None => {
            tracing::info!(
                "Collection '{}' not found on {} index. Creating (dim={}, distance={})...",
                spec.name,
                index.backend(),
                spec.dimension,
                spec.distance.as_str()
            );
            index.create_collection(spec).await?;
            Ok(true)
        }
    }
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), ApiError> {
    if vector.len() != expected {
        return Err(ApiError::BadRequest(format!(
            "Vector dimension mismatch: collection expects {}, got {}",
            expected,
            vector.len()
        )));
    }
    Ok(())
}
