use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IndexStatus {
    pub backend: String,
    pub collection: String,
    pub exists: bool,
    pub dimension: Option<usize>,
    pub points: usize,
}

/// Whether the document collection has been ingested, and how much of it.
pub async fn index_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IndexStatus>, ApiError> {
    let collection = state.config.index.collection.clone();
    let dimension = state.index.collection_dimension(&collection).await?;
    let points = match dimension {
        Some(_) => state.index.count(&collection).await?,
        None => 0,
    };

    Ok(Json(IndexStatus {
        backend: state.index.backend().to_string(),
        collection,
        exists: dimension.is_some(),
        dimension,
        points,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handlers::test_support::test_state;

    #[tokio::test]
    async fn reports_ingested_collection() {
        let state = test_state(|_| {}).await;

        let Json(status) = index_status(State(state)).await.unwrap();

        assert_eq!(status.backend, "local");
        assert_eq!(status.collection, "pdf_document_collection");
        assert!(status.exists);
        assert_eq!(status.dimension, Some(2));
        assert_eq!(status.points, 1);
    }
}
