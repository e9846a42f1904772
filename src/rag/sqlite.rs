//! SQLite-backed vector index.
//!
//! Embedded replacement for a Qdrant server: collections and points live in
//! one SQLite file, search is brute-force cosine over the collection.

use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{check_dimension, CollectionSpec, IndexPoint, PointPayload, ScoredPoint, VectorIndex};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::vector_math::rank_descending_by_cosine;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.index_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(ApiError::internal)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    /// Non-persistent index for tests and dry runs.
    pub async fn in_memory() -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(ApiError::internal)?;

        // A single connection that never expires; the database dies with it.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_collections (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                distance TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_points (
                collection TEXT NOT NULL,
                point_id TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, point_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    async fn require_dimension(&self, collection: &str) -> Result<usize, ApiError> {
        self.collection_dimension(collection)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Collection '{}' does not exist", collection)))
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn backend(&self) -> &str {
        "local"
    }

    async fn collection_dimension(&self, collection: &str) -> Result<Option<usize>, ApiError> {
        let dimension: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM index_collections WHERE name = ?1")
                .bind(collection)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        Ok(dimension.map(|d| d as usize))
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> Result<(), ApiError> {
        if spec.dimension == 0 {
            return Err(ApiError::BadRequest(
                "Collection dimension must be greater than 0".to_string(),
            ));
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO index_collections (name, dimension, distance)
             VALUES (?1, ?2, ?3)",
        )
        .bind(&spec.name)
        .bind(spec.dimension as i64)
        .bind(spec.distance.as_str())
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::BadRequest(format!(
                "Collection '{}' already exists",
                spec.name
            )));
        }
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

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for point in &points {
            let blob = Self::serialize_embedding(&point.vector);
            let metadata_str =
                serde_json::to_string(&point.payload.metadata).map_err(ApiError::internal)?;

            sqlx::query(
                "INSERT OR REPLACE INTO index_points (collection, point_id, text, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(collection)
            .bind(&point.id)
            .bind(&point.payload.text)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(points.len())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError> {
        let dimension = self.require_dimension(collection).await?;
        check_dimension(dimension, vector)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT point_id, text, metadata, embedding
             FROM index_points
             WHERE collection = ?1
             ORDER BY rowid",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let embeddings: Vec<Vec<f32>> = rows
            .iter()
            .map(|row| {
                let bytes: Vec<u8> = row.get("embedding");
                Self::deserialize_embedding(&bytes)
            })
            .collect();

        let ranked = rank_descending_by_cosine(vector, &embeddings)?;

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(idx, score)| {
                let row = &rows[idx];
                let metadata_str: String = row.get("metadata");
                ScoredPoint {
                    id: row.get("point_id"),
                    score,
                    payload: PointPayload {
                        text: row.get("text"),
                        metadata: serde_json::from_str(&metadata_str).unwrap_or(Value::Null),
                    },
                }
            })
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_points WHERE collection = ?1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}
