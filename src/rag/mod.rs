//! Retrieval-augmented generation support.
//!
//! - `VectorIndex`: persisted similarity index (local SQLite or Qdrant)
//! - `EmbeddingProvider`: text to vector
//! - `IngestPipeline`: offline document ingestion
//! - `DocumentRetriever`: question to joined passages

pub mod embeddings;
pub mod engine;
pub mod ingest;
pub mod qdrant;
pub mod retriever;
pub mod sqlite;
pub mod store;

pub use embeddings::{provider_from_config, EmbeddingProvider};
pub use engine::{load_document, ChunkerConfig, DocumentChunker, TextChunk};
pub use ingest::{IngestPipeline, IngestReport};
pub use qdrant::QdrantVectorIndex;
pub use retriever::{DocumentRetriever, NO_RESULTS_MESSAGE, PASSAGE_SEPARATOR};
pub use sqlite::SqliteVectorIndex;
pub use store::{
    create_collection_if_not_exists, CollectionSpec, Distance, IndexPoint, PointPayload,
    ScoredPoint, VectorIndex,
};
