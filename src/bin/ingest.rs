//! Offline ingestion: `ingest [DOCUMENT]`.
//!
//! Defaults to `ingest.document_path` from the configuration.

use std::env;
use std::sync::Arc;

use anyhow::Context;

use weather_rag_agent::core::config::{AppPaths, ConfigService};
use weather_rag_agent::core::logging;
use weather_rag_agent::rag::{provider_from_config, EmbeddingProvider, IngestPipeline};
use weather_rag_agent::state::{open_index, resolve_path};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config_service = ConfigService::new(paths.clone());
    let config = config_service
        .load_agent_config()
        .context("Failed to load configuration")?;

    let document = env::args()
        .nth(1)
        .unwrap_or_else(|| config.ingest.document_path.clone());
    let document_path = resolve_path(&paths.project_root, &document);

    let index = open_index(&config, &paths)
        .await
        .context("Failed to open vector index")?;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(
        provider_from_config(&config.embedding).context("Failed to build embedding provider")?,
    );

    tracing::info!(
        "Ingesting {} into '{}' with {}",
        document_path.display(),
        config.index.collection,
        embedder.model_name()
    );

    let pipeline = IngestPipeline::new(index, embedder, &config.index.collection, &config.ingest);
    let report = pipeline.ingest_file(&document_path).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
