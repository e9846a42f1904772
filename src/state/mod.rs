use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::Orchestrator;
use crate::core::config::{AgentConfig, AppPaths, ConfigService, IndexBackend};
use crate::core::errors::ApiError;
use crate::llm::{LlmProvider, OpenAiCompatProvider};
use crate::rag::{
    provider_from_config, DocumentRetriever, EmbeddingProvider, QdrantVectorIndex,
    SqliteVectorIndex, VectorIndex,
};
use crate::tools::weather::{OpenWeatherMapProvider, WeatherProvider};

pub mod error;

pub use error::InitializationError;

/// Application state shared across all routes.
///
/// The configuration is loaded once and never mutated afterwards; every
/// service below is built from it.
#[derive(Clone)]
pub struct AppState {
    pub config_service: ConfigService,
    pub config: Arc<AgentConfig>,
    pub index: Arc<dyn VectorIndex>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Loads configuration under `paths` and connects every external service.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config_service = ConfigService::new(paths.clone());
        let config = config_service
            .load_agent_config()
            .map_err(|e| InitializationError::Config(e.into()))?;

        let index = open_index(&config, &paths)
            .await
            .map_err(|e| InitializationError::Index(e.into()))?;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::from(
            provider_from_config(&config.embedding)
                .map_err(|e| InitializationError::Embeddings(e.into()))?,
        );
        let llm: Arc<dyn LlmProvider> = Arc::new(
            OpenAiCompatProvider::from_config(&config.llm)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );
        let weather: Arc<dyn WeatherProvider> = Arc::new(
            OpenWeatherMapProvider::from_config(&config.weather)
                .map_err(|e| InitializationError::Weather(e.into()))?,
        );

        log_startup_summary(&config, &config_service, index.as_ref(), llm.as_ref());

        let state = Self::new(config_service, config, index, embedder, llm, weather)?;
        Ok(Arc::new(state))
    }

    /// Wires already-constructed services together.
    pub fn new(
        config_service: ConfigService,
        config: AgentConfig,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        weather: Arc<dyn WeatherProvider>,
    ) -> Result<Self, InitializationError> {
        let retriever =
            DocumentRetriever::new(embedder, index.clone(), config.index.collection.clone());
        let orchestrator = Orchestrator::new(llm, weather, retriever, config.retrieval.top_k)
            .map_err(|e| InitializationError::Graph(e.into()))?;

        Ok(Self {
            config_service,
            config: Arc::new(config),
            index,
            orchestrator: Arc::new(orchestrator),
        })
    }
}

/// Opens the configured vector index backend.
pub async fn open_index(
    config: &AgentConfig,
    paths: &AppPaths,
) -> Result<Arc<dyn VectorIndex>, ApiError> {
    match config.index.backend {
        IndexBackend::Local => {
            let path = config
                .index
                .storage_path
                .as_deref()
                .map(|p| resolve_path(&paths.project_root, p))
                .unwrap_or_else(|| paths.index_path.clone());
            tracing::info!("Opening local vector index at {}", path.display());
            Ok(Arc::new(SqliteVectorIndex::with_path(path).await?))
        }
        IndexBackend::Qdrant => {
            tracing::info!("Using Qdrant vector index at {}", config.index.qdrant_url);
            Ok(Arc::new(QdrantVectorIndex::from_config(&config.index)?))
        }
    }
}

/// Relative paths in the configuration are anchored at the project root.
pub fn resolve_path(root: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

fn log_startup_summary(
    config: &AgentConfig,
    config_service: &ConfigService,
    index: &dyn VectorIndex,
    llm: &dyn LlmProvider,
) {
    let key_status = |present: bool| if present { "set" } else { "missing" };

    tracing::info!(
        "LLM: {} model={} (api key {})",
        llm.name(),
        llm.model(),
        key_status(config.llm.api_key.is_some())
    );
    tracing::info!(
        "Embeddings: {} dim={} (token {})",
        config.embedding.model,
        config.embedding.dimension,
        key_status(config.embedding.api_token.is_some())
    );
    tracing::info!(
        "Weather: units={} (api key {})",
        config.weather.units,
        key_status(config.weather.api_key.is_some())
    );
    tracing::info!(
        "Index: {} collection='{}' top_k={}",
        index.backend(),
        config.index.collection,
        config.retrieval.top_k
    );

    if let Ok(raw) = config_service.load_config() {
        tracing::debug!(
            "Effective configuration: {}",
            config_service.redact_sensitive_values(&raw)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_root() {
        let root = Path::new("/srv/agent");
        assert_eq!(
            resolve_path(root, "data/sample.pdf"),
            PathBuf::from("/srv/agent/data/sample.pdf")
        );
        assert_eq!(resolve_path(root, "/tmp/x.db"), PathBuf::from("/tmp/x.db"));
    }

    #[tokio::test]
    async fn opens_local_index_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_root(dir.path().to_path_buf());
        let mut config = AgentConfig::default();
        config.index.storage_path = Some("custom/index.db".to_string());

        let index = open_index(&config, &paths).await.unwrap();

        assert_eq!(index.backend(), "local");
        assert!(dir.path().join("custom/index.db").exists());
    }
}
