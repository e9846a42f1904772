pub mod defaults;
pub mod paths;
pub mod service;
pub mod validation;

pub use defaults::{
    AgentConfig, EmbeddingBackend, EmbeddingConfig, IndexBackend, IndexConfig, IngestConfig,
    LlmConfig, RetrievalConfig, ServerConfig, WeatherConfig,
};
pub use paths::AppPaths;
pub use service::ConfigService;
