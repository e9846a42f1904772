use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::AgentConfig;
use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "api_token",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "access_key",
    "access_token",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "total_tokens", "tokens"];

/// Environment variables that override values from the YAML files,
/// as `(variable, section, key)`.
const ENV_OVERRIDES: [(&str, &str, &str); 8] = [
    ("GROQ_API_KEY", "llm", "api_key"),
    ("LLM_MODEL_NAME", "llm", "model"),
    ("OPENWEATHERMAP_API_KEY", "weather", "api_key"),
    ("HUGGINGFACEHUB_API_TOKEN", "embedding", "api_token"),
    ("EMBEDDING_MODEL_NAME", "embedding", "model"),
    ("QDRANT_URL", "index", "qdrant_url"),
    ("QDRANT_API_KEY", "index", "qdrant_api_key"),
    ("QDRANT_STORAGE_PATH", "index", "storage_path"),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("AGENT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Merged raw configuration: `config.yml`, then `secrets.yaml`, then
    /// environment overrides.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        let merged = deep_merge(&public_config, &secrets_config);
        Ok(apply_env_overrides(merged, |name| env::var(name).ok()))
    }

    /// Validated, typed configuration. Called once at process start.
    pub fn load_agent_config(&self) -> Result<AgentConfig, ApiError> {
        let raw = self.load_config()?;
        parse_agent_config(&raw)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn parse_agent_config(raw: &Value) -> Result<AgentConfig, ApiError> {
    validate_config(raw)?;
    serde_json::from_value(raw.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
}

/// A missing or empty file is an empty mapping; anything unreadable or not a
/// mapping is an error.
fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ApiError::Internal(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_yaml::from_str(&contents).map_err(|e| {
        ApiError::BadRequest(format!("Invalid config file {}: {}", path.display(), e))
    })?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::BadRequest(format!(
            "Invalid config file {}: top level must be a mapping",
            path.display()
        ))),
    }
}

fn apply_env_overrides<F>(mut config: Value, lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    if !config.is_object() {
        config = Value::Object(Map::new());
    }

    for (var, section, key) in ENV_OVERRIDES {
        let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let Some(root) = config.as_object_mut() else {
            break;
        };
        let entry = root
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Some(map) = entry.as_object_mut() {
            map.insert(key.to_string(), Value::String(value));
        }
    }

    config
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "model": "a", "temperature": 0.2 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "llm": { "api_key": "k" },
            "arr": [3]
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "llm": { "model": "a", "temperature": 0.2, "api_key": "k" },
                "arr": [3]
            })
        );
    }

    #[test]
    fn env_overrides_win_over_files() {
        let base = json!({ "llm": { "api_key": "from-file", "model": "m" } });
        let merged = apply_env_overrides(base, |name| match name {
            "GROQ_API_KEY" => Some("from-env".to_string()),
            "OPENWEATHERMAP_API_KEY" => Some("owm".to_string()),
            "QDRANT_URL" => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(merged["llm"]["api_key"], "from-env");
        assert_eq!(merged["llm"]["model"], "m");
        assert_eq!(merged["weather"]["api_key"], "owm");
        assert!(merged.get("index").is_none());
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "secret", "max_tokens": 42 },
            "embedding": { "api_token": "hf_abc", "model": "m" },
            "weather": { "api_key": null }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": { "api_key": "****", "max_tokens": 42 },
                "embedding": { "api_token": "****", "model": "m" },
                "weather": { "api_key": null }
            })
        );
    }

    #[test]
    fn load_agent_config_reads_yaml_and_secrets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yml"),
            "llm:\n  model: test-model\nretrieval:\n  top_k: 5\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("secrets.yaml"),
            "weather:\n  api_key: owm-secret\n",
        )
        .unwrap();

        let service = ConfigService::new(Arc::new(AppPaths::with_root(dir.path().to_path_buf())));
        let raw = deep_merge(
            &load_yaml_file(&service.config_path()).unwrap(),
            &load_yaml_file(&service.secrets_path()).unwrap(),
        );
        let config = parse_agent_config(&raw).unwrap();

        assert_eq!(config.llm.model, "test-model");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.weather.api_key.as_deref(), Some("owm-secret"));
    }

    #[test]
    fn unparsable_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");

        std::fs::write(&path, "index:\n  collection: [unclosed\n").unwrap();
        let err = load_yaml_file(&path).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        std::fs::write(&path, "just a string").unwrap();
        assert!(load_yaml_file(&path).is_err());

        std::fs::write(&path, "").unwrap();
        assert_eq!(load_yaml_file(&path).unwrap(), json!({}));
        assert_eq!(load_yaml_file(&dir.path().join("absent.yml")).unwrap(), json!({}));
    }

    #[test]
    fn parse_agent_config_rejects_invalid_values() {
        let err = parse_agent_config(&json!({ "retrieval": { "top_k": 0 } })).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
