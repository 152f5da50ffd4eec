use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::paths::AppPaths;
use crate::core::errors::AssistantError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "total_tokens", "tokens"];

/// Resolved assistant settings, deserialized from the merged YAML config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_tokens: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com".to_string(),
            dimensions: 1536,
            batch_size: 64,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            base_url: None,
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 750,
            chunk_overlap: 150,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("QUILLWRIGHT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Merged raw config: public file overlaid with secrets.
    pub fn load_raw(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    /// Typed assistant settings from the merged config. Missing keys fall
    /// back to defaults.
    pub fn load(&self) -> AssistantConfig {
        serde_json::from_value(self.load_raw()).unwrap_or_default()
    }

    /// Persist a config value, splitting sensitive keys into the secrets
    /// file so API keys never land in the shareable config.
    pub fn save(&self, config: &Value) -> Result<(), AssistantError> {
        let (public_config, secrets_config) = split_config(config);

        let config_path = self.paths.user_data_dir.join("config.yml");
        if let Some(parent) = config_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let public_yaml =
            serde_yaml::to_string(&public_config).map_err(AssistantError::internal)?;
        fs::write(&config_path, public_yaml).map_err(AssistantError::internal)?;

        let secrets_path = self.secrets_path();
        if let Some(parent) = secrets_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let secrets_yaml =
            serde_yaml::to_string(&secrets_config).map_err(AssistantError::internal)?;
        fs::write(&secrets_path, secrets_yaml).map_err(AssistantError::internal)?;

        Ok(())
    }

    /// Config suitable for display, with secret values masked.
    pub fn redacted(&self) -> Value {
        redact_sensitive_values(&self.load_raw())
    }

    /// Resolve a provider API key: secrets file first, then environment.
    pub fn api_key(&self, provider: &str) -> Option<String> {
        let key_name = format!("{}_api_key", provider);
        let from_config = self
            .load_raw()
            .get(&key_name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        from_config.or_else(|| {
            let env_name = format!("{}_API_KEY", provider.to_uppercase());
            env::var(env_name).ok().filter(|v| !v.is_empty())
        })
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        },
        Err(_) => Value::Object(Map::new()),
    }
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

fn split_config(config: &Value) -> (Value, Value) {
    match config {
        Value::Object(map) => {
            let mut public_map = Map::new();
            let mut secret_map = Map::new();

            for (key, value) in map {
                match value {
                    Value::Object(_) => {
                        let (public_sub, secret_sub) = split_config(value);
                        if !is_empty_object(&public_sub) {
                            public_map.insert(key.clone(), public_sub);
                        }
                        if !is_empty_object(&secret_sub) {
                            secret_map.insert(key.clone(), secret_sub);
                        }
                    }
                    _ => {
                        if is_sensitive_key(key) && !value.is_null() {
                            secret_map.insert(key.clone(), value.clone());
                        } else {
                            public_map.insert(key.clone(), value.clone());
                        }
                    }
                }
            }

            (Value::Object(public_map), Value::Object(secret_map))
        }
        _ => (config.clone(), Value::Object(Map::new())),
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

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "provider": "openai", "model": "gpt-4o" },
            "retrieval": { "top_k": 5 }
        });
        let override_value = json!({
            "llm": { "model": "claude-3-sonnet" },
            "openai_api_key": "sk-x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "llm": { "provider": "openai", "model": "claude-3-sonnet" },
                "retrieval": { "top_k": 5 },
                "openai_api_key": "sk-x"
            })
        );
    }

    #[test]
    fn split_config_separates_sensitive_values() {
        let input = json!({
            "openai_api_key": "sk-x",
            "llm": { "max_tokens": 100, "anthropic_api_key": "sk-a" }
        });

        let (public_config, secret_config) = split_config(&input);

        assert_eq!(public_config, json!({ "llm": { "max_tokens": 100 } }));
        assert_eq!(
            secret_config,
            json!({ "openai_api_key": "sk-x", "llm": { "anthropic_api_key": "sk-a" } })
        );
    }

    #[test]
    fn redact_masks_secrets_only() {
        let input = json!({
            "openai_api_key": "sk-x",
            "llm": { "max_tokens": 42 }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "openai_api_key": "****",
                "llm": { "max_tokens": 42 }
            })
        );
    }

    #[test]
    fn typed_config_falls_back_to_defaults() {
        let config: AssistantConfig = serde_json::from_value(json!({
            "llm": { "provider": "anthropic" }
        }))
        .unwrap();

        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.chunking.chunk_size, 750);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
    }
}
