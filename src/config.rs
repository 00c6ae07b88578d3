/// Configuration system for docqa
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// On-disk storage layout
    pub storage: StorageConfig,

    /// Text chunking configuration
    pub chunking: ChunkingConfig,

    /// External embedding API configuration
    pub embedding: EmbeddingConfig,

    /// External text-generation model configuration
    pub generation: GenerationConfig,

    /// External vision model configuration
    pub vision: VisionConfig,

    /// Retrieval configuration
    pub search: SearchConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to (host:port)
    #[serde(default = "default_bind")]
    pub bind: String,
}

/// On-disk storage layout
///
/// Everything the service persists lives under one data directory and is
/// wholesale-replaced on each ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the index, metadata, and extracted images
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// Binary vector index file
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index.bin")
    }

    /// JSON metadata file mirroring index rows
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.json")
    }

    /// Directory holding extracted page images
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// JSON index of extracted images
    pub fn images_index_path(&self) -> PathBuf {
        self.images_dir().join("images.json")
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum tokens per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

/// External embedding API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL for OpenAI-compatible endpoints
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected embedding dimension for the configured model
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Max inputs per embedding request
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Seconds before embedding requests time out
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

/// External text-generation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL for OpenAI-compatible endpoints
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Chat model identifier
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Token budget for synthesized answers
    #[serde(default = "default_answer_max_tokens")]
    pub answer_max_tokens: usize,

    /// Token budget for follow-up suggestions
    #[serde(default = "default_followup_max_tokens")]
    pub followup_max_tokens: usize,

    /// Seconds before generation requests time out
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

/// External vision model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Vision-capable chat model identifier
    #[serde(default = "default_generation_model")]
    pub model: String,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of nearest chunks returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

// Default value functions
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_max_tokens() -> usize {
    512
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_embedding_batch_size() -> usize {
    32
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_answer_max_tokens() -> usize {
    500
}

fn default_followup_max_tokens() -> usize {
    200
}

fn default_generation_timeout() -> u64 {
    60
}

fn default_top_k() -> usize {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_generation_model(),
            temperature: default_temperature(),
            answer_max_tokens: default_answer_max_tokens(),
            followup_max_tokens: default_followup_max_tokens(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply environment
    /// overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw =
                    std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))?
            }
            None => Config::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("DOCQA_BIND") {
            self.server.bind = bind;
        }

        if let Ok(dir) = std::env::var("DOCQA_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(max_tokens) = std::env::var("DOCQA_CHUNK_MAX_TOKENS")
            && let Ok(value) = max_tokens.parse()
        {
            self.chunking.max_tokens = value;
        }

        if let Ok(url) = std::env::var("DOCQA_EMBEDDING_BASE_URL") {
            self.embedding.base_url = url.clone();
            self.generation.base_url = url;
        }

        if let Ok(model) = std::env::var("DOCQA_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(model) = std::env::var("DOCQA_GENERATION_MODEL") {
            self.generation.model = model;
        }

        if let Ok(model) = std::env::var("DOCQA_VISION_MODEL") {
            self.vision.model = model;
        }

        if let Ok(top_k) = std::env::var("DOCQA_TOP_K")
            && let Ok(value) = top_k.parse()
        {
            self.search.top_k = value;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "chunking.max_tokens".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.dimension".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.search.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "search.top_k".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "generation.temperature".to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.chunking.max_tokens, 512);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.search.top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_paths() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/tmp/docqa"),
        };
        assert_eq!(storage.index_path(), PathBuf::from("/tmp/docqa/index.bin"));
        assert_eq!(
            storage.metadata_path(),
            PathBuf::from("/tmp/docqa/metadata.json")
        );
        assert_eq!(
            storage.images_index_path(),
            PathBuf::from("/tmp/docqa/images/images.json")
        );
    }

    #[test]
    fn test_parse_toml() {
        let raw = r#"
            [server]
            bind = "0.0.0.0:9000"

            [chunking]
            max_tokens = 128

            [search]
            top_k = 3
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.chunking.max_tokens, 128);
        assert_eq!(config.search.top_k, 3);
        // Unspecified sections keep their defaults
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.search.top_k = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.generation.temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
