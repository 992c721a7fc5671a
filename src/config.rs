//! Configuration for the graph, vector store and embedding backends
//!
//! Loads configuration from config.yml file

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::knowledge_base::chunker::ChunkingStrategy;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;
pub const FULLTEXT_INDEX_NAME: &str = "fulltext_index_entity_name";
pub const INDEX_TIMEOUT_SECS: u64 = 10;
pub const SEARCH_TIMEOUT_SECS: u64 = 30;
pub const COLLECTION_NAME: &str = "knowledge_doc";
pub const EMBEDDING_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const EMBEDDING_MODEL: &str = "text-embedding-v4";
pub const EMBEDDING_DIMENSION: u64 = 1024;
pub const EMBEDDING_TIMEOUT_SECS: u64 = 60;
pub const NEO4J_URI: &str = "bolt://localhost:7687";
pub const QDRANT_URL: &str = "http://localhost:6334";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    neo4j: Option<Neo4jYaml>,
    qdrant: Option<QdrantYaml>,
    embedding: Option<EmbeddingYaml>,
    search: Option<SearchYaml>,
    chunking: Option<ChunkingYaml>,
    log_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Neo4jYaml {
    uri: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QdrantYaml {
    url: Option<String>,
    collection: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingYaml {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    dimension: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    timeout_secs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchYaml {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    default_limit: Option<String>,
    fulltext_index: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    index_timeout_secs: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    timeout_secs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkingYaml {
    size: Option<usize>,
    overlap: Option<usize>,
    strategy: Option<ChunkingStrategy>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct Neo4jSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct QdrantSettings {
    pub url: String,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub dimension: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Total budget used when the caller passes `limit <= 0`
    pub default_limit: i64,
    pub fulltext_index: String,
    pub index_timeout_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ChunkingSettings {
    /// Units (words or characters) per chunk
    pub size: usize,
    /// Units shared between neighbouring chunks
    pub overlap: usize,
    pub strategy: ChunkingStrategy,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub neo4j: Neo4jSettings,
    pub qdrant: QdrantSettings,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
    pub chunking: ChunkingSettings,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml string values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::from_yaml(YamlConfig::default()))
    }

    /// Load from an explicit path, or fall back to the default lookup
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::new()),
        }
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if let Some(var_name) = placeholder(v) {
                if let Ok(env_val) = std::env::var(var_name) {
                    return Some(env_val);
                }
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            return Some(env_val);
        }
        value.filter(|v| placeholder(v).is_none())
    }

    /// Resolve a numeric value; explicit YAML numbers win over `env_key`
    fn resolve_env_number<T: std::str::FromStr>(value: Option<String>, env_key: &str) -> Option<T> {
        if let Some(ref v) = value {
            if let Some(var_name) = placeholder(v) {
                if let Some(parsed) = std::env::var(var_name).ok().and_then(|e| e.parse().ok()) {
                    return Some(parsed);
                }
            }
            if let Ok(parsed) = v.parse::<T>() {
                return Some(parsed);
            }
        }
        std::env::var(env_key).ok().and_then(|e| e.parse().ok())
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("failed to parse config file: {}", e)))?;

        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let neo4j = yaml.neo4j.unwrap_or_default();
        let qdrant = yaml.qdrant.unwrap_or_default();
        let embedding = yaml.embedding.unwrap_or_default();
        let search = yaml.search.unwrap_or_default();
        let chunking = yaml.chunking.unwrap_or_default();

        let api_key = Self::resolve_env_string(embedding.api_key, "EMBEDDING_API_KEY")
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();

        let chunk_size = chunking.size.unwrap_or(200).max(1);

        Self {
            neo4j: Neo4jSettings {
                uri: Self::resolve_env_string(neo4j.uri, "NEO4J_URI")
                    .unwrap_or_else(|| NEO4J_URI.to_string()),
                user: Self::resolve_env_string(neo4j.user, "NEO4J_USER")
                    .unwrap_or_else(|| "neo4j".to_string()),
                password: Self::resolve_env_string(neo4j.password, "NEO4J_PASSWORD")
                    .unwrap_or_default(),
            },
            qdrant: QdrantSettings {
                url: Self::resolve_env_string(qdrant.url, "QDRANT_URL")
                    .unwrap_or_else(|| QDRANT_URL.to_string()),
                collection: qdrant
                    .collection
                    .unwrap_or_else(|| COLLECTION_NAME.to_string()),
            },
            embedding: EmbeddingSettings {
                api_key,
                base_url: Self::resolve_env_string(embedding.base_url, "EMBEDDING_BASE_URL")
                    .unwrap_or_else(|| EMBEDDING_BASE_URL.to_string()),
                model: Self::resolve_env_string(embedding.model, "EMBEDDING_MODEL")
                    .unwrap_or_else(|| EMBEDDING_MODEL.to_string()),
                dimension: Self::resolve_env_number(embedding.dimension, "EMBEDDING_DIMENSION")
                    .unwrap_or(EMBEDDING_DIMENSION),
                timeout_secs: Self::resolve_env_number(
                    embedding.timeout_secs,
                    "EMBEDDING_TIMEOUT_SECS",
                )
                .unwrap_or(EMBEDDING_TIMEOUT_SECS),
            },
            search: SearchSettings {
                default_limit: Self::resolve_env_number(search.default_limit, "SEARCH_DEFAULT_LIMIT")
                    .filter(|limit: &i64| *limit > 0)
                    .unwrap_or(DEFAULT_SEARCH_LIMIT),
                fulltext_index: search
                    .fulltext_index
                    .unwrap_or_else(|| FULLTEXT_INDEX_NAME.to_string()),
                index_timeout_secs: Self::resolve_env_number(
                    search.index_timeout_secs,
                    "INDEX_TIMEOUT_SECS",
                )
                .unwrap_or(INDEX_TIMEOUT_SECS),
                timeout_secs: Self::resolve_env_number(search.timeout_secs, "SEARCH_TIMEOUT_SECS")
                    .unwrap_or(SEARCH_TIMEOUT_SECS),
            },
            chunking: ChunkingSettings {
                size: chunk_size,
                overlap: chunking.overlap.unwrap_or(20).min(chunk_size - 1),
                strategy: chunking.strategy.unwrap_or_default(),
            },
            log_level: yaml.log_level.unwrap_or_else(|| "info".to_string()),
        }
    }

    /// `tracing` filter directive for this crate derived from `log_level`
    pub fn log_directive(&self) -> String {
        let level = match self.log_level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" => "error",
            _ => "info",
        };
        format!("diabetes_kg={}", level)
    }
}

fn placeholder(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|v| v.strip_suffix('}'))
}
