//! Configuration for ingestion and retrieval
//!
//! Loads configuration from graphrag.yml; environment variables override
//! individual values.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};
use crate::graphrag::chunker::ChunkingStrategy;

/// Default constants (fallback if graphrag.yml not found)
pub const CONFIG_FILE: &str = "graphrag.yml";
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
pub const DEFAULT_CHUNK_OVERLAP: usize = 64;
pub const DEFAULT_KEYWORDS_TOP_N: usize = 5;
pub const DEFAULT_K: usize = 5;
pub const DEFAULT_DEPTH: usize = 2;
pub const DEFAULT_FETCH_K: usize = 100;
pub const DEFAULT_ADJACENT_K: usize = 10;
pub const DEFAULT_LAMBDA_MULT: f32 = 0.5;
pub const DEFAULT_EMBEDDING_DIM: usize = 256;
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Entity labels assigned by the entity link extractor.
pub const DEFAULT_ENTITY_LABELS: [&str; 8] = [
    "Person",
    "Organization",
    "Location",
    "Product",
    "Technology",
    "Concept",
    "Topic",
    "Category",
];

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    chunking: Option<ChunkingConfig>,
    extraction: Option<ExtractionConfig>,
    retrieval: Option<RetrievalConfig>,
    embedding: Option<EmbeddingConfig>,
    ingest: Option<IngestConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkingConfig {
    size: Option<usize>,
    overlap: Option<usize>,
    strategy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractionConfig {
    keywords_top_n: Option<usize>,
    entity_labels: Option<Vec<String>>,
    gazetteer: Option<BTreeMap<String, Vec<String>>>,
    keywords: Option<bool>,
    entities: Option<bool>,
    hyperlinks: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalConfig {
    k: Option<usize>,
    depth: Option<usize>,
    fetch_k: Option<usize>,
    adjacent_k: Option<usize>,
    lambda_mult: Option<f32>,
    score_threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingConfig {
    dimension: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct IngestConfig {
    batch_size: Option<usize>,
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Chunk size (characters for recursive splitting, words otherwise)
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunking_strategy: ChunkingStrategy,
    /// Keywords kept per document
    pub keywords_top_n: usize,
    pub entity_labels: Vec<String>,
    /// Label -> known surface forms
    pub gazetteer: BTreeMap<String, Vec<String>>,
    pub extract_keywords: bool,
    pub extract_entities: bool,
    pub extract_hyperlinks: bool,
    pub k: usize,
    pub depth: usize,
    pub fetch_k: usize,
    pub adjacent_k: usize,
    pub lambda_mult: f32,
    pub score_threshold: Option<f32>,
    pub embedding_dim: usize,
    /// Documents per ingestion batch (one embedding call per batch)
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load configuration from graphrag.yml or use defaults.
    /// Environment variables take precedence over file values.
    pub fn new() -> Self {
        Self::load_from_file(CONFIG_FILE)
            .or_else(|_| Self::load_from_file(format!("../{}", CONFIG_FILE)))
            .unwrap_or_else(|_| {
                let mut config = Self::defaults();
                config.apply_env_overrides();
                config
            })
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file, then apply env overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text (no environment lookups).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let chunking = yaml.chunking.unwrap_or_default();
        let extraction = yaml.extraction.unwrap_or_default();
        let retrieval = yaml.retrieval.unwrap_or_default();
        let embedding = yaml.embedding.unwrap_or_default();
        let ingest = yaml.ingest.unwrap_or_default();

        let chunking_strategy = match chunking.strategy {
            Some(name) => name.parse()?,
            None => ChunkingStrategy::Recursive,
        };

        let config = Self {
            chunk_size: chunking.size.unwrap_or(DEFAULT_CHUNK_SIZE),
            chunk_overlap: chunking.overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP),
            chunking_strategy,
            keywords_top_n: extraction.keywords_top_n.unwrap_or(DEFAULT_KEYWORDS_TOP_N),
            entity_labels: extraction
                .entity_labels
                .unwrap_or_else(default_entity_labels),
            gazetteer: extraction.gazetteer.unwrap_or_default(),
            extract_keywords: extraction.keywords.unwrap_or(true),
            extract_entities: extraction.entities.unwrap_or(true),
            extract_hyperlinks: extraction.hyperlinks.unwrap_or(true),
            k: retrieval.k.unwrap_or(DEFAULT_K),
            depth: retrieval.depth.unwrap_or(DEFAULT_DEPTH),
            fetch_k: retrieval.fetch_k.unwrap_or(DEFAULT_FETCH_K),
            adjacent_k: retrieval.adjacent_k.unwrap_or(DEFAULT_ADJACENT_K),
            lambda_mult: retrieval.lambda_mult.unwrap_or(DEFAULT_LAMBDA_MULT),
            score_threshold: retrieval.score_threshold,
            embedding_dim: embedding.dimension.unwrap_or(DEFAULT_EMBEDDING_DIM),
            batch_size: ingest.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults
    fn defaults() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            chunking_strategy: ChunkingStrategy::Recursive,
            keywords_top_n: DEFAULT_KEYWORDS_TOP_N,
            entity_labels: default_entity_labels(),
            gazetteer: BTreeMap::new(),
            extract_keywords: true,
            extract_entities: true,
            extract_hyperlinks: true,
            k: DEFAULT_K,
            depth: DEFAULT_DEPTH,
            fetch_k: DEFAULT_FETCH_K,
            adjacent_k: DEFAULT_ADJACENT_K,
            lambda_mult: DEFAULT_LAMBDA_MULT,
            score_threshold: None,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Apply `GRAPHRAG_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.chunk_size = env_or("GRAPHRAG_CHUNK_SIZE", self.chunk_size);
        self.chunk_overlap = env_or("GRAPHRAG_CHUNK_OVERLAP", self.chunk_overlap);
        self.k = env_or("GRAPHRAG_K", self.k);
        self.depth = env_or("GRAPHRAG_DEPTH", self.depth);
        self.lambda_mult = env_or("GRAPHRAG_LAMBDA_MULT", self.lambda_mult);
        self.embedding_dim = env_or("GRAPHRAG_EMBEDDING_DIM", self.embedding_dim);
        self.batch_size = env_or("GRAPHRAG_BATCH_SIZE", self.batch_size);
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.lambda_mult) {
            return Err(Error::Config(format!(
                "lambda_mult must be within [0, 1], got {}",
                self.lambda_mult
            )));
        }
        if self.embedding_dim == 0 {
            return Err(Error::Config("embedding dimension must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be positive".into()));
        }
        Ok(())
    }
}

fn default_entity_labels() -> Vec<String> {
    DEFAULT_ENTITY_LABELS.iter().map(|s| s.to_string()).collect()
}

/// Read and parse an env var, keeping `current` when unset or malformed.
fn env_or<T: std::str::FromStr + Copy>(key: &str, current: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring {}={:?}: not a valid value", key, raw);
                current
            }
        },
        Err(_) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.chunk_overlap, 64);
        assert_eq!(config.chunking_strategy, ChunkingStrategy::Recursive);
        assert_eq!(config.k, 5);
        assert_eq!(config.depth, 2);
        assert_eq!(config.fetch_k, 100);
        assert_eq!(config.adjacent_k, 10);
        assert!((config.lambda_mult - 0.5).abs() < f32::EPSILON);
        assert!(config.score_threshold.is_none());
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.entity_labels.len(), 8);
        assert!(config.entity_labels.contains(&"Technology".to_string()));
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
chunking:
  size: 200
  overlap: 20
  strategy: words
extraction:
  keywords_top_n: 3
  entity_labels: [Person, Technology]
  gazetteer:
    Technology: [Rust, Cassandra]
  hyperlinks: false
retrieval:
  k: 7
  depth: 1
  lambda_mult: 0.25
  score_threshold: 0.1
embedding:
  dimension: 64
ingest:
  batch_size: 4
"#;
        let config = Config::from_yaml_str(yaml).unwrap();

        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.chunk_overlap, 20);
        assert_eq!(config.chunking_strategy, ChunkingStrategy::Words);
        assert_eq!(config.keywords_top_n, 3);
        assert_eq!(config.entity_labels, vec!["Person", "Technology"]);
        assert_eq!(config.gazetteer["Technology"], vec!["Rust", "Cassandra"]);
        assert!(!config.extract_hyperlinks);
        assert!(config.extract_keywords);
        assert_eq!(config.k, 7);
        assert_eq!(config.depth, 1);
        assert_eq!(config.fetch_k, DEFAULT_FETCH_K);
        assert!((config.lambda_mult - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.score_threshold, Some(0.1));
        assert_eq!(config.embedding_dim, 64);
        assert_eq!(config.batch_size, 4);
    }

    #[test]
    fn test_rejects_out_of_range_lambda() {
        let err = Config::from_yaml_str("retrieval:\n  lambda_mult: 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        let err = Config::from_yaml_str("chunking:\n  strategy: sentences\n").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let err = Config::from_yaml_str("retrieval: [1, 2").unwrap_err();
        assert!(matches!(err, Error::SerializationError(_)));
    }

    #[test]
    fn test_validate_zero_values() {
        let mut config = Config::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.embedding_dim = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _k = EnvGuard::set("GRAPHRAG_K", "9");
        let _lambda = EnvGuard::set("GRAPHRAG_LAMBDA_MULT", "0.8");

        let mut config = Config::from_yaml_str("retrieval:\n  k: 3\n").unwrap();
        config.apply_env_overrides();

        assert_eq!(config.k, 9);
        assert!((config.lambda_mult - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_malformed_env_override_is_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _depth = EnvGuard::set("GRAPHRAG_DEPTH", "deep");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.depth, DEFAULT_DEPTH);
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let err = Config::load_from_file("/nonexistent/graphrag.yml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file_on_disk() {
        let _lock = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphrag.yml");
        std::fs::write(&path, "retrieval:\n  adjacent_k: 3\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.adjacent_k, 3);
    }
}
