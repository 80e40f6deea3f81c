use config::{Config, File};
use serde::Deserialize;

use crate::error::FolioError;

#[derive(Debug, Deserialize, Clone)]
pub struct FolioConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Expected embedding provider shape. Responses that disagree with
/// `model`/`dimensions` are rejected by the embedder subsystem.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingSettings {
    pub model: String,
    pub dimensions: usize,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommendConfig {
    /// How many nearest neighbours to persist per item.
    pub top_k: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Extra rows fetched from each source beyond `page * limit` when
    /// merging the combined feed. See `subsystems::feed` for the caveat.
    pub overfetch_buffer: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            overfetch_buffer: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8780,
        }
    }
}

impl FolioConfig {
    pub fn load(path: &str) -> Result<Self, FolioError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        Ok(s.try_deserialize()?)
    }
}
