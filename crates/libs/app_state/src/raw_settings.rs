use common_types::SimilarityMetric;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub search: SearchSettings,
    pub embedder: EmbedderSettings,
    pub secrets: SecretSettings,
}

/// Configuration for the API server.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub host: String,
    pub port: u32,
    pub allowed_origins: Vec<String>,
    pub public_url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Tunables for the query session manager and index adapters.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchSettings {
    pub default_page_size: usize,
    /// Upper bound on `page_size`; requests past it are rejected.
    pub max_page_size: usize,
    /// Deepest retrievable rank per session (top-K cap for lazy extension).
    pub max_depth: usize,
    /// How many candidates to pull from the index per extension round.
    pub fetch_batch: usize,
    /// Max soft-deleted ids skipped per page call while backfilling.
    pub max_backfill: usize,
    pub session_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub metric: SimilarityMetric,
    /// Retries for transient index/embedder failures before surfacing them.
    pub transient_retries: u32,
    pub retry_delay_ms: u64,
}

/// Connection settings for the embedding sidecar.
#[derive(Debug, Deserialize, Clone)]
pub struct EmbedderSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecretSettings {
    pub jwt: String,
    pub database_url: String,
}
