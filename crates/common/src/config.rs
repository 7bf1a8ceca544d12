//! Configuration management for Arandu services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/<env>, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// Container runtime configuration
    #[serde(default)]
    pub docker: DockerConfig,

    /// Execution timeouts and log bounds
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Storage base paths
    #[serde(default)]
    pub storage: StorageConfig,

    /// Public API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Retrieval (RAG) settings
    #[serde(default)]
    pub rag: RagConfig,

    /// LLM settings
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DockerConfig {
    /// Container runtime socket
    #[serde(default = "default_docker_socket")]
    pub socket: String,

    /// CPU limit in fractional cores
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: f64,

    /// Memory limit with unit suffix (g/m/k or raw bytes)
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,

    /// Network mode: "none" (default) or "bridge"
    #[serde(default = "default_network_mode")]
    pub network_mode: String,

    /// Read-only root filesystem when viable
    #[serde(default = "default_readonly_rootfs")]
    pub readonly_rootfs: bool,

    /// Non-root user name inside containers
    #[serde(default = "default_docker_user")]
    pub user: String,

    /// Non-root user UID
    #[serde(default = "default_docker_user_uid")]
    pub user_uid: u32,

    /// Reserved: allowed domains for network access (empty = no network)
    #[serde(default)]
    pub allowlist_domains: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Default container execution timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: u64,

    /// Reproduction job queue timeout in seconds
    #[serde(default = "default_job_timeout_seconds")]
    pub job_timeout_seconds: u64,

    /// Review queue timeout in seconds
    #[serde(default = "default_review_timeout_seconds")]
    pub review_timeout_seconds: u64,

    /// PDF parsing timeout in seconds
    #[serde(default = "default_pdf_timeout_seconds")]
    pub pdf_parsing_timeout_seconds: u64,

    /// Maximum combined log preview size in bytes
    #[serde(default = "default_max_log_size")]
    pub max_log_size_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Base path for job artifacts
    #[serde(default = "default_artifacts_base")]
    pub artifacts_base_path: PathBuf,

    /// Base path for cloned repositories
    #[serde(default = "default_temp_repos")]
    pub temp_repos_path: PathBuf,

    /// Base path for hosted papers
    #[serde(default = "default_papers_base")]
    pub papers_base_path: PathBuf,

    /// Base path for review artifacts
    #[serde(default = "default_reviews_base")]
    pub reviews_base_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Public base URL of the API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Frontend origin for CORS
    #[serde(default = "default_web_origin")]
    pub web_origin: String,

    /// Maximum accepted PDF size in megabytes
    #[serde(default = "default_max_pdf_size_mb")]
    pub max_pdf_size_mb: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RagConfig {
    /// Enable the retrieval pipeline
    #[serde(default = "default_rag_enabled")]
    pub enabled: bool,

    /// Enable best-effort Crossref metadata lookups
    #[serde(default = "default_crossref_enabled")]
    pub crossref_enabled: bool,

    /// Contact address sent to the Crossref API
    #[serde(default = "default_crossref_mailto")]
    pub crossref_mailto: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Weight for dense search in hybrid fusion (1 - alpha for BM25)
    #[serde(default = "default_dense_weight")]
    pub dense_weight: f32,

    /// Number of citations to return per claim
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum score threshold for citation candidates
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Enable LLM features (narrative generation)
    #[serde(default = "default_llm_enabled")]
    pub enabled: bool,

    /// API key (set via APP__LLM__API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_database_url() -> String { "sqlite://arandu.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_redis_url() -> String { "redis://localhost:6379/0".to_string() }
fn default_docker_socket() -> String { "unix:///var/run/docker.sock".to_string() }
fn default_cpu_limit() -> f64 { 2.0 }
fn default_memory_limit() -> String { "4g".to_string() }
fn default_network_mode() -> String { "none".to_string() }
fn default_readonly_rootfs() -> bool { true }
fn default_docker_user() -> String { "arandu-user".to_string() }
fn default_docker_user_uid() -> u32 { 1000 }
fn default_timeout_seconds() -> u64 { 1800 }
fn default_job_timeout_seconds() -> u64 { 3600 }
fn default_review_timeout_seconds() -> u64 { 90 }
fn default_pdf_timeout_seconds() -> u64 { 30 }
fn default_max_log_size() -> usize { 1_000_000 }
fn default_artifacts_base() -> PathBuf { std::env::temp_dir().join("arandu").join("artifacts") }
fn default_temp_repos() -> PathBuf { std::env::temp_dir().join("arandu").join("repos") }
fn default_papers_base() -> PathBuf { std::env::temp_dir().join("arandu").join("papers") }
fn default_reviews_base() -> PathBuf { std::env::temp_dir().join("arandu").join("reviews") }
fn default_api_base_url() -> String { "http://localhost:8000".to_string() }
fn default_web_origin() -> String { "http://localhost:3000".to_string() }
fn default_max_pdf_size_mb() -> u64 { 25 }
fn default_rag_enabled() -> bool { true }
fn default_crossref_enabled() -> bool { true }
fn default_crossref_mailto() -> String { "contact@arandu.org".to_string() }
fn default_embedding_model() -> String { "all-MiniLM-L6-v2".to_string() }
fn default_dense_weight() -> f32 { 0.5 }
fn default_top_k() -> usize { 5 }
fn default_min_score() -> f32 { 0.3 }
fn default_llm_enabled() -> bool { true }
fn default_llm_model() -> String { "gemini-2.5-flash-lite".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: default_database_url(), max_connections: default_max_connections() }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { url: default_redis_url() }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: default_docker_socket(),
            cpu_limit: default_cpu_limit(),
            memory_limit: default_memory_limit(),
            network_mode: default_network_mode(),
            readonly_rootfs: default_readonly_rootfs(),
            user: default_docker_user(),
            user_uid: default_docker_user_uid(),
            allowlist_domains: Vec::new(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: default_timeout_seconds(),
            job_timeout_seconds: default_job_timeout_seconds(),
            review_timeout_seconds: default_review_timeout_seconds(),
            pdf_parsing_timeout_seconds: default_pdf_timeout_seconds(),
            max_log_size_bytes: default_max_log_size(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifacts_base_path: default_artifacts_base(),
            temp_repos_path: default_temp_repos(),
            papers_base_path: default_papers_base(),
            reviews_base_path: default_reviews_base(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            web_origin: default_web_origin(),
            max_pdf_size_mb: default_max_pdf_size_mb(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: default_rag_enabled(),
            crossref_enabled: default_crossref_enabled(),
            crossref_mailto: default_crossref_mailto(),
            embedding_model: default_embedding_model(),
            dense_weight: default_dense_weight(),
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_llm_enabled(),
            api_key: String::new(),
            model: default_llm_model(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            docker: DockerConfig::default(),
            execution: ExecutionConfig::default(),
            storage: StorageConfig::default(),
            api: ApiConfig::default(),
            rag: RagConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__DOCKER__CPU_LIMIT=1.5
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the container execution timeout as Duration
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.default_timeout_seconds)
    }

    /// Get the review queue timeout as Duration
    pub fn review_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.review_timeout_seconds)
    }

    /// Maximum accepted PDF size in bytes
    pub fn max_pdf_size_bytes(&self) -> u64 {
        self.api.max_pdf_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.docker.network_mode, "none");
        assert_eq!(config.docker.user, "arandu-user");
        assert_eq!(config.execution.default_timeout_seconds, 1800);
        assert_eq!(config.rag.top_k, 5);
    }

    #[test]
    fn test_storage_defaults_under_temp() {
        let config = AppConfig::default();
        assert!(config.storage.artifacts_base_path.starts_with(std::env::temp_dir()));
        assert!(config.storage.papers_base_path.ends_with("papers"));
    }

    #[test]
    fn test_max_pdf_size_bytes() {
        let config = AppConfig::default();
        assert_eq!(config.max_pdf_size_bytes(), 25 * 1024 * 1024);
    }
}
