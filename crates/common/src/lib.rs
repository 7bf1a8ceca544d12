//! Arandu Common Library
//!
//! Shared code for the Arandu services including:
//! - Configuration management
//! - Error types and handling
//! - Structured logging and step spans
//! - In-process metrics aggregation
//! - Redis-backed job queues
//! - Database entities, migrations, and repository
//! - Paper storage paths and PDF validation

pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod queue;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result, WorkerError};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Image tag prefix for reproduction job images
pub const JOB_IMAGE_PREFIX: &str = "arandu-job-";
