//! Arandu Reproduction Pipeline
//!
//! End-to-end containerised run for a reproducibility job:
//! clone -> detect environment -> build image -> execute -> artifacts.

pub mod artifacts;
pub mod cloner;
pub mod env_detector;
pub mod executor;
pub mod image;
pub mod processor;

pub use env_detector::{detect_environment, Dependency, EnvType, EnvironmentInfo};
pub use executor::ExecutionResult;
pub use processor::JobProcessor;
