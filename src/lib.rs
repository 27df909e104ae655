//! Wheel-Harvest: a resumable wheel and tire fitment harvester
//!
//! This crate walks a (make × year) cross-product on a rendered vehicle catalog,
//! discovers the models available for each pair, extracts trim-level fitment
//! tables into typed records and persists them idempotently on disk.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod renderer;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Wheel-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Renderer error: {0}")]
    Render(#[from] renderer::RenderError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Wheel-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::HarvestConfig;
pub use crawler::{Orchestrator, ShutdownSignal, ShutdownTrigger};
pub use extract::{Extractor, TireRow, TrimRecord};
pub use state::{FailureKind, FetchOutcome, Target, Task};
pub use storage::{FsStore, Store};
