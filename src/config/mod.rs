//! Configuration module for Wheel-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`HarvestConfig`] is immutable and handed to the orchestrator
//! at construction; nothing in the crate reads process-wide settings.
//!
//! # Example
//!
//! ```no_run
//! use wheel_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting {} makes", config.targets.makes.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CatalogConfig, DetectionConfig, ExtractionConfig, HarvestConfig, HarvestSection,
    IdentityConfig, OutputConfig, PacingConfig, RetryConfig, TargetsConfig, Viewport,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_workers};
