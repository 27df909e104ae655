//! Storage traits and error types
//!
//! This module defines the trait interface for result stores and
//! associated error types.

use crate::extract::TrimRecord;
use crate::state::{Target, Task};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path component '{0}'")]
    InvalidPath(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Idempotent persistence of harvested records
///
/// Implementations must be safe to share between workers. Workers never touch
/// the same target or task concurrently, so no locking is required beyond that.
pub trait Store: Send + Sync {
    /// Root directory of the persisted layout
    fn results_dir(&self) -> &Path;

    // ===== Targets =====

    /// Returns true if a stored file exists for the target, whatever its content
    fn is_saved(&self, target: &Target) -> bool;

    /// Persists the full record sequence for a target
    ///
    /// An empty slice is a valid result and is stored as an empty array.
    ///
    /// # Returns
    ///
    /// The path of the stored file
    fn save(&self, target: &Target, records: &[TrimRecord]) -> StorageResult<PathBuf>;

    // ===== Tasks =====

    /// Returns true if the completion marker for the task exists
    fn is_complete(&self, task: &Task) -> bool;

    /// Writes the completion marker for the task
    fn mark_complete(&self, task: &Task) -> StorageResult<()>;
}
