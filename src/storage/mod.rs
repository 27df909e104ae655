//! Storage module for persisting harvest results
//!
//! This module handles all on-disk persistence, including:
//! - Per-target record files, whose existence marks a target as fetched
//! - Per-task completion markers, whose existence retires a task for good
//! - Atomic writes through a temporary sibling and rename

mod fs;
mod traits;

pub use fs::{FsStore, COMPLETION_MARKER};
pub use traits::{StorageError, StorageResult, Store};
