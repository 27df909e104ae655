//! Filesystem store
//!
//! Layout:
//!
//! ```text
//! {results_dir}/{make}/{year}/{make}__{model}__{year}.json
//! {results_dir}/{make}/{year}/.done
//! ```
//!
//! Record files are written to a `.tmp` sibling and renamed into place, so a
//! file at the final path is always complete.

use crate::extract::TrimRecord;
use crate::state::{Target, Task};
use crate::storage::{StorageError, StorageResult, Store};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the per-task completion marker
pub const COMPLETION_MARKER: &str = ".done";

/// Store rooted at a results directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding everything for one (make, year) pair
    pub fn task_dir(&self, make: &str, year: u16) -> StorageResult<PathBuf> {
        Ok(self.root.join(path_component(make)?).join(year.to_string()))
    }

    /// Final path of a target's record file
    pub fn target_path(&self, target: &Target) -> StorageResult<PathBuf> {
        let model = target.model.replace('/', "_");
        let make = path_component(&target.make)?;
        let model = path_component(&model)?;
        Ok(self
            .task_dir(make, target.year)?
            .join(format!("{}__{}__{}.json", make, model, target.year)))
    }

    pub fn marker_path(&self, task: &Task) -> StorageResult<PathBuf> {
        Ok(self.task_dir(&task.make, task.year)?.join(COMPLETION_MARKER))
    }
}

impl Store for FsStore {
    fn results_dir(&self) -> &Path {
        &self.root
    }

    fn is_saved(&self, target: &Target) -> bool {
        self.target_path(target)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    fn save(&self, target: &Target, records: &[TrimRecord]) -> StorageResult<PathBuf> {
        let path = self.target_path(target)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(records)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(path)
    }

    fn is_complete(&self, task: &Task) -> bool {
        self.marker_path(task)
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    fn mark_complete(&self, task: &Task) -> StorageResult<()> {
        let path = self.marker_path(task)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, b"")?;
        Ok(())
    }
}

/// Rejects identifiers that would escape or collapse the layout
fn path_component(value: &str) -> StorageResult<&str> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(|c| matches!(c, '/' | '\\' | '\0'));
    if invalid {
        Err(StorageError::InvalidPath(value.to_string()))
    } else {
        Ok(value)
    }
}
