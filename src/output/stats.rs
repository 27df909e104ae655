//! Run statistics and results coverage
//!
//! [`RunStats`] is shared by all workers during a run and snapshotted into a
//! [`RunSummary`] at the end. [`load_coverage`] reads the persisted layout
//! independently of any run.

use crate::extract::TrimRecord;
use crate::state::FailureKind;
use crate::storage::COMPLETION_MARKER;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Counters updated concurrently by workers
#[derive(Debug, Default)]
pub struct RunStats {
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_interrupted: AtomicU64,
    models_discovered: AtomicU64,
    targets_saved: AtomicU64,
    targets_empty: AtomicU64,
    targets_skipped: AtomicU64,
    targets_failed: AtomicU64,
    identity_mismatches: AtomicU64,
    failures_by_kind: Mutex<HashMap<FailureKind, u64>>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_interrupted(&self) {
        self.tasks_interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn models_discovered(&self, count: usize) {
        self.models_discovered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn target_saved(&self) {
        self.targets_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn target_empty(&self) {
        self.targets_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn target_skipped(&self) {
        self.targets_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a target that produced no stored file
    ///
    /// `kind` is `None` when the fetch succeeded but the write did not.
    pub fn target_failed(&self, kind: Option<FailureKind>) {
        self.targets_failed.fetch_add(1, Ordering::Relaxed);
        if let Some(kind) = kind {
            let mut by_kind = self
                .failures_by_kind
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn identity_mismatch(&self) {
        self.identity_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshots the counters into a summary
    pub fn summary(
        &self,
        tasks_pending: usize,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        interrupted: bool,
    ) -> RunSummary {
        let failures_by_kind = self
            .failures_by_kind
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        RunSummary {
            started_at,
            finished_at,
            interrupted,
            tasks_pending: tasks_pending as u64,
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_interrupted: self.tasks_interrupted.load(Ordering::Relaxed),
            models_discovered: self.models_discovered.load(Ordering::Relaxed),
            targets_saved: self.targets_saved.load(Ordering::Relaxed),
            targets_empty: self.targets_empty.load(Ordering::Relaxed),
            targets_skipped: self.targets_skipped.load(Ordering::Relaxed),
            targets_failed: self.targets_failed.load(Ordering::Relaxed),
            identity_mismatches: self.identity_mismatches.load(Ordering::Relaxed),
            failures_by_kind,
        }
    }
}

/// What one run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// True if a shutdown request cut the run short
    pub interrupted: bool,

    /// Tasks that had no completion marker when the run started
    pub tasks_pending: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_interrupted: u64,

    pub models_discovered: u64,
    pub targets_saved: u64,
    pub targets_empty: u64,
    pub targets_skipped: u64,
    pub targets_failed: u64,
    pub identity_mismatches: u64,

    pub failures_by_kind: HashMap<FailureKind, u64>,
}

impl RunSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Targets whose page was actually requested this run
    pub fn targets_fetched(&self) -> u64 {
        self.targets_saved + self.targets_empty + self.targets_failed
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!(
        "Run: {} -> {} ({}s){}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S"),
        summary.finished_at.format("%Y-%m-%d %H:%M:%S"),
        summary.duration_seconds(),
        if summary.interrupted { " [interrupted]" } else { "" }
    );
    println!();

    println!("Tasks:");
    println!("  Pending at start: {}", summary.tasks_pending);
    println!("  Completed: {}", summary.tasks_completed);
    println!("  Failed: {}", summary.tasks_failed);
    println!("  Interrupted: {}", summary.tasks_interrupted);
    println!();

    println!("Targets:");
    println!("  Models discovered: {}", summary.models_discovered);
    println!("  Saved: {}", summary.targets_saved);
    println!("  Saved empty: {}", summary.targets_empty);
    println!("  Skipped (already saved): {}", summary.targets_skipped);
    println!("  Failed: {}", summary.targets_failed);
    println!("  Identity mismatches: {}", summary.identity_mismatches);
    println!();

    if !summary.failures_by_kind.is_empty() {
        println!("Failures by Kind:");
        let mut kinds: Vec<_> = summary.failures_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in kinds {
            println!("  {}: {}", kind, count);
        }
        println!();
    }
}

/// What the results directory holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Make directories present
    pub makes: u64,

    /// Completion markers present
    pub completed_tasks: u64,

    /// Record files present, empty ones included
    pub stored_files: u64,

    /// Record files holding an empty array
    pub empty_files: u64,

    /// Trim records across all readable files
    pub trim_records: u64,

    /// Record files that could not be read or parsed
    pub unreadable_files: u64,

    /// Stored files per make
    pub files_by_make: BTreeMap<String, u64>,
}

/// Scans a results directory
///
/// # Arguments
///
/// * `results_dir` - Root of the persisted layout; a missing directory is empty coverage
///
/// # Returns
///
/// * `Ok(Coverage)` - Counts for the directory
/// * `Err(HarvestError)` - A directory could not be listed
pub fn load_coverage(results_dir: &Path) -> Result<Coverage, HarvestError> {
    let mut coverage = Coverage::default();
    if !results_dir.is_dir() {
        return Ok(coverage);
    }

    for make_entry in fs::read_dir(results_dir)? {
        let make_entry = make_entry?;
        if !make_entry.file_type()?.is_dir() {
            continue;
        }
        coverage.makes += 1;
        let make = make_entry.file_name().to_string_lossy().into_owned();

        for year_entry in fs::read_dir(make_entry.path())? {
            let year_entry = year_entry?;
            if !year_entry.file_type()?.is_dir() {
                continue;
            }

            for file_entry in fs::read_dir(year_entry.path())? {
                let path = file_entry?.path();
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();

                if name == COMPLETION_MARKER {
                    coverage.completed_tasks += 1;
                } else if name.ends_with(".json") {
                    coverage.stored_files += 1;
                    *coverage.files_by_make.entry(make.clone()).or_insert(0) += 1;
                    tally_file(&path, &mut coverage);
                }
            }
        }
    }

    Ok(coverage)
}

fn tally_file(path: &Path, coverage: &mut Coverage) {
    let records: Vec<TrimRecord> = match fs::read(path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
    {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Unreadable results file {}: {}", path.display(), e);
            coverage.unreadable_files += 1;
            return;
        }
    };

    if records.is_empty() {
        coverage.empty_files += 1;
    }
    coverage.trim_records += records.len() as u64;
}

/// Prints a coverage report to stdout
pub fn print_coverage(results_dir: &Path, coverage: &Coverage) {
    println!("=== Results Coverage ===\n");

    println!("Directory: {}", results_dir.display());
    println!("  Makes: {}", coverage.makes);
    println!("  Completed tasks: {}", coverage.completed_tasks);
    println!("  Stored files: {}", coverage.stored_files);
    println!("  Empty files: {}", coverage.empty_files);
    println!("  Trim records: {}", coverage.trim_records);
    if coverage.unreadable_files > 0 {
        println!("  Unreadable files: {}", coverage.unreadable_files);
    }
    println!();

    if !coverage.files_by_make.is_empty() {
        println!("Files by Make:");
        for (make, count) in &coverage.files_by_make {
            println!("  {}: {}", make, count);
        }
        println!();
    }
}
