//! Output module for run summaries and coverage reports
//!
//! This module handles:
//! - Counting what a run did while workers are active
//! - Printing the end-of-run summary
//! - Scanning a results directory for a coverage report

pub mod stats;

pub use stats::{load_coverage, print_coverage, print_summary, Coverage, RunStats, RunSummary};
