//! Harvest engine
//!
//! This module contains the core harvesting logic, including:
//! - The fetch controller with its retry/backoff state machine
//! - Model discovery through the catalog's filter form
//! - Bot-challenge detection and human-paced delays
//! - Orchestration of workers, sessions and persistence
//! - Cooperative shutdown

mod coordinator;
mod detection;
mod discovery;
mod fetcher;
mod pacing;
mod shutdown;

#[cfg(test)]
mod testing;

pub use coordinator::Orchestrator;
pub use detection::DetectionRules;
pub use discovery::{model_slugs, DiscoveryOutcome, ModelDiscovery};
pub use fetcher::{FetchController, FetchReport, RetryPolicy, TRIMS_READY};
pub use pacing::Pacing;
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
