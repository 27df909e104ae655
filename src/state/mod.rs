//! State module for tracking harvest work
//!
//! # Components
//!
//! - `Task` / `Target`: the (make, year) discovery unit and the (make, model, year) page unit
//! - `FailureKind`: the failure taxonomy driving the retry policy
//! - `AttemptOutcome` / `FetchOutcome`: tagged results of one attempt and of a whole fetch

mod fetch_state;
mod task;

// Re-export main types
pub use fetch_state::{AttemptOutcome, FailureKind, FetchOutcome};
pub use task::{Target, Task};
