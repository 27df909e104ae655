/// Fetch outcome definitions for the per-target retry state machine
///
/// A fetch moves `Attempting → {Success, Retryable, Fatal}`; `Retryable`
/// re-enters `Attempting` until the attempt budget runs out.
use crate::extract::TrimRecord;
use std::fmt;

/// Failure taxonomy for a single fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeout, connection reset or a throttling status
    TransientNetwork,

    /// Challenge markers or blocked-content phrases in the response
    DetectionSuspected,

    /// The page rendered without the expected identity element
    StructuralMismatch,

    /// Anything else; never retried
    UnexpectedFault,
}

impl FailureKind {
    /// Returns true if an attempt failing this way should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork | Self::DetectionSuspected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient_network",
            Self::DetectionSuspected => "detection_suspected",
            Self::StructuralMismatch => "structural_mismatch",
            Self::UnexpectedFault => "unexpected_fault",
        }
    }

    pub fn all_kinds() -> Vec<Self> {
        vec![
            Self::TransientNetwork,
            Self::DetectionSuspected,
            Self::StructuralMismatch,
            Self::UnexpectedFault,
        ]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one pass through the navigation / wait / extract steps
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The page yielded at least one record
    Success(Vec<TrimRecord>),

    /// The page declared its identity but yielded no qualifying record
    Empty,

    /// The attempt failed in a way worth repeating
    Retryable { kind: FailureKind, reason: String },

    /// The attempt failed for good
    Fatal { kind: FailureKind, reason: String },
}

impl AttemptOutcome {
    /// Builds a failed outcome, letting the kind decide whether it is retryable
    pub fn failure(kind: FailureKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if kind.is_retryable() {
            Self::Retryable { kind, reason }
        } else {
            Self::Fatal { kind, reason }
        }
    }
}

/// Terminal result of the fetch controller for one target
#[derive(Debug)]
pub enum FetchOutcome {
    /// Records extracted from the page
    Records(Vec<TrimRecord>),

    /// No data for this target
    Empty,

    /// The target was abandoned
    Failed {
        kind: FailureKind,
        attempts: u32,
        reason: String,
    },

    /// A shutdown request arrived before the target finished
    Interrupted,
}

impl FetchOutcome {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
