//! Job outcome types.
//!
//! One outcome is produced per work item per run.

use std::fmt;

/// Outcome of processing a single work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Nothing was written - a valid output already exists, or the fuser hit
    /// a known defect and the item was passed over with a warning
    Skipped(String),
    /// The fuser produced the output artifact
    Completed,
    /// The item could not be processed (missing input, fusion error, panic)
    Failed(String),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, JobOutcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            JobOutcome::Completed => write!(f, "completed"),
            JobOutcome::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}
