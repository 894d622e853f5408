//! Job planning.
//!
//! Per work item:
//! 1. Output missing -> check inputs
//! 2. Output present -> validate; valid -> Skip, invalid -> check inputs
//! 3. Inputs all present -> Enqueue, otherwise FailFast for that item only
//!
//! An invalid existing output is overwritten by the next fusion without a
//! backup. Nothing is retried here; rerunning the batch is the retry.

use futures::stream::{self, StreamExt};
use log::{info, warn};

use crate::dispatch::ProgressTracker;
use crate::domain::WorkItem;
use crate::error::FuseError;
use crate::validation::{ValidationOracle, ValidationPolicy};

/// What to do with one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanDecision {
    /// A valid output already exists
    Skip(String),
    /// Dispatch to the fuser
    Enqueue,
    /// A required input is missing
    FailFast(String),
}

impl PlanDecision {
    pub fn is_enqueue(&self) -> bool {
        matches!(self, PlanDecision::Enqueue)
    }
}

/// Decides per item whether fusion is needed
#[derive(Clone)]
pub struct JobPlanner {
    oracle: ValidationOracle,
}

impl JobPlanner {
    pub fn new(oracle: ValidationOracle) -> Self {
        Self { oracle }
    }

    pub async fn plan(&self, item: &WorkItem, policy: &ValidationPolicy) -> PlanDecision {
        match tokio::fs::try_exists(&item.output).await {
            Ok(true) => {
                let verdict = self.oracle.inspect(&item.output, policy).await;
                if verdict.valid {
                    return PlanDecision::Skip(format!("valid output exists ({})", verdict.reason));
                }
                let err = FuseError::CorruptOutput(verdict.reason);
                info!("{}: {}, re-enqueuing", item.output.display(), err);
            }
            Ok(false) => {}
            Err(e) => {
                // Unknown state, do not risk overwriting it
                warn!("{}: cannot check output: {}", item.output.display(), e);
                return PlanDecision::FailFast(format!("cannot check output {}: {}", item.output.display(), e));
            }
        }

        let missing = item.missing_inputs().await;
        if !missing.is_empty() {
            let list = missing.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
            let err = FuseError::MissingInput(list);
            warn!("{}: {}", item.name, err);
            return PlanDecision::FailFast(err.to_string());
        }

        PlanDecision::Enqueue
    }

    /// Plan a batch, validating up to `concurrency` outputs at a time.
    ///
    /// Items that need no fusion advance `progress` as soon as they are
    /// decided. The returned order is unspecified.
    pub async fn plan_all(
        &self,
        items: Vec<WorkItem>,
        policy: &ValidationPolicy,
        concurrency: usize,
        progress: &ProgressTracker<'_>,
    ) -> Vec<(WorkItem, PlanDecision)> {
        stream::iter(items)
            .map(|item| async move {
                let decision = self.plan(&item, policy).await;
                if !decision.is_enqueue() {
                    progress.advance();
                }
                (item, decision)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }
}
