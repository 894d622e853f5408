//! Bounded-concurrency dispatch of fusion jobs.
//!
//! Each enqueued work item is fused on its own tokio task, at most `workers`
//! at a time. A failing or panicking job never affects its siblings:
//! - fuser succeeded -> Completed
//! - uninitialized-state defect -> Skipped, with a warning
//! - any other error or a panic -> Failed
//!
//! Outputs are written by the fuser directly; a crash mid-write leaves a
//! corrupt artifact that the next run's validation catches.

pub mod progress;

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::domain::{FusionMethod, JobOutcome, Weights, WorkItem};
use crate::fusion::{FusionError, FusionRequest, Fuser};

pub use progress::{ConsoleProgress, NullProgress, ProgressEvent, ProgressSink, ProgressTracker};

/// Default number of concurrent fusion jobs
pub const DEFAULT_WORKERS: usize = 8;

/// Parameters shared by every job of one dispatch
#[derive(Debug, Clone)]
pub struct DispatchParams {
    /// Label used to prefix per-item messages, e.g. "mav 2023/BraTS-GLI"
    pub run_label: String,
    pub method: FusionMethod,
    pub weights: Option<Weights>,
}

/// Aggregate result of one dispatch
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    /// Item name and outcome, in completion order
    pub outcomes: Vec<(String, JobOutcome)>,
}

impl DispatchSummary {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_completed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failed()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Fixed-size pool of fusion workers
#[derive(Debug, Clone)]
pub struct DispatchPool {
    workers: usize,
}

impl Default for DispatchPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl DispatchPool {
    /// Create a pool; zero workers is treated as one
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fuse every job, advancing `progress` after each one finishes
    pub async fn run(
        &self,
        jobs: Vec<WorkItem>,
        fuser: Arc<dyn Fuser>,
        params: &DispatchParams,
        progress: &ProgressTracker<'_>,
    ) -> DispatchSummary {
        let sink = progress.sink();
        let mut summary = DispatchSummary::default();

        let mut finished = stream::iter(jobs)
            .map(|item| {
                let fuser = Arc::clone(&fuser);
                let request = FusionRequest::for_item(&item, params.method, params.weights.clone());
                async move {
                    let handle = tokio::spawn(async move { fuser.fuse(&request).await });
                    (item, handle.await)
                }
            })
            .buffer_unordered(self.workers);

        while let Some((item, result)) = finished.next().await {
            let prefix = format!("[{}, {}]: ", params.run_label, item.name);
            let outcome = match result {
                Ok(Ok(())) => {
                    tracing::debug!(run = %params.run_label, item = %item.name, "Fused");
                    JobOutcome::Completed
                }
                Ok(Err(FusionError::UninitializedState(msg))) => {
                    tracing::warn!(run = %params.run_label, item = %item.name, error = %msg, "Skipping item");
                    sink.on_item_issue(&prefix, &format!("SKIPPING {}: {}", item.name, msg));
                    JobOutcome::Skipped(format!("fuser uninitialized state: {}", msg))
                }
                Ok(Err(FusionError::Failed(msg))) => {
                    tracing::error!(run = %params.run_label, item = %item.name, error = %msg, "Fusion failed");
                    sink.on_item_issue(&prefix, &format!("ERROR: {}", msg));
                    JobOutcome::Failed(msg)
                }
                Err(join_err) => {
                    let msg = format!("fusion task aborted: {}", join_err);
                    tracing::error!(run = %params.run_label, item = %item.name, error = %msg, "Fusion panicked");
                    sink.on_item_issue(&prefix, &format!("ERROR: {}", msg));
                    JobOutcome::Failed(msg)
                }
            };

            progress.advance();
            summary.outcomes.push((item.name, outcome));
        }

        summary
    }
}
