//! Batch runner implementation.
//!
//! For each configured (method, group) pair, sequentially:
//! 1. Resolve the work set (intersection of source listings)
//! 2. Plan every item (skip valid outputs, fail fast on missing inputs)
//! 3. Dispatch the enqueued items to the pool
//!
//! A configuration that cannot run is recorded and the batch moves on.

use chrono::{DateTime, Local};
use log::{error, info};
use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::dispatch::{DispatchParams, DispatchPool, NullProgress, ProgressSink, ProgressTracker};
use crate::domain::{FusionMethod, SourceGroup};
use crate::error::Result;
use crate::fusion::Fuser;
use crate::planner::{JobPlanner, PlanDecision};
use crate::resolve::WorkSetResolver;

/// Restricts which configured runs are executed; empty means "all"
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub methods: Vec<FusionMethod>,
    pub challenges: Vec<String>,
}

impl BatchFilter {
    fn allows_method(&self, method: FusionMethod) -> bool {
        self.methods.is_empty() || self.methods.contains(&method)
    }

    fn allows_challenge(&self, challenge: &str) -> bool {
        self.challenges.is_empty() || self.challenges.iter().any(|c| c == challenge)
    }
}

/// Expand the configuration into (method, group) pairs, method-major
pub fn configurations(config: &GlobalConfig, filter: &BatchFilter) -> Vec<(FusionMethod, SourceGroup)> {
    let mut runs = Vec::new();
    for method in &config.methods {
        if !filter.allows_method(*method) {
            continue;
        }
        for configured in config.source_groups(*method) {
            if filter.allows_challenge(&configured.challenge) {
                runs.push((*method, configured.group));
            }
        }
    }
    runs
}

/// Result of one (method, group) run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// e.g. "mav 2023/BraTS-GLI"
    pub label: String,
    /// Names in the resolved work set
    pub total: usize,
    pub skipped: usize,
    pub completed: usize,
    pub failed: usize,
    /// Items handed to the fuser (or that would be, in a dry run)
    pub enqueued: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// A configuration that could not run at all
#[derive(Debug, Clone)]
pub struct FailedConfiguration {
    pub label: String,
    pub error: String,
}

/// Result of a whole batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub runs: Vec<RunSummary>,
    pub failed_configurations: Vec<FailedConfiguration>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.runs.iter().map(|r| r.completed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.runs.iter().map(|r| r.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.runs.iter().map(|r| r.failed).sum()
    }

    pub fn enqueued(&self) -> usize {
        self.runs.iter().map(|r| r.enqueued).sum()
    }
}

/// Drives resolver, planner and pool over a batch of configurations
pub struct BatchRunner {
    planner: JobPlanner,
    pool: DispatchPool,
    fuser: Arc<dyn Fuser>,
    progress: Arc<dyn ProgressSink>,
    dry_run: bool,
}

impl BatchRunner {
    pub fn new(planner: JobPlanner, pool: DispatchPool, fuser: Arc<dyn Fuser>) -> Self {
        Self {
            planner,
            pool,
            fuser,
            progress: Arc::new(NullProgress),
            dry_run: false,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Plan only: never call the fuser or create output directories
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one (method, group) configuration.
    ///
    /// Only configuration-level problems are returned as errors; per-item
    /// failures are counted in the summary.
    pub async fn run_group(&self, method: FusionMethod, group: &SourceGroup) -> Result<RunSummary> {
        let label = format!("{} {}", method, group.label);
        let started_at = Local::now();
        info!("Applying fusion to {} ({}) -> {}", label, group.joined_labels(), group.output_dir.display());
        self.progress.on_run_started(&label, &started_at);

        let items = WorkSetResolver::work_items(group).await?;
        let total = items.len();

        let progress = ProgressTracker::new(self.progress.as_ref(), total);
        let planned = self
            .planner
            .plan_all(items, &group.policy, self.pool.workers(), &progress)
            .await;

        let mut skipped = 0;
        let mut failed = 0;
        let mut jobs = Vec::new();
        for (item, decision) in planned {
            match decision {
                PlanDecision::Skip(_) => skipped += 1,
                PlanDecision::FailFast(reason) => {
                    failed += 1;
                    self.progress.on_item_issue(&format!("[{}, {}]: ", label, item.name), &reason);
                }
                PlanDecision::Enqueue => jobs.push(item),
            }
        }
        let enqueued = jobs.len();
        info!("{}: {} items, {} valid, {} to fuse, {} missing inputs", label, total, skipped, enqueued, failed);

        let mut completed = 0;
        if self.dry_run {
            // Planning is all a dry run does
            for _ in 0..enqueued {
                progress.advance();
            }
        } else if !jobs.is_empty() {
            tokio::fs::create_dir_all(&group.output_dir).await?;

            let params = DispatchParams {
                run_label: label.clone(),
                method,
                weights: group.weights.clone(),
            };
            let dispatched = self.pool.run(jobs, Arc::clone(&self.fuser), &params, &progress).await;
            completed = dispatched.completed();
            skipped += dispatched.skipped();
            failed += dispatched.failed();
        }

        let summary = RunSummary {
            label,
            total,
            skipped,
            completed,
            failed,
            enqueued,
            dry_run: self.dry_run,
            started_at,
            finished_at: Local::now(),
        };
        self.progress.on_run_finished(&summary);
        Ok(summary)
    }

    /// Run every configuration; one failing configuration does not stop the rest
    pub async fn run_batch(&self, configurations: Vec<(FusionMethod, SourceGroup)>) -> BatchReport {
        let mut report = BatchReport::default();

        for (method, group) in configurations {
            match self.run_group(method, &group).await {
                Ok(summary) => report.runs.push(summary),
                Err(e) => {
                    let label = format!("{} {}", method, group.label);
                    error!("{}: {}", label, e);
                    self.progress.on_item_issue(&format!("[{}]: ", label), &e.to_string());
                    report.failed_configurations.push(FailedConfiguration {
                        label,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
