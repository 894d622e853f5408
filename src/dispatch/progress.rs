//! Progress reporting for the dispatch pool.

use chrono::{DateTime, Local};
use colored::*;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::runner::RunSummary;

/// Number of finished jobs out of the batch total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub done: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            100.0 * self.done as f64 / self.total as f64
        }
    }

    pub fn is_last(&self) -> bool {
        self.done >= self.total
    }
}

/// Receives progress and per-item problems while a batch runs
pub trait ProgressSink: Send + Sync {
    /// Called after every finished job, with a strictly increasing `done`
    fn on_progress(&self, event: ProgressEvent);

    /// Called when an item is skipped with a warning or fails
    fn on_item_issue(&self, _prefix: &str, _message: &str) {}

    /// Called before a (method, group) run resolves its work set
    fn on_run_started(&self, _label: &str, _at: &DateTime<Local>) {}

    /// Called once a (method, group) run has finished
    fn on_run_finished(&self, _summary: &RunSummary) {}
}

/// Counts finished items of one run against its whole work set.
///
/// Planning advances it for items that need no fusion, the pool for every
/// dispatched job, so a run reports one line from 1 to N.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    total: usize,
    done: AtomicUsize,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            total,
            done: AtomicUsize::new(0),
        }
    }

    pub fn sink(&self) -> &'a dyn ProgressSink {
        self.sink
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Record one finished item and report it
    pub fn advance(&self) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        self.sink.on_progress(ProgressEvent { done, total: self.total });
    }
}

/// Overwrites a single percentage line on stdout
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, event: ProgressEvent) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "\t{:.4} %\t{}/{}\r", event.percent(), event.done, event.total);
        if event.is_last() {
            let _ = writeln!(stdout);
        }
        let _ = stdout.flush();
    }

    fn on_item_issue(&self, prefix: &str, message: &str) {
        eprintln!("{}{}", prefix.yellow(), message);
    }

    fn on_run_started(&self, label: &str, at: &DateTime<Local>) {
        println!("{} {} at {}", "Applying fusion:".cyan(), label, at.format("%H:%M:%S"));
    }

    fn on_run_finished(&self, summary: &RunSummary) {
        let verb = if summary.dry_run { "would fuse" } else { "fused" };
        println!(
            "\t{} items: {} skipped, {} {}, {} {} ({} - {})\n",
            summary.total,
            summary.skipped,
            if summary.dry_run { summary.enqueued } else { summary.completed },
            verb,
            summary.failed,
            if summary.failed > 0 { "failed".red() } else { "failed".normal() },
            summary.started_at.format("%H:%M:%S"),
            summary.finished_at.format("%H:%M:%S"),
        );
    }
}

/// Discards everything
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}
