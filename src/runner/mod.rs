//! Batch runner module.
//!
//! This module provides the top-level control loop:
//! - BatchRunner: resolves, plans and dispatches each (method, group) pair
//! - RunSummary / BatchReport: what happened, per configuration and overall
//! - BatchFilter: restricts a configured batch to some methods or challenges

mod batch_runner;

pub use batch_runner::{BatchFilter, BatchReport, BatchRunner, FailedConfiguration, RunSummary, configurations};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let filter = BatchFilter::default();
        assert!(filter.methods.is_empty());
        assert!(BatchReport::default().runs.is_empty());
    }
}
