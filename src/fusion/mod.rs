//! Fusion collaborator interface.
//!
//! The voting/averaging algorithm lives outside this crate. The pipeline only
//! hands a `Fuser` the inputs of one work item and waits for the artifact.

pub mod command;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{FusionMethod, WorkItem, Weights};

pub use command::CommandFuser;

/// Message fragments that identify the collaborator's uninitialized-state defect
pub const DEFAULT_UNINITIALIZED_MARKERS: &[&str] =
    &["cannot access local variable 'bin_candidates' where it is not associated with a value"];

/// Errors raised by a fusion call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FusionError {
    /// Known upstream defect: an internal variable is read before assignment
    /// for some label configurations. Items hitting it are skipped.
    #[error("uninitialized local state: {0}")]
    UninitializedState(String),

    /// Any other failure of the fusion call
    #[error("{0}")]
    Failed(String),
}

impl FusionError {
    /// Classify a failure message. Only messages containing one of `markers`
    /// are treated as the uninitialized-state defect.
    pub fn classify(message: impl Into<String>, markers: &[String]) -> Self {
        let message = message.into();
        if markers.iter().any(|m| !m.is_empty() && message.contains(m.as_str())) {
            FusionError::UninitializedState(message)
        } else {
            FusionError::Failed(message)
        }
    }
}

/// Everything the collaborator needs for one fused artifact
#[derive(Debug, Clone, PartialEq)]
pub struct FusionRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub method: FusionMethod,
    pub weights: Option<Weights>,
}

impl FusionRequest {
    pub fn for_item(item: &WorkItem, method: FusionMethod, weights: Option<Weights>) -> Self {
        Self {
            inputs: item.inputs.clone(),
            output: item.output.clone(),
            method,
            weights,
        }
    }
}

/// External label-map fusion
#[async_trait]
pub trait Fuser: Send + Sync {
    /// Fuse `request.inputs` into `request.output`
    async fn fuse(&self, request: &FusionRequest) -> Result<(), FusionError>;
}

/// Default markers as owned strings, for configuration defaults
pub fn default_markers() -> Vec<String> {
    DEFAULT_UNINITIALIZED_MARKERS.iter().map(|m| m.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_uninitialized_state() {
        let msg = "UnboundLocalError: cannot access local variable 'bin_candidates' where it is not associated with a value";
        let err = FusionError::classify(msg, &default_markers());
        assert!(matches!(err, FusionError::UninitializedState(_)));
    }

    #[test]
    fn test_classify_other_failure() {
        let msg = "TypeError: in method 'ImageFileWriter_SetFileName', argument 2 of type 'std::string const &'";
        let err = FusionError::classify(msg, &default_markers());
        assert_eq!(err, FusionError::Failed(msg.to_string()));
    }

    #[test]
    fn test_classify_ignores_empty_markers() {
        let err = FusionError::classify("anything", &["".to_string()]);
        assert!(matches!(err, FusionError::Failed(_)));
    }

    #[test]
    fn test_request_for_item() {
        let item = WorkItem::new(
            "x.nii.gz",
            vec![PathBuf::from("/a/x.nii.gz"), PathBuf::from("/b/x.nii.gz")],
            PathBuf::from("/out/x.nii.gz"),
        );
        let request = FusionRequest::for_item(&item, FusionMethod::Mav, None);
        assert_eq!(request.inputs.len(), 2);
        assert_eq!(request.output, PathBuf::from("/out/x.nii.gz"));
        assert_eq!(request.method, FusionMethod::Mav);
    }
}
