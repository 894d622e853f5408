//! Image probe interface and validation verdicts

use crate::domain::Shape;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the image collaborator reports about a decoded volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    /// Spatial dimensions of the volume
    pub shape: Shape,
    /// Number of voxels with a non-zero label
    pub nonzero_voxels: u64,
}

impl ImageSummary {
    pub fn new(shape: Shape, nonzero_voxels: u64) -> Self {
        Self { shape, nonzero_voxels }
    }

    /// Whether every voxel is zero
    pub fn is_all_zero(&self) -> bool {
        self.nonzero_voxels == 0
    }
}

/// Decodes an image file far enough to report its shape and content
#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// Load the image at `path`; any decode problem is an error
    async fn load(&self, path: &Path) -> Result<ImageSummary>;

    /// Get a description of this probe
    fn description(&self) -> &str {
        "image probe"
    }
}

/// Result of validating one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the artifact can be kept as-is
    pub valid: bool,
    /// Why the artifact was accepted or rejected
    pub reason: String,
}

impl Verdict {
    /// Create an accepting verdict
    pub fn valid(reason: impl Into<String>) -> Self {
        Self {
            valid: true,
            reason: reason.into(),
        }
    }

    /// Create a rejecting verdict
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
        }
    }
}
