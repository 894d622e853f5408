//! Source groups and fusion parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::validation::ValidationPolicy;

/// Spatial shape of an image volume
pub type Shape = Vec<usize>;

/// Optional per-source fusion weights, keyed by source label
pub type Weights = HashMap<String, f64>;

/// Consensus algorithm passed opaquely to the fuser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FusionMethod {
    /// Simple voting
    Simple,
    /// Majority voting
    Mav,
}

impl FusionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionMethod::Simple => "simple",
            FusionMethod::Mav => "mav",
        }
    }
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contributing source directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Source name, used in output folder names and as the weights key
    pub label: String,
    /// Base directory holding this source's files (before PaxHeader resolution)
    pub dir: PathBuf,
}

impl Source {
    pub fn new(label: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            dir: dir.into(),
        }
    }
}

/// Sources whose same-named files are fused into one output directory
#[derive(Debug, Clone)]
pub struct SourceGroup {
    /// Human-readable label, e.g. "2023/BraTS-GLI"
    pub label: String,
    /// Contributing sources; order only affects labeling
    pub sources: Vec<Source>,
    /// Directory receiving the fused artifacts
    pub output_dir: PathBuf,
    /// How existing outputs are validated
    pub policy: ValidationPolicy,
    /// Optional fusion weights
    pub weights: Option<Weights>,
}

impl SourceGroup {
    pub fn new(label: impl Into<String>, sources: Vec<Source>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            sources,
            output_dir: output_dir.into(),
            policy: ValidationPolicy::default(),
            weights: None,
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_weights(mut self, weights: Option<Weights>) -> Self {
        self.weights = weights;
        self
    }

    /// Source labels joined with '+', as used in single-year output folders
    pub fn joined_labels(&self) -> String {
        self.sources.iter().map(|s| s.label.as_str()).collect::<Vec<_>>().join("+")
    }
}
