//! Validation oracle for fused output artifacts.
//!
//! An artifact is valid when it decodes, its shape is on the policy's
//! allow-list (if the policy has one) and it is not entirely zero (if the
//! policy rejects that). All-zero volumes are a known corruption pattern left
//! behind by interrupted writes.

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::traits::{ImageProbe, Verdict};
use crate::domain::Shape;

/// Shapes accepted when no explicit list is configured
pub const DEFAULT_SHAPES: [[usize; 3]; 2] = [[240, 240, 155], [182, 218, 182]];

/// Per-call validation rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Allowed shapes; `None` disables the shape check
    pub shapes: Option<Vec<Shape>>,

    /// Reject volumes with no non-zero voxel
    #[serde(rename = "reject-all-zero")]
    pub reject_all_zero: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            shapes: Some(DEFAULT_SHAPES.iter().map(|s| s.to_vec()).collect()),
            reject_all_zero: true,
        }
    }
}

impl ValidationPolicy {
    /// Policy with no shape constraint
    pub fn without_shape_check(mut self) -> Self {
        self.shapes = None;
        self
    }

    /// Policy that keeps all-zero volumes
    pub fn allow_all_zero(mut self) -> Self {
        self.reject_all_zero = false;
        self
    }

    fn shape_allowed(&self, shape: &Shape) -> bool {
        match &self.shapes {
            None => true,
            Some(allowed) => allowed.iter().any(|s| s == shape),
        }
    }
}

/// Partial policy from a per-challenge table; unset fields inherit the base policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverride {
    /// Absent inherits, `null` disables the shape check
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub shapes: Option<Option<Vec<Shape>>>,

    #[serde(rename = "reject-all-zero", skip_serializing_if = "Option::is_none")]
    pub reject_all_zero: Option<bool>,
}

impl PolicyOverride {
    /// Merge onto `base`
    pub fn apply(&self, base: &ValidationPolicy) -> ValidationPolicy {
        ValidationPolicy {
            shapes: self.shapes.clone().unwrap_or_else(|| base.shapes.clone()),
            reject_all_zero: self.reject_all_zero.unwrap_or(base.reject_all_zero),
        }
    }
}

// A present key, even `null`, is `Some`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Decides whether an existing artifact is a complete, valid result
#[derive(Clone)]
pub struct ValidationOracle {
    probe: Arc<dyn ImageProbe>,
}

impl ValidationOracle {
    pub fn new(probe: Arc<dyn ImageProbe>) -> Self {
        Self { probe }
    }

    /// Validate an artifact and explain the decision.
    ///
    /// Never fails: decode errors become an invalid verdict.
    pub async fn inspect(&self, artifact: &Path, policy: &ValidationPolicy) -> Verdict {
        let summary = match self.probe.load(artifact).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("{}: could not be decoded by {}: {}", artifact.display(), self.probe.description(), e);
                return Verdict::invalid(format!("broken, could not be decoded: {}", e));
            }
        };

        if !policy.shape_allowed(&summary.shape) {
            debug!("{}: unexpected shape {:?}", artifact.display(), summary.shape);
            return Verdict::invalid(format!(
                "shape {:?} instead of one of {:?}",
                summary.shape,
                policy.shapes.as_deref().unwrap_or_default()
            ));
        }

        if policy.reject_all_zero && summary.is_all_zero() {
            debug!("{}: only zeros", artifact.display());
            return Verdict::invalid("only zeros");
        }

        Verdict::valid(format!("shape {:?}, {} non-zero voxels", summary.shape, summary.nonzero_voxels))
    }

    pub async fn is_valid(&self, artifact: &Path, policy: &ValidationPolicy) -> bool {
        self.inspect(artifact, policy).await.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FuseError, Result};
    use crate::validation::ImageSummary;
    use async_trait::async_trait;
    use std::path::PathBuf;

    struct FixedProbe {
        summary: Option<ImageSummary>,
    }

    #[async_trait]
    impl ImageProbe for FixedProbe {
        async fn load(&self, _path: &Path) -> Result<ImageSummary> {
            self.summary
                .clone()
                .ok_or_else(|| FuseError::Decode("Unable to determine ImageIO reader".to_string()))
        }
    }

    fn oracle(summary: Option<ImageSummary>) -> ValidationOracle {
        ValidationOracle::new(Arc::new(FixedProbe { summary }))
    }

    fn artifact() -> PathBuf {
        PathBuf::from("/tmp/fused/x.nii.gz")
    }

    #[test]
    fn test_default_policy() {
        let policy = ValidationPolicy::default();
        assert!(policy.reject_all_zero);
        assert_eq!(policy.shapes.as_ref().unwrap().len(), 2);
        assert!(policy.shape_allowed(&vec![240, 240, 155]));
        assert!(policy.shape_allowed(&vec![182, 218, 182]));
        assert!(!policy.shape_allowed(&vec![128, 128, 64]));
    }

    #[test]
    fn test_policy_deserialize_without_shapes() {
        let policy: ValidationPolicy = serde_yaml::from_str("shapes: null\nreject-all-zero: false\n").unwrap();
        assert!(policy.shapes.is_none());
        assert!(!policy.reject_all_zero);
    }

    #[test]
    fn test_override_inherits_unset_fields() {
        let base = ValidationPolicy {
            shapes: Some(vec![vec![128, 128, 64]]),
            reject_all_zero: true,
        };
        let partial: PolicyOverride = serde_yaml::from_str("reject-all-zero: false\n").unwrap();
        assert_eq!(partial.shapes, None);

        let merged = partial.apply(&base);
        assert_eq!(merged.shapes, Some(vec![vec![128, 128, 64]]));
        assert!(!merged.reject_all_zero);
    }

    #[test]
    fn test_override_null_shapes_disables_check() {
        let partial: PolicyOverride = serde_yaml::from_str("shapes: null\n").unwrap();
        assert_eq!(partial.shapes, Some(None));

        let merged = partial.apply(&ValidationPolicy::default());
        assert!(merged.shapes.is_none());
        assert!(merged.reject_all_zero);
    }

    #[test]
    fn test_empty_override_is_base() {
        let partial: PolicyOverride = serde_yaml::from_str("{}").unwrap();
        assert_eq!(partial.apply(&ValidationPolicy::default()), ValidationPolicy::default());
    }

    #[tokio::test]
    async fn test_valid_artifact() {
        let verdict = oracle(Some(ImageSummary::new(vec![240, 240, 155], 1000)))
            .inspect(&artifact(), &ValidationPolicy::default())
            .await;
        assert!(verdict.valid);
    }

    #[tokio::test]
    async fn test_decode_failure_is_invalid() {
        let verdict = oracle(None).inspect(&artifact(), &ValidationPolicy::default()).await;
        assert!(!verdict.valid);
        assert!(verdict.reason.contains("could not be decoded"));
        assert!(verdict.reason.contains("ImageIO"));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_invalid() {
        let verdict = oracle(Some(ImageSummary::new(vec![128, 128, 64], 50)))
            .inspect(&artifact(), &ValidationPolicy::default())
            .await;
        assert!(!verdict.valid);
        assert!(verdict.reason.contains("shape"));
    }

    #[tokio::test]
    async fn test_wrong_shape_accepted_without_shape_check() {
        let policy = ValidationPolicy::default().without_shape_check();
        let verdict = oracle(Some(ImageSummary::new(vec![128, 128, 64], 50)))
            .inspect(&artifact(), &policy)
            .await;
        assert!(verdict.valid);
    }

    #[tokio::test]
    async fn test_all_zero_rejected_by_default() {
        let probe = oracle(Some(ImageSummary::new(vec![240, 240, 155], 0)));
        assert!(!probe.is_valid(&artifact(), &ValidationPolicy::default()).await);
    }

    #[tokio::test]
    async fn test_all_zero_accepted_when_allowed() {
        let probe = oracle(Some(ImageSummary::new(vec![240, 240, 155], 0)));
        let policy = ValidationPolicy::default().allow_all_zero();
        assert!(probe.is_valid(&artifact(), &policy).await);
    }
}
