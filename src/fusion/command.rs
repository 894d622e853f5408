//! Command-backed fuser.
//!
//! Runs a configured shell command once per work item. The request is passed
//! through the environment:
//! - `SEGFUSE_INPUTS`: JSON array of input paths
//! - `SEGFUSE_OUTPUT`: output path
//! - `SEGFUSE_METHOD`: `simple` or `mav`
//! - `SEGFUSE_WEIGHTS`: JSON object of source weights, empty when unweighted

use async_trait::async_trait;
use log::debug;

use super::{FusionError, FusionRequest, Fuser};
use crate::shell::CommandConfig;

/// Fuser that shells out to an external fusion tool
pub struct CommandFuser {
    config: CommandConfig,
    markers: Vec<String>,
}

impl CommandFuser {
    pub fn new(config: CommandConfig, markers: Vec<String>) -> Self {
        Self { config, markers }
    }

    /// Get the command
    pub fn command(&self) -> &str {
        &self.config.command
    }

    fn request_env(request: &FusionRequest) -> Result<Vec<(&'static str, String)>, FusionError> {
        let inputs: Vec<String> = request.inputs.iter().map(|p| p.display().to_string()).collect();
        let inputs = serde_json::to_string(&inputs).map_err(|e| FusionError::Failed(e.to_string()))?;
        let weights = match &request.weights {
            Some(w) => serde_json::to_string(w).map_err(|e| FusionError::Failed(e.to_string()))?,
            None => String::new(),
        };

        Ok(vec![
            ("SEGFUSE_INPUTS", inputs),
            ("SEGFUSE_OUTPUT", request.output.display().to_string()),
            ("SEGFUSE_METHOD", request.method.to_string()),
            ("SEGFUSE_WEIGHTS", weights),
        ])
    }
}

#[async_trait]
impl Fuser for CommandFuser {
    async fn fuse(&self, request: &FusionRequest) -> Result<(), FusionError> {
        let env = Self::request_env(request)?;
        debug!("Fusing {} inputs into {}", request.inputs.len(), request.output.display());

        let output = self
            .config
            .execute(&env)
            .await
            .map_err(|e| FusionError::Failed(format!("command '{}' error: {}", self.config.command, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!("command exited with {:?}", output.status.code())
        } else {
            stderr.trim().to_string()
        };
        Err(FusionError::classify(message, &self.markers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FusionMethod;
    use crate::fusion::default_markers;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn request(output: PathBuf) -> FusionRequest {
        FusionRequest {
            inputs: vec![PathBuf::from("/a/x.nii.gz"), PathBuf::from("/b/x.nii.gz")],
            output,
            method: FusionMethod::Simple,
            weights: None,
        }
    }

    #[tokio::test]
    async fn test_fuse_success_writes_output() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("x.nii.gz");
        let fuser = CommandFuser::new(
            CommandConfig::new(r#"echo "$SEGFUSE_METHOD $SEGFUSE_INPUTS" > "$SEGFUSE_OUTPUT""#),
            default_markers(),
        );

        fuser.fuse(&request(out.clone())).await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("simple"));
        assert!(written.contains("/a/x.nii.gz"));
    }

    #[tokio::test]
    async fn test_fuse_passes_weights() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("x.nii.gz");
        let fuser = CommandFuser::new(
            CommandConfig::new(r#"echo "$SEGFUSE_WEIGHTS" > "$SEGFUSE_OUTPUT""#),
            default_markers(),
        );
        let mut req = request(out.clone());
        req.weights = Some(HashMap::from([("NVAUTO".to_string(), 2.0)]));

        fuser.fuse(&req).await.unwrap();
        assert!(std::fs::read_to_string(&out).unwrap().contains("NVAUTO"));
    }

    #[tokio::test]
    async fn test_fuse_uninitialized_state() {
        let fuser = CommandFuser::new(
            CommandConfig::new(
                "echo \"UnboundLocalError: cannot access local variable 'bin_candidates' where it is not associated with a value\" >&2; exit 1",
            ),
            default_markers(),
        );
        let err = fuser.fuse(&request(PathBuf::from("/tmp/unused.nii.gz"))).await.unwrap_err();
        assert!(matches!(err, FusionError::UninitializedState(_)));
    }

    #[tokio::test]
    async fn test_fuse_generic_failure() {
        let fuser = CommandFuser::new(CommandConfig::new("exit 2"), default_markers());
        let err = fuser.fuse(&request(PathBuf::from("/tmp/unused.nii.gz"))).await.unwrap_err();
        assert_eq!(err, FusionError::Failed("command exited with Some(2)".to_string()));
    }

    #[tokio::test]
    async fn test_fuse_timeout() {
        let fuser = CommandFuser::new(CommandConfig::new("sleep 10").timeout_ms(100), default_markers());
        let err = fuser.fuse(&request(PathBuf::from("/tmp/unused.nii.gz"))).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
