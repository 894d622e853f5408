//! Command-backed image probe.
//!
//! Runs an external decoder with `SEGFUSE_IMAGE` pointing at the artifact and
//! expects a JSON summary on stdout:
//! `{"shape": [240, 240, 155], "nonzero_voxels": 123}`.

use crate::error::{FuseError, Result};
use crate::shell::CommandConfig;
use crate::validation::traits::{ImageProbe, ImageSummary};
use async_trait::async_trait;
use std::path::Path;

/// Image probe that shells out to an external decoder
pub struct CommandProbe {
    config: CommandConfig,
}

impl CommandProbe {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    /// Get the command
    pub fn command(&self) -> &str {
        &self.config.command
    }
}

#[async_trait]
impl ImageProbe for CommandProbe {
    async fn load(&self, path: &Path) -> Result<ImageSummary> {
        match tokio::fs::try_exists(path).await {
            Ok(true) => {}
            Ok(false) => return Err(FuseError::Decode(format!("{} does not exist", path.display()))),
            Err(e) => return Err(FuseError::Decode(format!("cannot access {}: {}", path.display(), e))),
        }

        let output = self
            .config
            .execute(&[("SEGFUSE_IMAGE", path.display().to_string())])
            .await
            .map_err(|e| FuseError::Decode(format!("probe '{}' error: {}", self.config.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FuseError::Decode(format!(
                "probe exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let summary: ImageSummary = serde_json::from_slice(&output.stdout)
            .map_err(|e| FuseError::Decode(format!("unreadable probe output: {}", e)))?;
        Ok(summary)
    }

    fn description(&self) -> &str {
        &self.config.command
    }
}
