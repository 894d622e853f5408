//! Shell command execution shared by the command-backed collaborators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// Configuration for an external command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// The command to execute via `sh -c`
    pub command: String,
    /// Extra environment variables to set
    pub env: BTreeMap<String, String>,
    /// Timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            env: BTreeMap::new(),
            timeout_ms: 30000,
        }
    }
}

impl CommandConfig {
    /// Create a new command config with the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Add an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the timeout in milliseconds
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Run the command with additional per-call environment variables
    pub async fn execute(&self, call_env: &[(&str, String)]) -> std::io::Result<Output> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.command);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        for (key, value) in call_env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn()?;

        let timeout = tokio::time::Duration::from_millis(self.timeout_ms);
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("Command timed out after {}ms", self.timeout_ms),
            )),
        }
    }
}
