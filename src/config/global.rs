//! Global configuration.
//!
//! Loaded from segfuse.yml or ~/.config/segfuse/segfuse.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::CONFIG_FILE;
use super::tables::{ChallengeEntry, MultiYearEntry};
use crate::dispatch::DEFAULT_WORKERS;
use crate::domain::{FusionMethod, Weights};
use crate::fusion::default_markers;
use crate::shell::CommandConfig;
use crate::validation::ValidationPolicy;

/// Global configuration for segfuse.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Root of the data tree.
    #[serde(rename = "data-root")]
    pub data_root: PathBuf,

    /// Folder under the root holding per-source predictions.
    #[serde(rename = "input-folder")]
    pub input_folder: String,

    /// Folder under the root receiving fused outputs.
    #[serde(rename = "output-folder")]
    pub output_folder: String,

    /// Concurrent fusion jobs.
    pub workers: usize,

    /// Fusion methods applied to every group, in order.
    pub methods: Vec<FusionMethod>,

    /// Default validation policy for existing outputs.
    pub validation: ValidationPolicy,

    /// External fusion command.
    pub fusion: FusionConfig,

    /// External image probe command.
    pub probe: CommandConfig,

    /// year -> challenge -> sources.
    #[serde(rename = "single-year")]
    pub single_year: BTreeMap<String, BTreeMap<String, ChallengeEntry>>,

    /// challenge -> years -> sources, fused across years.
    #[serde(rename = "multi-year")]
    pub multi_year: BTreeMap<String, MultiYearEntry>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            input_folder: "predictions".to_string(),
            output_folder: "fused".to_string(),
            workers: DEFAULT_WORKERS,
            methods: vec![FusionMethod::Simple, FusionMethod::Mav],
            validation: ValidationPolicy::default(),
            fusion: FusionConfig::default(),
            probe: CommandConfig::default().timeout_ms(60_000),
            single_year: BTreeMap::new(),
            multi_year: BTreeMap::new(),
        }
    }
}

impl GlobalConfig {
    /// Load configuration with fallback chain.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(CONFIG_FILE);
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from {}", CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", CONFIG_FILE, e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("segfuse").join(CONFIG_FILE);
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            eyre::bail!("workers must be > 0");
        }
        if self.methods.is_empty() {
            eyre::bail!("methods must not be empty");
        }
        if self.fusion.uninitialized_markers.iter().any(|m| m.trim().is_empty()) {
            eyre::bail!("fusion.uninitialized-markers must not contain empty entries");
        }
        validate_policy("validation", &self.validation)?;

        for (year, challenges) in &self.single_year {
            for (challenge, entry) in challenges {
                let at = format!("single-year.{}.{}", year, challenge);
                validate_policy(&at, &self.effective_policy(entry.validation.as_ref()))?;
                validate_weights(&at, entry.weights.as_ref())?;
            }
        }
        for (challenge, entry) in &self.multi_year {
            let at = format!("multi-year.{}", challenge);
            if self.methods.len() > 1 && !entry.method_subdir {
                eyre::bail!(
                    "{}: method-subdir must be true when {} methods are configured, they would share one output folder",
                    at,
                    self.methods.len()
                );
            }
            validate_policy(&at, &self.effective_policy(entry.validation.as_ref()))?;
            validate_weights(&at, entry.weights.as_ref())?;
        }
        Ok(())
    }

    /// Ensure the fusion command is set.
    pub fn require_fusion_command(&self) -> Result<()> {
        if self.fusion.command.trim().is_empty() {
            eyre::bail!("fusion.command is not configured");
        }
        Ok(())
    }

    /// Ensure the probe command is set.
    pub fn require_probe_command(&self) -> Result<()> {
        if self.probe.command.trim().is_empty() {
            eyre::bail!("probe.command is not configured");
        }
        Ok(())
    }

    /// Directory holding the predictions of one (year, challenge)
    pub fn challenge_dir(&self, year: &str, challenge: &str) -> PathBuf {
        self.data_root.join(&self.input_folder).join(year).join(challenge)
    }

    /// Root directory of all fused outputs
    pub fn output_root(&self) -> PathBuf {
        self.data_root.join(&self.output_folder)
    }
}

fn validate_policy(at: &str, policy: &ValidationPolicy) -> Result<()> {
    if let Some(shapes) = &policy.shapes {
        if shapes.is_empty() {
            eyre::bail!("{}: shapes must not be an empty list (use null to disable the check)", at);
        }
        if shapes.iter().any(|s| s.is_empty() || s.contains(&0)) {
            eyre::bail!("{}: shapes must have non-zero dimensions", at);
        }
    }
    Ok(())
}

fn validate_weights(at: &str, weights: Option<&Weights>) -> Result<()> {
    if let Some(weights) = weights {
        if weights.values().any(|w| !w.is_finite() || *w < 0.0) {
            eyre::bail!("{}: weights must be finite and non-negative", at);
        }
    }
    Ok(())
}

/// External fusion settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Command run once per work item.
    pub command: String,

    /// Extra environment for the command.
    pub env: BTreeMap<String, String>,

    /// Timeout per fusion call in milliseconds.
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Error message fragments identifying the uninitialized-state defect.
    #[serde(rename = "uninitialized-markers")]
    pub uninitialized_markers: Vec<String>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            env: BTreeMap::new(),
            timeout_ms: 600_000, // 10 minutes
            uninitialized_markers: default_markers(),
        }
    }
}

impl FusionConfig {
    /// Shell command settings for the fuser
    pub fn command_config(&self) -> CommandConfig {
        CommandConfig {
            command: self.command.clone(),
            env: self.env.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GlobalConfig::default();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.methods, vec![FusionMethod::Simple, FusionMethod::Mav]);
        assert_eq!(config.fusion.timeout_ms, 600_000);
        assert_eq!(config.output_root(), PathBuf::from("data/fused"));
    }

    #[test]
    fn test_config_validation() {
        let config = GlobalConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_workers() {
        let config = GlobalConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_empty_methods() {
        let config = GlobalConfig {
            methods: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_zero_dimension() {
        let config = GlobalConfig {
            validation: ValidationPolicy {
                shapes: Some(vec![vec![240, 0, 155]]),
                reject_all_zero: true,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multi_year_needs_method_subdir_for_several_methods() {
        let yaml = r#"
methods: [simple, mav]
multi-year:
  BraTS-GLI:
    years:
      "2023": [a]
      "2024": [b]
"#;
        let mut config: GlobalConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("method-subdir"));

        config.multi_year.get_mut("BraTS-GLI").unwrap().method_subdir = true;
        assert!(config.validate().is_ok());

        config.multi_year.get_mut("BraTS-GLI").unwrap().method_subdir = false;
        config.methods = vec![FusionMethod::Mav];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_require_commands() {
        let config = GlobalConfig::default();
        assert!(config.require_fusion_command().is_err());
        assert!(config.require_probe_command().is_err());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
data-root: /srv/brats
workers: 12
methods: [mav]
fusion:
  command: python -m fuse_bridge
  timeout-ms: 1000
probe:
  command: python -m probe_bridge
single-year:
  "2024":
    BraTS-MEN-RT:
      sources: [nic-vicorob, astraraki, Faking_it]
      validation:
        shapes: null
"#;
        let config: GlobalConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.data_root, PathBuf::from("/srv/brats"));
        assert_eq!(config.workers, 12);
        assert_eq!(config.methods, vec![FusionMethod::Mav]);
        assert_eq!(config.fusion.command, "python -m fuse_bridge");
        assert_eq!(config.fusion.command_config().timeout_ms, 1000);
        assert_eq!(config.fusion.uninitialized_markers, default_markers());
        assert_eq!(config.probe.command, "python -m probe_bridge");

        let entry = &config.single_year["2024"]["BraTS-MEN-RT"];
        assert_eq!(entry.sources.len(), 3);
        let partial = entry.validation.as_ref().unwrap();
        assert_eq!(partial.shapes, Some(None));
        assert!(partial.reject_all_zero.is_none());

        // Other fields should have defaults
        assert_eq!(config.input_folder, "predictions");
        assert!(config.validate().is_ok());
    }
}
