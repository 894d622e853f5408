//! Configuration system for segfuse.
//!
//! One YAML file holds the global settings (paths, workers, collaborators,
//! default validation policy) and the tables describing which sources are
//! fused for each year and challenge.

use eyre::Result;
use std::path::PathBuf;

pub use self::global::{FusionConfig, GlobalConfig};
pub use self::tables::{ChallengeEntry, ConfiguredGroup, MultiYearEntry};

mod global;
mod tables;

/// Project-local config file name.
pub const CONFIG_FILE: &str = "segfuse.yml";

/// Load configuration from the standard search paths.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. segfuse.yml in current directory (project config)
/// 3. ~/.config/segfuse/segfuse.yml (user config)
/// 4. Default values
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<GlobalConfig> {
    GlobalConfig::load(explicit_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/segfuse.yml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "workers: 3\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.workers, 3);
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: GlobalConfig = serde_yaml::from_str(include_str!("../../segfuse.example.yml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.single_year["2023"].len(), 5);
        assert_eq!(config.multi_year.len(), 3);
        assert_eq!(config.single_year["2024"]["BraTS-MEN-RT"].validation.as_ref().unwrap().shapes, Some(None));
    }
}
