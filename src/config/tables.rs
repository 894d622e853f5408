//! Year / challenge / source tables.
//!
//! Two layouts are supported:
//! - single-year: `<output>/<year>/<challenge>/<method>/<s1>+<s2>+.../<name>`
//! - multi-year: `<output>/[<method>/]<year1>_<s..>__<year2>_<s..>/<name>`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::GlobalConfig;
use crate::domain::{FusionMethod, Source, SourceGroup, Weights};
use crate::validation::{PolicyOverride, ValidationPolicy};

/// Sources fused for one (year, challenge)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChallengeEntry {
    /// Source folder names, in labeling order.
    pub sources: Vec<String>,

    /// Override of the global validation policy; unset keys inherit it.
    pub validation: Option<PolicyOverride>,

    /// Per-source fusion weights, keyed by source name.
    pub weights: Option<Weights>,
}

/// Sources fused for one challenge across several years
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MultiYearEntry {
    /// year -> source folder names.
    pub years: BTreeMap<String, Vec<String>>,

    /// Override of the global validation policy; unset keys inherit it.
    pub validation: Option<PolicyOverride>,

    /// Per-source fusion weights, keyed by `<year>_<source>`.
    pub weights: Option<Weights>,

    /// Put outputs under a `<method>/` folder so methods do not share outputs.
    #[serde(rename = "method-subdir")]
    pub method_subdir: bool,
}

/// A source group built from the tables, tagged with its challenge
#[derive(Debug, Clone)]
pub struct ConfiguredGroup {
    pub challenge: String,
    pub group: SourceGroup,
}

impl GlobalConfig {
    /// All groups to fuse with `method`: single-year tables first, then multi-year
    pub fn source_groups(&self, method: FusionMethod) -> Vec<ConfiguredGroup> {
        let mut groups = Vec::new();

        for (year, challenges) in &self.single_year {
            for (challenge, entry) in challenges {
                groups.push(self.single_year_group(method, year, challenge, entry));
            }
        }
        for (challenge, entry) in &self.multi_year {
            groups.push(self.multi_year_group(method, challenge, entry));
        }

        groups
    }

    /// The global policy with an optional per-entry override merged on top
    pub fn effective_policy(&self, entry: Option<&PolicyOverride>) -> ValidationPolicy {
        match entry {
            Some(partial) => partial.apply(&self.validation),
            None => self.validation.clone(),
        }
    }

    fn single_year_group(
        &self,
        method: FusionMethod,
        year: &str,
        challenge: &str,
        entry: &ChallengeEntry,
    ) -> ConfiguredGroup {
        let challenge_dir = self.challenge_dir(year, challenge);
        let sources: Vec<Source> = entry
            .sources
            .iter()
            .map(|name| Source::new(name.clone(), challenge_dir.join(name)))
            .collect();

        let output_dir = self
            .output_root()
            .join(year)
            .join(challenge)
            .join(method.as_str())
            .join(entry.sources.join("+"));

        let group = SourceGroup::new(format!("{}/{}", year, challenge), sources, output_dir)
            .with_policy(self.effective_policy(entry.validation.as_ref()))
            .with_weights(entry.weights.clone());

        ConfiguredGroup {
            challenge: challenge.to_string(),
            group,
        }
    }

    fn multi_year_group(&self, method: FusionMethod, challenge: &str, entry: &MultiYearEntry) -> ConfiguredGroup {
        let mut sources = Vec::new();
        let mut folder_parts = Vec::new();

        for (year, names) in &entry.years {
            let challenge_dir = self.challenge_dir(year, challenge);
            let mut part = year.clone();
            for name in names {
                part.push('_');
                part.push_str(name);
                sources.push(Source::new(format!("{}_{}", year, name), challenge_dir.join(name)));
            }
            folder_parts.push(part);
        }

        let mut output_dir = self.output_root();
        if entry.method_subdir {
            output_dir = output_dir.join(method.as_str());
        }
        let output_dir = output_dir.join(folder_parts.join("__"));

        let years: Vec<&str> = entry.years.keys().map(String::as_str).collect();
        let group = SourceGroup::new(format!("{}/{}", years.join("+"), challenge), sources, output_dir)
            .with_policy(self.effective_policy(entry.validation.as_ref()))
            .with_weights(entry.weights.clone());

        ConfiguredGroup {
            challenge: challenge.to_string(),
            group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> GlobalConfig {
        let yaml = r#"
data-root: /data
single-year:
  "2023":
    BraTS-GLI:
      sources: [Faking_it, NVAUTO, BiomedMBZ]
  "2024":
    BraTS-MEN-RT:
      sources: [nic-vicorob, astraraki]
      validation:
        shapes: null
multi-year:
  BraTS-PED:
    years:
      "2024": [astaraki, AIPNI]
      "2023": [CNMC_PMI2023, NVAUTO]
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_single_year_layout() {
        let groups = config().source_groups(FusionMethod::Mav);
        let gli = groups.iter().find(|g| g.challenge == "BraTS-GLI").unwrap();

        assert_eq!(gli.group.label, "2023/BraTS-GLI");
        assert_eq!(
            gli.group.output_dir,
            PathBuf::from("/data/fused/2023/BraTS-GLI/mav/Faking_it+NVAUTO+BiomedMBZ")
        );
        assert_eq!(gli.group.sources[1].label, "NVAUTO");
        assert_eq!(gli.group.sources[1].dir, PathBuf::from("/data/predictions/2023/BraTS-GLI/NVAUTO"));
        assert!(gli.group.policy.shapes.is_some());
    }

    #[test]
    fn test_policy_override() {
        let groups = config().source_groups(FusionMethod::Simple);
        let men = groups.iter().find(|g| g.challenge == "BraTS-MEN-RT").unwrap();
        assert!(men.group.policy.shapes.is_none());
        assert!(men.group.policy.reject_all_zero);
    }

    #[test]
    fn test_partial_override_keeps_global_shapes() {
        let yaml = r#"
validation:
  shapes: [[128, 128, 64]]
single-year:
  "2023":
    BraTS-GLI:
      sources: [a, b]
      validation:
        reject-all-zero: false
    BraTS-SSA:
      sources: [c, d]
multi-year:
  BraTS-PED:
    years:
      "2023": [e]
    validation:
      reject-all-zero: false
"#;
        let config: GlobalConfig = serde_yaml::from_str(yaml).unwrap();
        let groups = config.source_groups(FusionMethod::Simple);

        for challenge in ["BraTS-GLI", "BraTS-PED"] {
            let group = &groups.iter().find(|g| g.challenge == challenge).unwrap().group;
            assert_eq!(group.policy.shapes, Some(vec![vec![128, 128, 64]]));
            assert!(!group.policy.reject_all_zero);
        }
        let ssa = &groups.iter().find(|g| g.challenge == "BraTS-SSA").unwrap().group;
        assert_eq!(ssa.policy, config.validation);
    }

    #[test]
    fn test_multi_year_layout() {
        let groups = config().source_groups(FusionMethod::Simple);
        let ped = groups.iter().find(|g| g.challenge == "BraTS-PED").unwrap();

        assert_eq!(ped.group.label, "2023+2024/BraTS-PED");
        assert_eq!(
            ped.group.output_dir,
            PathBuf::from("/data/fused/2023_CNMC_PMI2023_NVAUTO__2024_astaraki_AIPNI")
        );
        let labels: Vec<&str> = ped.group.sources.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2023_CNMC_PMI2023", "2023_NVAUTO", "2024_astaraki", "2024_AIPNI"]);
        assert_eq!(ped.group.sources[2].dir, PathBuf::from("/data/predictions/2024/BraTS-PED/astaraki"));
    }

    #[test]
    fn test_multi_year_method_subdir() {
        let mut config = config();
        config.multi_year.get_mut("BraTS-PED").unwrap().method_subdir = true;
        let groups = config.source_groups(FusionMethod::Mav);
        let ped = groups.iter().find(|g| g.challenge == "BraTS-PED").unwrap();
        assert!(ped.group.output_dir.starts_with("/data/fused/mav"));
    }

    #[test]
    fn test_group_order() {
        let groups = config().source_groups(FusionMethod::Simple);
        let challenges: Vec<&str> = groups.iter().map(|g| g.challenge.as_str()).collect();
        assert_eq!(challenges, vec!["BraTS-GLI", "BraTS-MEN-RT", "BraTS-PED"]);
    }

    #[test]
    fn test_empty_sources_still_listed() {
        let yaml = r#"
single-year:
  "2024":
    BraTS-MET:
      sources: []
"#;
        let config: GlobalConfig = serde_yaml::from_str(yaml).unwrap();
        let groups = config.source_groups(FusionMethod::Simple);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].group.sources.is_empty());
    }
}
