//! Work item - one named unit of fusable work.

use std::path::PathBuf;

/// A file name present in every source of a group, together with where to
/// read each contribution and where to write the fused result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// File name shared by all sources
    pub name: String,
    /// One input path per source, in source order
    pub inputs: Vec<PathBuf>,
    /// Target path of the fused artifact
    pub output: PathBuf,
}

impl WorkItem {
    pub fn new(name: impl Into<String>, inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        Self {
            name: name.into(),
            inputs,
            output,
        }
    }

    /// Inputs that are not present on disk
    pub async fn missing_inputs(&self) -> Vec<PathBuf> {
        let mut missing = Vec::new();
        for input in &self.inputs {
            if !tokio::fs::try_exists(input).await.unwrap_or(false) {
                missing.push(input.clone());
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_inputs_empty_when_all_exist() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.nii.gz");
        let b = dir.path().join("b.nii.gz");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();

        let item = WorkItem::new("x", vec![a, b], dir.path().join("out.nii.gz"));
        assert!(item.missing_inputs().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_inputs_lists_absent_paths() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.nii.gz");
        let b = dir.path().join("b.nii.gz");
        std::fs::write(&a, "").unwrap();

        let item = WorkItem::new("x", vec![a, b.clone()], dir.path().join("out.nii.gz"));
        assert_eq!(item.missing_inputs().await, vec![b]);
    }
}
