//! Work-set resolution.
//!
//! A name is fusable only when every source of a group has a file with that
//! name. Names missing from some sources are dropped without error: partial
//! submissions are normal.

use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::domain::{SourceGroup, WorkItem};
use crate::error::{FuseError, Result};

/// Reserved nested folder that holds the real data when present
pub const CONTAINER_DIR: &str = "PaxHeader";

/// The directory actually listed for a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDirectory {
    /// Files live directly in the source directory
    Direct(PathBuf),
    /// Files live in the nested `PaxHeader` container; the parent's own
    /// entries are metadata and are ignored
    Container(PathBuf),
}

impl SourceDirectory {
    pub fn path(&self) -> &Path {
        match self {
            SourceDirectory::Direct(p) | SourceDirectory::Container(p) => p,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, SourceDirectory::Container(_))
    }
}

/// Pick the directory to list for a source base directory.
///
/// Fails with a configuration error when `base` is not a directory.
pub async fn resolve_source_directory(base: &Path) -> Result<SourceDirectory> {
    let is_dir = tokio::fs::metadata(base).await.map(|m| m.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(FuseError::Configuration(format!(
            "source directory does not exist: {}",
            base.display()
        )));
    }

    let container = base.join(CONTAINER_DIR);
    let has_container = tokio::fs::metadata(&container).await.map(|m| m.is_dir()).unwrap_or(false);
    if has_container {
        debug!("Using {} container in {}", CONTAINER_DIR, base.display());
        Ok(SourceDirectory::Container(container))
    } else {
        Ok(SourceDirectory::Direct(base.to_path_buf()))
    }
}

/// Names of all entries in a directory
pub async fn list_names(dir: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) => {
                names.insert(name);
            }
            Err(raw) => warn!("Ignoring non UTF-8 entry {:?} in {}", raw, dir.display()),
        }
    }

    Ok(names)
}

/// Computes the fusable names of a set of sources
pub struct WorkSetResolver;

impl WorkSetResolver {
    /// Resolve every base directory, applying the container rule
    pub async fn resolve_dirs(bases: &[PathBuf]) -> Result<Vec<SourceDirectory>> {
        let mut dirs = Vec::with_capacity(bases.len());
        for base in bases {
            dirs.push(resolve_source_directory(base).await?);
        }
        Ok(dirs)
    }

    /// Names present in every source directory
    pub async fn resolve(bases: &[PathBuf]) -> Result<BTreeSet<String>> {
        let dirs = Self::resolve_dirs(bases).await?;
        Self::intersect(&dirs).await
    }

    /// Intersect the listings of already resolved directories
    pub async fn intersect(dirs: &[SourceDirectory]) -> Result<BTreeSet<String>> {
        let Some((first, rest)) = dirs.split_first() else {
            return Err(FuseError::Configuration("no source directories given".to_string()));
        };

        let mut names = list_names(first.path()).await?;
        info!("\t{}: {} files", first.path().display(), names.len());

        for dir in rest {
            let listing = list_names(dir.path()).await?;
            info!("\t{}: {} files", dir.path().display(), listing.len());
            names.retain(|n| listing.contains(n));
        }

        info!("\tIntersect: {} files", names.len());
        Ok(names)
    }

    /// Build the work items of a group: one per fusable name
    pub async fn work_items(group: &SourceGroup) -> Result<Vec<WorkItem>> {
        let bases: Vec<PathBuf> = group.sources.iter().map(|s| s.dir.clone()).collect();
        let dirs = Self::resolve_dirs(&bases).await?;
        let names = Self::intersect(&dirs).await?;

        let items = names
            .into_iter()
            .map(|name| {
                let inputs = dirs.iter().map(|d| d.path().join(&name)).collect();
                let output = group.output_dir.join(&name);
                WorkItem::new(name, inputs, output)
            })
            .collect();
        Ok(items)
    }
}
