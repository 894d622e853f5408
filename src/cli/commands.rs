//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: fuse every configured group (default)
//! - check: validate a single output artifact
//! - list: show configured groups and their work-set sizes

use clap::{Parser, Subcommand};
use segfuse::domain::FusionMethod;
use std::path::PathBuf;

/// segfuse - batch fusion of per-source segmentation masks
#[derive(Parser, Debug)]
#[command(name = "segfuse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fuse all configured groups, skipping valid outputs
    Run {
        /// Only run these methods (repeatable)
        #[arg(short, long = "method", value_enum)]
        methods: Vec<FusionMethod>,

        /// Only run these challenges (repeatable)
        #[arg(long = "challenge")]
        challenges: Vec<String>,

        /// Override the configured worker count
        #[arg(short, long)]
        workers: Option<usize>,

        /// Resolve and plan without fusing
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate one fused artifact
    Check {
        /// Artifact to validate
        path: PathBuf,

        /// Accept any shape
        #[arg(long)]
        no_shape_check: bool,

        /// Accept volumes without any non-zero voxel
        #[arg(long)]
        allow_all_zero: bool,
    },

    /// List configured groups and how many items each can fuse
    List {
        /// Only list these challenges (repeatable)
        #[arg(long = "challenge")]
        challenges: Vec<String>,
    },
}
