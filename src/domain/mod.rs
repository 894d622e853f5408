//! Domain types for segfuse
//!
//! This module contains the value types that flow through the pipeline:
//! - Source / SourceGroup: which directories contribute to one fused output set
//! - WorkItem: one fusable name with its resolved input and output paths
//! - JobOutcome: result of processing one WorkItem in one run
//! - FusionMethod: the consensus algorithm identifier handed to the fuser
//!
//! None of these are persisted. The output artifacts on disk are the only
//! durable state between runs.

pub mod group;
pub mod outcome;
pub mod work_item;

pub use group::{FusionMethod, Shape, Source, SourceGroup, Weights};
pub use outcome::JobOutcome;
pub use work_item::WorkItem;
