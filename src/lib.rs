//! segfuse - idempotent batch fusion of segmentation masks
//!
//! Fuses same-named segmentation files contributed by several sources into
//! one consensus output per name. The fusion algorithm and the image codec
//! are external; this crate decides what to fuse:
//! - which names every source provides (work-set resolution)
//! - which outputs already exist and are valid (idempotent resume)
//! - how the remaining items are dispatched to a bounded worker pool

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod fusion;
pub mod planner;
pub mod resolve;
pub mod runner;
pub mod shell;
pub mod validation;

pub use error::{FuseError, Result};
