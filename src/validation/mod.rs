//! Output artifact validation.
//!
//! Decides whether a previously written fused artifact can be trusted or has
//! to be produced again. Decoding is delegated to an `ImageProbe`.

pub mod command;
pub mod oracle;
pub mod traits;

pub use command::CommandProbe;
pub use oracle::{DEFAULT_SHAPES, PolicyOverride, ValidationOracle, ValidationPolicy};
pub use traits::{ImageProbe, ImageSummary, Verdict};
