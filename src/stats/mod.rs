//! Processing statistics for the preprocessing tools.
//!
//! This module tracks what each run consumed and produced so that
//! discontinuities and label coverage can be audited after the fact.

pub mod summary;

// Re-export commonly used types
pub use summary::{LabelStats, ResampleStats, RunSummary, TransformStats};
