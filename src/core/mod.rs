//! Core transforms over event streams.
//!
//! This module contains:
//! - Resampling to a uniform rate (mean / last-value aggregation)
//! - Retroactive label windows
//! - The labeled-instance filter
//! - Location pair extraction

pub mod filter;
pub mod labels;
pub mod latlong;
pub mod resample;
pub mod stream;

// Re-export commonly used types
pub use filter::filter_instances;
pub use labels::{apply_labels, LabelApplier, LabelConfig, LabelWindow};
pub use latlong::{write_pairs, LatLongExtractor};
pub use resample::{resample, ResampleConfig, Resampler};
pub use stream::{EventTransform, TransformStream};
