//! Mobile AL Tools - preprocessing for activity-recognition sensor files.
//!
//! This library turns row-per-event sensor recordings into training data.
//! Two streaming transforms do the work:
//!
//! - **Resampling**: irregular events are aggregated into uniform periods
//!   (mean for numeric sensors, last value for categorical ones and labels,
//!   replay of the last values for empty periods)
//! - **Label windows**: each point label is propagated backwards over a
//!   trailing window of earlier events, without overlapping windows
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ EventReader │──▶│ Resampler            │──▶│              │──▶│ EventWriter │
//! │   (CSV)     │   │   or LabelApplier    │   │ filter (opt) │   │   (CSV)     │
//! └─────────────┘   └──────────────────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! Both transforms are single pass and hold only a bounded amount of state:
//! the current period for resampling, and `window_start` seconds of events
//! for labeling.
//!
//! # Example
//!
//! ```no_run
//! use mobile_al_tools::core::{resample, ResampleConfig};
//! use mobile_al_tools::event::{EventReader, EventWriter, Schema};
//! use std::path::Path;
//!
//! let schema = Schema::load(Path::new("schema.json")).unwrap();
//! let config = ResampleConfig::new(1.0, 10.0).unwrap();
//!
//! let reader = EventReader::from_path(Path::new("walk.csv"), schema.clone()).unwrap();
//! let mut writer = EventWriter::to_path(Path::new("walk.sampled.csv"), schema.clone()).unwrap();
//! writer.write_all(resample(reader, &schema, config)).unwrap();
//! writer.finish().unwrap();
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod stats;

// Re-export key types at crate root for convenience
pub use crate::core::{
    apply_labels, filter_instances, resample, LabelApplier, LabelConfig, ResampleConfig,
    Resampler,
};
pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use event::{DataError, Event, EventReader, EventWriter, Schema, SensorValue};
pub use stats::{LabelStats, ResampleStats, RunSummary};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
