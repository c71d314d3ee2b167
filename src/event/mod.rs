//! Event model and CSV input/output.
//!
//! The core transforms only see [`Event`] values; file layout, header
//! mapping and null encoding live in [`csv_io`].

pub mod csv_io;
pub mod types;

// Re-export commonly used types
pub use csv_io::{output_path, DataError, EventReader, EventWriter};
pub use types::{
    Event, FieldKind, Schema, SensorField, SensorValue, TimestampColumn, TimestampFormat,
};
