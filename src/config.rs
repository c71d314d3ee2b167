//! Configuration for the Mobile AL preprocessing tools.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Default gap between consecutive events that forces a resampling restart.
pub const DEFAULT_GAP_THRESHOLD_SECS: f64 = 10.0;

/// Default seconds before a label at which its window starts.
pub const DEFAULT_WINDOW_START_SECS: f64 = 300.0;

/// Default seconds before a label at which its window ends.
pub const DEFAULT_WINDOW_END_SECS: f64 = 0.0;

/// Persisted defaults for the command-line tools.
///
/// Every value can be overridden per run from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gap threshold for resampling discontinuities (in seconds)
    pub gap_threshold_secs: f64,

    /// Seconds before a label to start its window
    pub window_start_secs: f64,

    /// Seconds before a label to end its window
    pub window_end_secs: f64,

    /// Label field that windows are applied to (first declared label if unset)
    pub label_field: Option<String>,

    /// Schema file used when none is given on the command line
    pub schema_path: Option<PathBuf>,

    /// Sensor holding latitude for location extraction
    pub latitude_field: String,

    /// Sensor holding longitude for location extraction
    pub longitude_field: String,

    /// Default tracing level when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gap_threshold_secs: DEFAULT_GAP_THRESHOLD_SECS,
            window_start_secs: DEFAULT_WINDOW_START_SECS,
            window_end_secs: DEFAULT_WINDOW_END_SECS,
            label_field: None,
            schema_path: None,
            latitude_field: "latitude".to_string(),
            longitude_field: "longitude".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::Io(e.to_string()))?;
            let config: Config =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mobile-al-tools")
            .join("config.json")
    }
}

/// Configuration and parameter errors.
///
/// All of these are raised before any input is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Sample rate of {0} Hz is invalid - must be positive")]
    InvalidSampleRate(f64),
    #[error("Gap threshold of {0} s is invalid - must be positive")]
    InvalidGapThreshold(f64),
    #[error("Window {which} of {value} s is invalid - must be non-negative")]
    NegativeWindow { which: &'static str, value: f64 },
    #[error("Window start ({start} s) must be greater than window end ({end} s)")]
    InvertedWindow { start: f64, end: f64 },
    #[error("Unknown label field '{0}'")]
    UnknownLabel(String),
    #[error("Schema declares no label fields")]
    NoLabelFields,
    #[error("Unknown or non-numeric sensor '{0}'")]
    UnknownSensor(String),
}
