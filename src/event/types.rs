//! Event types and the externally supplied schema describing them.
//!
//! Events are positional: sensor and label values are stored in the order
//! the [`Schema`] declares them, and names are resolved through the schema.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Static type of a sensor column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Real-valued reading, aggregated by mean.
    Numeric,
    /// Text reading, aggregated by last non-null value.
    Categorical,
}

/// A single non-null sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorValue {
    Numeric(f64),
    Categorical(String),
}

impl SensorValue {
    /// Numeric payload, if this is a numeric reading.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SensorValue::Numeric(v) => Some(*v),
            SensorValue::Categorical(_) => None,
        }
    }

    /// Text payload, if this is a categorical reading.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SensorValue::Numeric(_) => None,
            SensorValue::Categorical(s) => Some(s),
        }
    }
}

/// One time-stamped row of sensor readings and label annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Seconds since the epoch (or any fixed origin)
    pub timestamp: f64,
    /// Sensor readings, indexed like [`Schema::sensors`]
    pub sensors: Vec<Option<SensorValue>>,
    /// Label values, indexed like [`Schema::labels`]
    pub labels: Vec<Option<String>>,
}

impl Event {
    /// Create an event with every sensor and label null.
    pub fn empty(timestamp: f64, schema: &Schema) -> Self {
        Self {
            timestamp,
            sensors: vec![None; schema.sensors.len()],
            labels: vec![None; schema.labels.len()],
        }
    }

    /// Label value at `index`, if present.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).and_then(|l| l.as_deref())
    }
}

/// How timestamps are written in the timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Real-valued seconds
    #[default]
    Seconds,
    /// `YYYY-MM-DD HH:MM:SS[.ffffff]`, interpreted as UTC
    DateTime,
}

/// The timestamp column declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampColumn {
    pub column: String,
    #[serde(default)]
    pub format: TimestampFormat,
}

/// A declared sensor column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorField {
    pub name: String,
    pub kind: FieldKind,
}

impl SensorField {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Numeric,
        }
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Categorical,
        }
    }
}

/// Column layout and types for an event file.
///
/// The schema is never inferred from the data; it is loaded from a JSON
/// document such as:
///
/// ```json
/// {
///   "timestamp": { "column": "stamp", "format": "date_time" },
///   "sensors": [
///     { "name": "yaw", "kind": "numeric" },
///     { "name": "place", "kind": "categorical" }
///   ],
///   "labels": ["user_activity_label"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub timestamp: TimestampColumn,
    #[serde(default)]
    pub sensors: Vec<SensorField>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Cell text written for null values (empty cells are always read as null)
    #[serde(default)]
    pub null_token: String,
}

impl Schema {
    /// Create a schema with a seconds-valued timestamp column.
    pub fn new(timestamp_column: impl Into<String>) -> Self {
        Self {
            timestamp: TimestampColumn {
                column: timestamp_column.into(),
                format: TimestampFormat::Seconds,
            },
            sensors: Vec::new(),
            labels: Vec::new(),
            null_token: String::new(),
        }
    }

    /// Builder-style sensor declaration.
    pub fn with_sensor(mut self, field: SensorField) -> Self {
        self.sensors.push(field);
        self
    }

    /// Builder-style label declaration.
    pub fn with_label(mut self, name: impl Into<String>) -> Self {
        self.labels.push(name.into());
        self
    }

    /// Builder-style timestamp format.
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp.format = format;
        self
    }

    /// Load and validate a schema from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let schema: Schema = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check that column names are non-empty and unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() && self.labels.is_empty() {
            return Err(ConfigError::InvalidSchema(
                "schema declares no sensor or label columns".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for name in self.column_names() {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidSchema("empty column name".to_string()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::InvalidSchema(format!(
                    "column '{name}' declared more than once"
                )));
            }
        }
        Ok(())
    }

    /// Position of a sensor by name.
    pub fn sensor_index(&self, name: &str) -> Option<usize> {
        self.sensors.iter().position(|s| s.name == name)
    }

    /// Position of a label field by name.
    pub fn label_index(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == name)
    }

    /// Kind of every sensor, in declaration order.
    pub fn sensor_kinds(&self) -> Vec<FieldKind> {
        self.sensors.iter().map(|s| s.kind).collect()
    }

    /// All column names in output order: timestamp, sensors, labels.
    pub fn column_names(&self) -> Vec<&str> {
        std::iter::once(self.timestamp.column.as_str())
            .chain(self.sensors.iter().map(|s| s.name.as_str()))
            .chain(self.labels.iter().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new("stamp")
            .with_sensor(SensorField::numeric("yaw"))
            .with_sensor(SensorField::categorical("place"))
            .with_label("activity")
    }

    #[test]
    fn test_schema_lookup() {
        let schema = schema();
        assert_eq!(schema.sensor_index("place"), Some(1));
        assert_eq!(schema.sensor_index("missing"), None);
        assert_eq!(schema.label_index("activity"), Some(0));
        assert_eq!(schema.column_names(), vec!["stamp", "yaw", "place", "activity"]);
        assert_eq!(
            schema.sensor_kinds(),
            vec![FieldKind::Numeric, FieldKind::Categorical]
        );
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let schema = schema().with_label("yaw");
        assert!(matches!(
            schema.validate(),
            Err(ConfigError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_schema_json() {
        let json = r#"{
            "timestamp": { "column": "stamp", "format": "date_time" },
            "sensors": [
                { "name": "yaw", "kind": "numeric" },
                { "name": "place", "kind": "categorical" }
            ],
            "labels": ["activity"]
        }"#;
        let parsed: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.timestamp.format, TimestampFormat::DateTime);
        assert_eq!(parsed.sensors[1].kind, FieldKind::Categorical);
        assert_eq!(parsed.null_token, "");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_empty_event() {
        let event = Event::empty(3.5, &schema());
        assert_eq!(event.sensors, vec![None, None]);
        assert_eq!(event.labels, vec![None]);
        assert_eq!(event.label(0), None);
    }

    #[test]
    fn test_sensor_value_accessors() {
        assert_eq!(SensorValue::Numeric(2.0).as_f64(), Some(2.0));
        assert_eq!(SensorValue::Numeric(2.0).as_str(), None);
        assert_eq!(SensorValue::Categorical("home".into()).as_str(), Some("home"));
    }
}
