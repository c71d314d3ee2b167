//! CSV event source and sink.
//!
//! Rows are read lazily, one at a time, and mapped onto the supplied
//! [`Schema`] by header name. Output files are written in schema order.

use crate::event::types::{Event, FieldKind, Schema, SensorValue, TimestampFormat};
use chrono::{DateTime, NaiveDateTime};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DATETIME_INPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATETIME_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Errors raised while reading or writing event files.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Schema mismatch: {0}")]
    Schema(String),
    #[error("Line {line}: cannot parse '{value}' in numeric column '{column}'")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },
    #[error("Line {line}: invalid timestamp '{value}'")]
    Timestamp { line: u64, value: String },
}

/// Where a file column lands in an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Timestamp,
    Sensor(usize),
    Label(usize),
}

/// Lazy reader producing one [`Event`] per CSV row.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
    schema: Schema,
    columns: Vec<Column>,
    record: csv::StringRecord,
    done: bool,
}

impl EventReader<File> {
    /// Open a CSV file for reading.
    pub fn from_path(path: &Path, schema: Schema) -> Result<Self, DataError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        Self::with_reader(reader, schema)
    }
}

impl<R: Read> EventReader<R> {
    /// Read events from any byte source.
    pub fn new(source: R, schema: Schema) -> Result<Self, DataError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(source);
        Self::with_reader(reader, schema)
    }

    fn with_reader(mut reader: csv::Reader<R>, schema: Schema) -> Result<Self, DataError> {
        let headers = reader.headers()?.clone();
        let columns = map_columns(&headers, &schema)?;
        Ok(Self {
            reader,
            schema,
            columns,
            record: csv::StringRecord::new(),
            done: false,
        })
    }

    /// The schema rows are decoded with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn decode(&self) -> Result<Event, DataError> {
        let line = self.record.position().map(|p| p.line()).unwrap_or(0);
        let mut event = Event::empty(0.0, &self.schema);

        for (cell, column) in self.record.iter().zip(&self.columns) {
            let cell = cell.trim();
            match *column {
                Column::Timestamp => {
                    event.timestamp =
                        parse_timestamp(cell, self.schema.timestamp.format).ok_or_else(|| {
                            DataError::Timestamp {
                                line,
                                value: cell.to_string(),
                            }
                        })?;
                }
                Column::Sensor(index) => {
                    if self.is_null(cell) {
                        continue;
                    }
                    let field = &self.schema.sensors[index];
                    event.sensors[index] = match field.kind {
                        FieldKind::Numeric => {
                            let value: f64 = cell.parse().map_err(|_| DataError::Parse {
                                line,
                                column: field.name.clone(),
                                value: cell.to_string(),
                            })?;
                            // NaN cells are treated like empty ones
                            (!value.is_nan()).then_some(SensorValue::Numeric(value))
                        }
                        FieldKind::Categorical => Some(SensorValue::Categorical(cell.to_string())),
                    };
                }
                Column::Label(index) => {
                    if !self.is_null(cell) {
                        event.labels[index] = Some(cell.to_string());
                    }
                }
            }
        }

        Ok(event)
    }

    fn is_null(&self, cell: &str) -> bool {
        cell.is_empty() || (!self.schema.null_token.is_empty() && cell == self.schema.null_token)
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = Result<Event, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let event = self.decode();
                if event.is_err() {
                    self.done = true;
                }
                Some(event)
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// Resolve every header cell to its schema column.
fn map_columns(headers: &csv::StringRecord, schema: &Schema) -> Result<Vec<Column>, DataError> {
    let mut columns = Vec::with_capacity(headers.len());

    for header in headers.iter() {
        let header = header.trim();
        let column = if header == schema.timestamp.column {
            Column::Timestamp
        } else if let Some(index) = schema.sensor_index(header) {
            Column::Sensor(index)
        } else if let Some(index) = schema.label_index(header) {
            Column::Label(index)
        } else {
            return Err(DataError::Schema(format!(
                "column '{header}' is not declared in the schema"
            )));
        };

        if columns.contains(&column) {
            return Err(DataError::Schema(format!("column '{header}' appears twice")));
        }
        columns.push(column);
    }

    if !columns.contains(&Column::Timestamp) {
        return Err(DataError::Schema(format!(
            "timestamp column '{}' is missing",
            schema.timestamp.column
        )));
    }
    for (index, field) in schema.sensors.iter().enumerate() {
        if !columns.contains(&Column::Sensor(index)) {
            return Err(DataError::Schema(format!(
                "sensor column '{}' is missing",
                field.name
            )));
        }
    }
    for (index, label) in schema.labels.iter().enumerate() {
        if !columns.contains(&Column::Label(index)) {
            return Err(DataError::Schema(format!("label column '{label}' is missing")));
        }
    }

    Ok(columns)
}

fn parse_timestamp(cell: &str, format: TimestampFormat) -> Option<f64> {
    match format {
        TimestampFormat::Seconds => cell.parse::<f64>().ok().filter(|t| t.is_finite()),
        TimestampFormat::DateTime => {
            let parsed = NaiveDateTime::parse_from_str(cell, DATETIME_INPUT_FORMAT).ok()?;
            Some(parsed.and_utc().timestamp_micros() as f64 / 1_000_000.0)
        }
    }
}

fn format_timestamp(timestamp: f64, format: TimestampFormat) -> Option<String> {
    match format {
        TimestampFormat::Seconds => {
            let rounded = (timestamp * 1_000_000.0).round() / 1_000_000.0;
            Some(format!("{rounded}"))
        }
        TimestampFormat::DateTime => {
            let micros = (timestamp * 1_000_000.0).round() as i64;
            DateTime::from_timestamp_micros(micros)
                .map(|dt| dt.format(DATETIME_OUTPUT_FORMAT).to_string())
        }
    }
}

/// Writer persisting events in schema column order.
pub struct EventWriter<W: Write> {
    writer: csv::Writer<W>,
    schema: Schema,
    row: Vec<String>,
    written: u64,
}

impl EventWriter<File> {
    /// Create (or truncate) a CSV file for writing.
    pub fn to_path(path: &Path, schema: Schema) -> Result<Self, DataError> {
        Self::with_writer(csv::Writer::from_path(path)?, schema)
    }
}

impl<W: Write> EventWriter<W> {
    /// Write events to any byte sink. The header row is written immediately.
    pub fn new(sink: W, schema: Schema) -> Result<Self, DataError> {
        Self::with_writer(csv::Writer::from_writer(sink), schema)
    }

    fn with_writer(mut writer: csv::Writer<W>, schema: Schema) -> Result<Self, DataError> {
        writer.write_record(schema.column_names())?;
        Ok(Self {
            writer,
            schema,
            row: Vec::new(),
            written: 0,
        })
    }

    /// Append one event.
    pub fn write(&mut self, event: &Event) -> Result<(), DataError> {
        if event.sensors.len() != self.schema.sensors.len()
            || event.labels.len() != self.schema.labels.len()
        {
            return Err(DataError::Schema(format!(
                "event at {} has {} sensors and {} labels, schema declares {} and {}",
                event.timestamp,
                event.sensors.len(),
                event.labels.len(),
                self.schema.sensors.len(),
                self.schema.labels.len()
            )));
        }

        let null = &self.schema.null_token;
        self.row.clear();
        self.row.push(
            format_timestamp(event.timestamp, self.schema.timestamp.format).ok_or_else(|| {
                DataError::Timestamp {
                    line: self.written + 2,
                    value: event.timestamp.to_string(),
                }
            })?,
        );
        self.row.extend(event.sensors.iter().map(|value| match value {
            Some(SensorValue::Numeric(v)) => v.to_string(),
            Some(SensorValue::Categorical(s)) => s.clone(),
            None => null.clone(),
        }));
        self.row.extend(
            event
                .labels
                .iter()
                .map(|label| label.clone().unwrap_or_else(|| null.clone())),
        );

        self.writer.write_record(&self.row)?;
        self.written += 1;
        Ok(())
    }

    /// Write every event from a fallible sequence, stopping at the first error.
    pub fn write_all<E>(&mut self, events: impl IntoIterator<Item = Result<Event, E>>) -> Result<u64, E>
    where
        E: From<DataError>,
    {
        let before = self.written;
        for event in events {
            self.write(&event?)?;
        }
        Ok(self.written - before)
    }

    /// Flush buffered rows and return the underlying sink.
    pub fn finish(self) -> Result<W, DataError> {
        self.writer
            .into_inner()
            .map_err(|e| DataError::Io(e.into_error()))
    }
}

/// Derive an output path by inserting `.<tag>` before the input's extension.
///
/// `walk.csv` with tag `sampled` becomes `walk.sampled.csv`.
pub fn output_path(input: &Path, tag: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}.{tag}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{tag}"),
    };
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::types::SensorField;

    fn schema() -> Schema {
        Schema::new("stamp")
            .with_sensor(SensorField::numeric("yaw"))
            .with_sensor(SensorField::categorical("place"))
            .with_label("activity")
    }

    fn read_all(data: &str, schema: Schema) -> Vec<Result<Event, DataError>> {
        EventReader::new(data.as_bytes(), schema).unwrap().collect()
    }

    #[test]
    fn test_read_rows_by_header_name() {
        let data = "place,stamp,activity,yaw\nhome,1.5,Cook,0.25\n,2.0,,\n";
        let events: Vec<Event> = read_all(data, schema())
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, 1.5);
        assert_eq!(events[0].sensors[0], Some(SensorValue::Numeric(0.25)));
        assert_eq!(
            events[0].sensors[1],
            Some(SensorValue::Categorical("home".into()))
        );
        assert_eq!(events[0].label(0), Some("Cook"));
        assert_eq!(events[1].sensors, vec![None, None]);
        assert_eq!(events[1].label(0), None);
    }

    #[test]
    fn test_null_token_and_nan() {
        let schema = Schema {
            null_token: "None".to_string(),
            ..schema()
        };
        let data = "stamp,yaw,place,activity\n1,NaN,None,None\n";
        let event = read_all(data, schema).remove(0).unwrap();
        assert_eq!(event.sensors, vec![None, None]);
        assert_eq!(event.labels, vec![None]);
    }

    #[test]
    fn test_unknown_column_is_schema_error() {
        let data = "stamp,yaw,place,activity,extra\n";
        let result = EventReader::new(data.as_bytes(), schema());
        assert!(matches!(result, Err(DataError::Schema(_))));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let data = "stamp,yaw,activity\n";
        let result = EventReader::new(data.as_bytes(), schema());
        assert!(matches!(result, Err(DataError::Schema(_))));
    }

    #[test]
    fn test_bad_numeric_cell_reports_line() {
        let data = "stamp,yaw,place,activity\n1,0.5,home,\n2,abc,home,\n3,0.5,home,\n";
        let events = read_all(data, schema());

        // Reading stops after the first failure
        assert_eq!(events.len(), 2);
        match &events[1] {
            Err(DataError::Parse {
                line,
                column,
                value,
            }) => {
                assert_eq!(*line, 3);
                assert_eq!(column, "yaw");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_datetime_timestamps() {
        let schema = schema().with_timestamp_format(TimestampFormat::DateTime);
        let data = "stamp,yaw,place,activity\n2020-01-01 00:00:01.500000,1,,\n";
        let event = read_all(data, schema.clone()).remove(0).unwrap();
        assert!((event.timestamp - 1_577_836_801.5).abs() < 1e-6);

        let mut writer = EventWriter::new(Vec::new(), schema).unwrap();
        writer.write(&event).unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            text,
            "stamp,yaw,place,activity\n2020-01-01 00:00:01.500000,1,,\n"
        );
    }

    #[test]
    fn test_bad_timestamp() {
        let data = "stamp,yaw,place,activity\nyesterday,1,,\n";
        let events = read_all(data, schema());
        assert!(matches!(events[0], Err(DataError::Timestamp { line: 2, .. })));
    }

    #[test]
    fn test_writer_orders_columns_and_nulls() {
        let schema = Schema {
            null_token: "None".to_string(),
            ..schema()
        };
        let mut writer = EventWriter::new(Vec::new(), schema.clone()).unwrap();
        let mut event = Event::empty(10.25, &schema);
        event.sensors[1] = Some(SensorValue::Categorical("work".into()));
        event.labels[0] = Some("Walk".into());
        writer.write(&event).unwrap();

        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(text, "stamp,yaw,place,activity\n10.25,None,work,Walk\n");
    }

    #[test]
    fn test_writer_rejects_mismatched_event() {
        let mut writer = EventWriter::new(Vec::new(), schema()).unwrap();
        let event = Event {
            timestamp: 1.0,
            sensors: vec![None],
            labels: vec![],
        };
        assert!(matches!(writer.write(&event), Err(DataError::Schema(_))));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("data/walk.csv"), "sampled"),
            PathBuf::from("data/walk.sampled.csv")
        );
        assert_eq!(
            output_path(Path::new("walk"), "labeled"),
            PathBuf::from("walk.labeled")
        );
        assert_eq!(
            output_path(Path::new("a.b.csv"), "instances"),
            PathBuf::from("a.b.instances.csv")
        );
    }
}
