//! Extraction of distinct latitude/longitude pairs for reverse geocoding.
//!
//! Each pair is written as `lat lon` on its own line. Consecutive repeats of
//! the same location are skipped.

use crate::config::ConfigError;
use crate::event::{Event, FieldKind, Schema, SensorValue};
use std::io::Write;

/// Streaming extractor of changed locations.
#[derive(Debug)]
pub struct LatLongExtractor {
    latitude: usize,
    longitude: usize,
    last: Option<(f64, f64)>,
    pairs: u64,
}

impl LatLongExtractor {
    /// Resolve the two numeric location sensors in `schema`.
    pub fn new(schema: &Schema, latitude_field: &str, longitude_field: &str) -> Result<Self, ConfigError> {
        let numeric = |name: &str| {
            schema
                .sensor_index(name)
                .filter(|&i| schema.sensors[i].kind == FieldKind::Numeric)
                .ok_or_else(|| ConfigError::UnknownSensor(name.to_string()))
        };

        Ok(Self {
            latitude: numeric(latitude_field)?,
            longitude: numeric(longitude_field)?,
            last: None,
            pairs: 0,
        })
    }

    /// Return the event's location if it differs from the last one returned.
    pub fn process_event(&mut self, event: &Event) -> Option<(f64, f64)> {
        let value = |i: usize| event.sensors.get(i)?.as_ref().and_then(SensorValue::as_f64);
        let pair = (value(self.latitude)?, value(self.longitude)?);

        if self.last == Some(pair) {
            return None;
        }
        self.last = Some(pair);
        self.pairs += 1;
        Some(pair)
    }

    /// Number of pairs returned so far.
    pub fn pairs(&self) -> u64 {
        self.pairs
    }
}

/// Write one `lat lon` line per pair.
pub fn write_pairs<W: Write>(
    out: &mut W,
    pairs: impl IntoIterator<Item = (f64, f64)>,
) -> std::io::Result<()> {
    for (lat, lon) in pairs {
        writeln!(out, "{lat} {lon}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SensorField;

    fn schema() -> Schema {
        Schema::new("stamp")
            .with_sensor(SensorField::numeric("latitude"))
            .with_sensor(SensorField::numeric("longitude"))
            .with_sensor(SensorField::categorical("place"))
    }

    fn event(lat: Option<f64>, lon: Option<f64>) -> Event {
        Event {
            timestamp: 0.0,
            sensors: vec![
                lat.map(SensorValue::Numeric),
                lon.map(SensorValue::Numeric),
                None,
            ],
            labels: vec![],
        }
    }

    #[test]
    fn test_skips_repeats_and_nulls() {
        let mut extractor = LatLongExtractor::new(&schema(), "latitude", "longitude").unwrap();
        let events = [
            event(Some(46.7), Some(-117.1)),
            event(Some(46.7), Some(-117.1)),
            event(None, Some(-117.2)),
            event(Some(46.8), Some(-117.1)),
            event(Some(46.7), Some(-117.1)),
        ];
        let pairs: Vec<(f64, f64)> = events
            .iter()
            .filter_map(|e| extractor.process_event(e))
            .collect();

        assert_eq!(
            pairs,
            vec![(46.7, -117.1), (46.8, -117.1), (46.7, -117.1)]
        );
        assert_eq!(extractor.pairs(), 3);
    }

    #[test]
    fn test_requires_numeric_fields() {
        assert!(matches!(
            LatLongExtractor::new(&schema(), "place", "longitude"),
            Err(ConfigError::UnknownSensor(name)) if name == "place"
        ));
        assert!(matches!(
            LatLongExtractor::new(&schema(), "latitude", "lng"),
            Err(ConfigError::UnknownSensor(_))
        ));
    }

    #[test]
    fn test_write_pairs_format() {
        let mut out = Vec::new();
        write_pairs(&mut out, vec![(46.73, -117.17), (1.0, 2.5)]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "46.73 -117.17\n1 2.5\n");
    }
}
