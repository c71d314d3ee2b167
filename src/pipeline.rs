//! File-to-file runs of the core transforms.
//!
//! Each run validates its parameters, streams the input once through the
//! transform and writes the result, returning a [`RunSummary`]. A run that
//! fails part way removes the output it started.

use crate::core::{
    filter_instances, resample, write_pairs, LabelApplier, LabelConfig, LatLongExtractor,
    ResampleConfig, TransformStream,
};
use crate::error::{Error, Result};
use crate::event::{DataError, Event, EventReader, EventWriter, Schema};
use crate::stats::{LabelStats, ResampleStats, RunSummary, TransformStats};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Resample `input` to `config.sample_rate` and write the result to `output`.
pub fn resample_file(
    input: &Path,
    output: &Path,
    schema: &Schema,
    config: ResampleConfig,
) -> Result<RunSummary> {
    info!(
        input = %input.display(),
        output = %output.display(),
        rate = config.sample_rate,
        gap_threshold = config.gap_threshold,
        "resampling"
    );
    let summary = RunSummary::begin(
        input,
        output,
        TransformStats::Resample(ResampleStats::default()),
    );

    let reader = EventReader::from_path(input, schema.clone())?;
    let writer = EventWriter::to_path(output, schema.clone())?;
    let mut stream = resample(reader, schema, config);
    let written = discard_on_error(output, write_events(writer, &mut stream))?;

    let stats = stream.transform().stats().clone();
    Ok(summary.complete(stats.events_in, written, TransformStats::Resample(stats)))
}

/// Apply label windows to `input` and write the result to `output`.
///
/// With `filter_instances` set, only events that end up labeled are written.
pub fn label_file(
    input: &Path,
    output: &Path,
    schema: &Schema,
    config: LabelConfig,
    filter: bool,
) -> Result<RunSummary> {
    let applier = LabelApplier::new(schema, config.clone())?;
    let label_index = applier.label_index();

    info!(
        input = %input.display(),
        output = %output.display(),
        label_field = schema.labels[label_index].as_str(),
        window_start = config.window_start,
        window_end = config.window_end,
        filter,
        "applying label windows"
    );
    let summary = RunSummary::begin(input, output, TransformStats::Label(LabelStats::default()));

    let reader = EventReader::from_path(input, schema.clone())?;
    let writer = EventWriter::to_path(output, schema.clone())?;
    let mut stream = TransformStream::new(reader, applier);
    let result = if filter {
        write_events(writer, filter_instances(&mut stream, label_index))
    } else {
        write_events(writer, &mut stream)
    };
    let written = discard_on_error(output, result)?;

    let stats = stream.transform().stats().clone();
    Ok(summary.complete(stats.events_in, written, TransformStats::Label(stats)))
}

/// Write the distinct consecutive locations found in `input` to `output`.
pub fn latlong_file(
    input: &Path,
    output: &Path,
    schema: &Schema,
    latitude_field: &str,
    longitude_field: &str,
) -> Result<RunSummary> {
    let mut extractor = LatLongExtractor::new(schema, latitude_field, longitude_field)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        "extracting locations"
    );
    let summary = RunSummary::begin(input, output, TransformStats::Latlong { pairs: 0 });

    let reader = EventReader::from_path(input, schema.clone())?;
    let out = BufWriter::new(File::create(output).map_err(DataError::from)?);
    let events_read = discard_on_error(output, write_locations(reader, out, &mut extractor))?;

    let pairs = extractor.pairs();
    Ok(summary.complete(events_read, pairs, TransformStats::Latlong { pairs }))
}

/// Write every event and flush, returning the number written.
fn write_events<W: Write>(
    mut writer: EventWriter<W>,
    events: impl IntoIterator<Item = std::result::Result<Event, DataError>>,
) -> std::result::Result<u64, DataError> {
    let written = writer.write_all(events)?;
    writer.finish()?;
    Ok(written)
}

/// Write changed locations and flush, returning the number of events read.
fn write_locations<W: Write>(
    reader: impl IntoIterator<Item = std::result::Result<Event, DataError>>,
    mut out: W,
    extractor: &mut LatLongExtractor,
) -> std::result::Result<u64, DataError> {
    let mut events_read = 0;
    for event in reader {
        let event = event?;
        events_read += 1;
        if let Some(pair) = extractor.process_event(&event) {
            write_pairs(&mut out, [pair])?;
        }
    }
    out.flush()?;
    Ok(events_read)
}

/// Remove a partially written `output` when its run failed.
fn discard_on_error<T>(output: &Path, result: std::result::Result<T, DataError>) -> Result<T> {
    if let Err(e) = &result {
        warn!(output = %output.display(), error = %e, "run failed, removing partial output");
        if let Err(remove) = std::fs::remove_file(output) {
            warn!(output = %output.display(), error = %remove, "could not remove partial output");
        }
    }
    result.map_err(Error::from)
}
