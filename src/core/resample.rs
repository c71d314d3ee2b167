//! Resampling of irregular event streams to a uniform rate.
//!
//! Events are aggregated into fixed-width periods of `1 / sample_rate`
//! seconds. Each closed period produces one event stamped with the period's
//! end:
//!
//! - numeric sensors get the mean of the samples that fell in the period
//! - categorical sensors and labels get the last non-null value seen so far
//! - a period without any input replays the last known values (upsampling)
//!
//! A gap above the threshold, or an event earlier than the current period,
//! closes the period early and restarts the period grid at that event.

use crate::config::ConfigError;
use crate::core::stream::{EventTransform, TransformStream};
use crate::event::{Event, FieldKind, Schema, SensorValue};
use crate::stats::ResampleStats;
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use tracing::debug;

/// Parameters of a resampling run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleConfig {
    /// Output rate in Hz
    pub sample_rate: f64,
    /// Largest tolerated gap between consecutive input events (seconds)
    pub gap_threshold: f64,
    /// Floor each period grid origin to the whole second
    pub align_start: bool,
}

impl ResampleConfig {
    /// Validate and build a configuration.
    pub fn new(sample_rate: f64, gap_threshold: f64) -> Result<Self, ConfigError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        if !(gap_threshold.is_finite() && gap_threshold > 0.0) {
            return Err(ConfigError::InvalidGapThreshold(gap_threshold));
        }
        Ok(Self {
            sample_rate,
            gap_threshold,
            align_start: false,
        })
    }

    /// Align period origins to whole seconds.
    pub fn with_align_start(mut self, align_start: bool) -> Self {
        self.align_start = align_start;
        self
    }

    /// Width of one output period in seconds.
    pub fn sample_period(&self) -> f64 {
        1.0 / self.sample_rate
    }
}

/// The period currently being filled.
///
/// Boundaries are derived from an origin and an integer index so that
/// output timestamps stay exactly on the grid however long the run.
#[derive(Debug)]
struct Period {
    origin: f64,
    index: u64,
    width: f64,
    /// Non-null numeric samples per sensor (unused slots for categorical ones)
    samples: Vec<Vec<f64>>,
    /// Input events accumulated into this period
    events: usize,
}

impl Period {
    fn open(origin: f64, timestamp: f64, width: f64, sensors: usize) -> Self {
        let index = ((timestamp - origin) / width).floor().max(0.0) as u64;
        Self {
            origin,
            index,
            width,
            samples: vec![Vec::new(); sensors],
            events: 0,
        }
    }

    fn start(&self) -> f64 {
        self.origin + self.index as f64 * self.width
    }

    fn end(&self) -> f64 {
        self.origin + (self.index + 1) as f64 * self.width
    }

    fn advance(&mut self) {
        self.index += 1;
        self.events = 0;
        for samples in &mut self.samples {
            samples.clear();
        }
    }
}

/// Period state machine.
#[derive(Debug)]
enum PeriodState {
    /// Nothing seen since creation or the end of input.
    Idle,
    /// Aggregating input into a period.
    Open(Period),
}

/// Why the period grid was restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discontinuity {
    Gap,
    BackwardJump,
}

/// Streaming resampler.
///
/// Feed events with [`Resampler::process_event`], call [`Resampler::finish`]
/// at end of input, and drain output with [`Resampler::pop_ready`] or
/// [`Resampler::take_ready`].
pub struct Resampler {
    config: ResampleConfig,
    kinds: Vec<FieldKind>,
    state: PeriodState,
    /// Last non-null value per sensor since the last restart
    last_known: Vec<Option<SensorValue>>,
    /// Last non-null value per label field since the last restart
    last_labels: Vec<Option<String>>,
    last_timestamp: Option<f64>,
    ready: VecDeque<Event>,
    stats: ResampleStats,
}

impl Resampler {
    /// Create a resampler for events shaped by `schema`.
    pub fn new(schema: &Schema, config: ResampleConfig) -> Self {
        Self {
            config,
            kinds: schema.sensor_kinds(),
            state: PeriodState::Idle,
            last_known: vec![None; schema.sensors.len()],
            last_labels: vec![None; schema.labels.len()],
            last_timestamp: None,
            ready: VecDeque::new(),
            stats: ResampleStats::default(),
        }
    }

    /// Process an incoming event.
    ///
    /// This will:
    /// 1. Restart the period grid on a gap or backward jump
    /// 2. Close every period that ends at or before the event
    /// 3. Accumulate the event into the current period
    ///
    /// A gap replays the last values up to the event before the grid
    /// restarts at it; a backward jump closes the current period only.
    pub fn process_event(&mut self, event: Event) {
        self.stats.events_in += 1;

        if let Some(reason) = self.discontinuity(event.timestamp) {
            debug!(
                ?reason,
                last = self.last_timestamp,
                timestamp = event.timestamp,
                "restarting resample periods"
            );
            match reason {
                Discontinuity::Gap => {
                    self.stats.gaps += 1;
                    self.close_through(event.timestamp);
                }
                Discontinuity::BackwardJump => {
                    self.stats.backward_jumps += 1;
                    self.close_period();
                }
            }
            self.restart();
        }

        if matches!(self.state, PeriodState::Idle) {
            let origin = if self.config.align_start {
                event.timestamp.floor()
            } else {
                event.timestamp
            };
            self.state = PeriodState::Open(Period::open(
                origin,
                event.timestamp,
                self.config.sample_period(),
                self.kinds.len(),
            ));
        }

        self.close_through(event.timestamp);
        self.accumulate(event);
    }

    /// Close the final period at end of input.
    ///
    /// The resampler is reset and can be fed an unrelated stream afterwards.
    pub fn finish(&mut self) {
        self.close_period();
        self.restart();
        self.last_timestamp = None;
    }

    /// Next resampled event, if one is complete.
    pub fn pop_ready(&mut self) -> Option<Event> {
        self.ready.pop_front()
    }

    /// Get and remove all completed events.
    pub fn take_ready(&mut self) -> Vec<Event> {
        self.ready.drain(..).collect()
    }

    /// Counters for this run.
    pub fn stats(&self) -> &ResampleStats {
        &self.stats
    }

    fn current_end(&self) -> Option<f64> {
        match &self.state {
            PeriodState::Open(period) => Some(period.end()),
            PeriodState::Idle => None,
        }
    }

    /// Close every period ending at or before `timestamp`.
    fn close_through(&mut self, timestamp: f64) {
        while self.current_end().is_some_and(|end| end <= timestamp) {
            self.close_period();
        }
    }

    fn discontinuity(&self, timestamp: f64) -> Option<Discontinuity> {
        let PeriodState::Open(period) = &self.state else {
            return None;
        };
        if timestamp < period.start() {
            return Some(Discontinuity::BackwardJump);
        }
        match self.last_timestamp {
            Some(last) if timestamp - last > self.config.gap_threshold => Some(Discontinuity::Gap),
            _ => None,
        }
    }

    /// Drop every accumulator so nothing carries across a discontinuity.
    fn restart(&mut self) {
        self.state = PeriodState::Idle;
        self.last_known.iter_mut().for_each(|v| *v = None);
        self.last_labels.iter_mut().for_each(|v| *v = None);
    }

    /// Emit the current period at its end and move to the next one.
    fn close_period(&mut self) {
        let PeriodState::Open(period) = &mut self.state else {
            return;
        };

        let upsampled = period.events == 0;
        let sensors = self
            .kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| match kind {
                FieldKind::Numeric if !upsampled => {
                    let samples = &period.samples[i];
                    (!samples.is_empty()).then(|| SensorValue::Numeric(samples.iter().mean()))
                }
                _ => self.last_known[i].clone(),
            })
            .collect();

        self.ready.push_back(Event {
            timestamp: period.end(),
            sensors,
            labels: self.last_labels.clone(),
        });
        self.stats.periods_emitted += 1;
        if upsampled {
            self.stats.upsampled_periods += 1;
        }

        period.advance();
    }

    fn accumulate(&mut self, event: Event) {
        self.last_timestamp = Some(event.timestamp);

        let PeriodState::Open(period) = &mut self.state else {
            return;
        };
        period.events += 1;

        for (i, value) in event.sensors.into_iter().enumerate().take(self.kinds.len()) {
            let Some(value) = value else { continue };
            if let SensorValue::Numeric(v) = value {
                period.samples[i].push(v);
            }
            self.last_known[i] = Some(value);
        }

        for (slot, label) in self.last_labels.iter_mut().zip(event.labels) {
            if label.is_some() {
                *slot = label;
            }
        }
    }
}

impl EventTransform for Resampler {
    fn process_event(&mut self, event: Event) {
        Resampler::process_event(self, event);
    }

    fn finish(&mut self) {
        Resampler::finish(self);
    }

    fn pop_ready(&mut self) -> Option<Event> {
        Resampler::pop_ready(self)
    }
}

/// Resample a fallible event sequence to `config.sample_rate`.
///
/// Source errors are passed through unchanged and end the stream.
pub fn resample<I, E>(
    events: I,
    schema: &Schema,
    config: ResampleConfig,
) -> TransformStream<I::IntoIter, Resampler>
where
    I: IntoIterator<Item = Result<Event, E>>,
{
    TransformStream::new(events.into_iter(), Resampler::new(schema, config))
}
