//! Retroactive propagation of point labels onto trailing windows.
//!
//! A label observed at time `T` covers `[T - window_start, T - window_end]`.
//! Events are held in a trailing buffer until no later label could still
//! reach back to them, then emitted with the covering window's label (or
//! none). Windows never overlap: when a label arrives while the previous
//! window is still being resolved, the previous window is flushed first and
//! the new window starts no earlier than where the previous one ended.

use crate::config::ConfigError;
use crate::core::stream::{EventTransform, TransformStream};
use crate::event::{Event, Schema};
use crate::stats::LabelStats;
use std::collections::VecDeque;
use tracing::debug;

/// Parameters of a label window run.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelConfig {
    /// Seconds before a label at which its window starts
    pub window_start: f64,
    /// Seconds before a label at which its window ends
    pub window_end: f64,
    /// Label field to read and annotate (first declared label when `None`)
    pub label_field: Option<String>,
}

impl LabelConfig {
    /// Validate and build a configuration.
    pub fn new(window_start: f64, window_end: f64) -> Result<Self, ConfigError> {
        for (which, value) in [("start", window_start), ("end", window_end)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeWindow { which, value });
            }
        }
        if window_start <= window_end {
            return Err(ConfigError::InvertedWindow {
                start: window_start,
                end: window_end,
            });
        }
        Ok(Self {
            window_start,
            window_end,
            label_field: None,
        })
    }

    /// Annotate the named label field instead of the first one.
    pub fn with_label_field(mut self, label_field: impl Into<String>) -> Self {
        self.label_field = Some(label_field.into());
        self
    }

    /// Position of the configured label field in `schema`.
    pub fn label_index(&self, schema: &Schema) -> Result<usize, ConfigError> {
        match &self.label_field {
            Some(name) => schema
                .label_index(name)
                .ok_or_else(|| ConfigError::UnknownLabel(name.clone())),
            None if schema.labels.is_empty() => Err(ConfigError::NoLabelFields),
            None => Ok(0),
        }
    }
}

/// The span a single label is applied to.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelWindow {
    pub label: String,
    pub start: f64,
    pub end: f64,
}

impl LabelWindow {
    /// A window truncated to `start >= end` annotates nothing.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if a timestamp falls within this window (both ends inclusive).
    pub fn covers(&self, timestamp: f64) -> bool {
        !self.is_empty() && timestamp >= self.start && timestamp <= self.end
    }
}

/// Window state machine.
#[derive(Debug, Clone, PartialEq)]
enum WindowState {
    /// No label seen since creation or the last restart.
    Inactive,
    /// Buffered events are annotated against this window when emitted.
    Active(LabelWindow),
}

/// Streaming label window applier.
pub struct LabelApplier {
    config: LabelConfig,
    label_index: usize,
    /// Events not yet emitted, in input order
    pending: VecDeque<Event>,
    window: WindowState,
    /// Latest timestamp seen since the last restart
    latest: Option<f64>,
    last_emitted: Option<f64>,
    ready: VecDeque<Event>,
    stats: LabelStats,
}

impl LabelApplier {
    /// Create an applier for events shaped by `schema`.
    pub fn new(schema: &Schema, config: LabelConfig) -> Result<Self, ConfigError> {
        let label_index = config.label_index(schema)?;
        Ok(Self {
            config,
            label_index,
            pending: VecDeque::new(),
            window: WindowState::Inactive,
            latest: None,
            last_emitted: None,
            ready: VecDeque::new(),
            stats: LabelStats::default(),
        })
    }

    /// Position of the annotated label field.
    pub fn label_index(&self) -> usize {
        self.label_index
    }

    /// Process an incoming event.
    pub fn process_event(&mut self, event: Event) {
        self.stats.events_in += 1;
        let timestamp = event.timestamp;

        if self.is_backward_jump(timestamp) {
            self.stats.backward_jumps += 1;
            debug!(
                last_emitted = self.last_emitted,
                latest = self.latest,
                timestamp,
                buffered = self.pending.len(),
                "backward time jump, flushing label buffer"
            );
            self.flush_all();
        }

        self.latest = Some(self.latest.map_or(timestamp, |latest| latest.max(timestamp)));
        let label = event.label(self.label_index).map(str::to_string);
        self.pending.push_back(event);

        if let Some(label) = label {
            self.stats.labels_seen += 1;
            self.open_window(label, timestamp);
        }

        self.emit_aged();
    }

    /// Flush the buffer at end of input.
    ///
    /// The applier is reset and can be fed an unrelated stream afterwards.
    pub fn finish(&mut self) {
        self.flush_all();
    }

    /// Next annotated event, if one is complete.
    pub fn pop_ready(&mut self) -> Option<Event> {
        self.ready.pop_front()
    }

    /// Get and remove all completed events.
    pub fn take_ready(&mut self) -> Vec<Event> {
        self.ready.drain(..).collect()
    }

    /// Number of events held back waiting for possible labels.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Counters for this run.
    pub fn stats(&self) -> &LabelStats {
        &self.stats
    }

    /// An event behind anything already emitted, or behind the reach of any
    /// future window, restarts the buffer. Left in place it would hold every
    /// later event back until time caught up with the buffer's front.
    fn is_backward_jump(&self, timestamp: f64) -> bool {
        let behind_emitted = self.last_emitted.is_some_and(|last| timestamp < last);
        let behind_horizon = self
            .latest
            .is_some_and(|latest| timestamp < latest - self.config.window_start);
        behind_emitted || behind_horizon
    }

    /// Resolve the previous window and make `label` the active one.
    fn open_window(&mut self, label: String, timestamp: f64) {
        let mut start = timestamp - self.config.window_start;
        let end = timestamp - self.config.window_end;

        if let WindowState::Active(previous) = &self.window {
            let previous_end = previous.end;
            self.emit_while(|event| event.timestamp <= previous_end);

            if previous_end > start {
                debug!(
                    label = label.as_str(),
                    from = start,
                    to = previous_end,
                    "truncating label window start"
                );
                start = previous_end;
                self.stats.windows_truncated += 1;
            }
        }

        let window = LabelWindow { label, start, end };
        if window.is_empty() {
            debug!(
                label = window.label.as_str(),
                start, end, "label window is empty after truncation"
            );
            self.stats.windows_degenerate += 1;
        }
        self.stats.windows_opened += 1;
        self.window = WindowState::Active(window);
    }

    /// Emit every event older than any future window could reach.
    fn emit_aged(&mut self) {
        if let Some(latest) = self.latest {
            let horizon = latest - self.config.window_start;
            self.emit_while(|event| event.timestamp < horizon);
        }
    }

    /// Emit buffered events, oldest first, while `ready` holds.
    fn emit_while(&mut self, ready: impl Fn(&Event) -> bool) {
        while self.pending.front().is_some_and(&ready) {
            if let Some(event) = self.pending.pop_front() {
                self.emit(event);
            }
        }
    }

    /// Emit everything and reset to a fresh state.
    ///
    /// Flushed events still get the active window's label where it covers
    /// them: its label has been seen, only its neighbours are unresolved.
    /// Nothing after the flush can be labeled by a window opened before it.
    fn flush_all(&mut self) {
        self.emit_while(|_| true);
        self.window = WindowState::Inactive;
        self.latest = None;
        self.last_emitted = None;
    }

    fn emit(&mut self, mut event: Event) {
        let label = match &self.window {
            WindowState::Active(window) if window.covers(event.timestamp) => {
                Some(window.label.clone())
            }
            _ => None,
        };

        if label.is_some() {
            self.stats.labeled_out += 1;
        }
        if let Some(slot) = event.labels.get_mut(self.label_index) {
            *slot = label;
        }

        self.stats.events_out += 1;
        self.last_emitted = Some(event.timestamp);
        self.ready.push_back(event);
    }
}

impl EventTransform for LabelApplier {
    fn process_event(&mut self, event: Event) {
        LabelApplier::process_event(self, event);
    }

    fn finish(&mut self) {
        LabelApplier::finish(self);
    }

    fn pop_ready(&mut self) -> Option<Event> {
        LabelApplier::pop_ready(self)
    }
}

/// Apply trailing label windows to a fallible event sequence.
///
/// Fails before reading any input if the label field cannot be resolved.
pub fn apply_labels<I, E>(
    events: I,
    schema: &Schema,
    config: LabelConfig,
) -> Result<TransformStream<I::IntoIter, LabelApplier>, ConfigError>
where
    I: IntoIterator<Item = Result<Event, E>>,
{
    let applier = LabelApplier::new(schema, config)?;
    Ok(TransformStream::new(events.into_iter(), applier))
}
