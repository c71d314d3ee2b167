//! Pull-based adapter over the push-based transforms.

use crate::event::Event;

/// A single-pass, stateful transform fed one event at a time.
pub trait EventTransform {
    /// Consume the next input event.
    fn process_event(&mut self, event: Event);

    /// Signal end of input; remaining buffered output becomes ready.
    fn finish(&mut self);

    /// Next finished output event, if any.
    fn pop_ready(&mut self) -> Option<Event>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Running,
    Draining,
    Done,
}

/// Iterator driving an [`EventTransform`] from a fallible event source.
///
/// Output is yielded as soon as the transform finalizes it. The first
/// source error is passed through unchanged and ends the stream.
pub struct TransformStream<I, T> {
    source: I,
    transform: T,
    stage: Stage,
}

impl<I, T> TransformStream<I, T> {
    pub fn new(source: I, transform: T) -> Self {
        Self {
            source,
            transform,
            stage: Stage::Running,
        }
    }

    /// The wrapped transform, e.g. to read its counters.
    pub fn transform(&self) -> &T {
        &self.transform
    }
}

impl<I, T, E> Iterator for TransformStream<I, T>
where
    I: Iterator<Item = Result<Event, E>>,
    T: EventTransform,
{
    type Item = Result<Event, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.stage == Stage::Done {
                return None;
            }
            if let Some(event) = self.transform.pop_ready() {
                return Some(Ok(event));
            }
            if self.stage == Stage::Draining {
                self.stage = Stage::Done;
                return None;
            }

            match self.source.next() {
                Some(Ok(event)) => self.transform.process_event(event),
                Some(Err(e)) => {
                    self.stage = Stage::Done;
                    return Some(Err(e));
                }
                None => {
                    self.transform.finish();
                    self.stage = Stage::Draining;
                }
            }
        }
    }
}
