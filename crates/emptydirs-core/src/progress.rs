use std::time::Duration;

/// Reported after each batch has been processed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// 1-based index of the batch just processed.
    pub batch_index: usize,
    pub paths_in_batch: usize,
    /// Paths processed so far in the run, including this batch.
    pub cumulative: u64,
    pub elapsed: Duration,
}

impl ProgressEvent {
    /// Directories per second so far.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.cumulative as f64 / secs
        } else {
            0.0
        }
    }
}

/// Observer for batch progress. Purely observational.
pub trait ProgressSink {
    fn on_batch(&mut self, event: &ProgressEvent);
}

/// Discards all progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_batch(&mut self, _event: &ProgressEvent) {}
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn on_batch(&mut self, event: &ProgressEvent) {
        (**self).on_batch(event)
    }
}

/// Keeps every event. Useful in tests and for callers that render progress
/// after the fact.
#[derive(Debug, Default, Clone)]
pub struct CollectProgress {
    pub events: Vec<ProgressEvent>,
}

impl ProgressSink for CollectProgress {
    fn on_batch(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }
}
