use std::time::Duration;

use emptydirs_core::progress::{ProgressEvent, ProgressSink};
use tracing::info;

/// Logs batch progress, at most once per `interval`.
pub struct LogProgress {
    interval: Duration,
    last: Option<Duration>,
}

impl LogProgress {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    fn due(&mut self, elapsed: Duration) -> bool {
        let due = self
            .last
            .map_or(true, |last| elapsed.saturating_sub(last) >= self.interval);
        if due {
            self.last = Some(elapsed);
        }
        due
    }
}

impl ProgressSink for LogProgress {
    fn on_batch(&mut self, event: &ProgressEvent) {
        if !self.due(event.elapsed) {
            return;
        }
        info!(
            "Processed {} directories in {:.2} seconds ({:.2} dirs/sec)",
            event.cumulative,
            event.elapsed.as_secs_f64(),
            event.rate()
        );
    }
}
