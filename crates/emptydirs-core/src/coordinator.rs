//! Batch coordination: pulls empty directories from a traversal in fixed-size
//! groups, applies the action to each group, and reports progress between
//! groups. Batches are a scheduling and reporting boundary only; every path
//! is handled on its own.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::action::{Action, Executor, Outcome};
use crate::config::RunConfig;
use crate::error::{ActionError, Error};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::trash::TrashMover;
use crate::traverse::{EmptyDir, Traverser};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    /// Stopped by an interrupt after finishing the in-flight batch.
    Cancelled,
    /// Stopped by an unrecoverable traversal error.
    Aborted(String),
}

/// Aggregate result of a run. Produced for every run, including aborted and
/// cancelled ones, so partial progress is always visible.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub batches: usize,
    pub discovered: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Paths that were already gone when their action ran.
    pub vanished: u64,
    pub failures: Vec<ActionError>,
    pub outcome: RunOutcome,
}

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl RunSummary {
    fn new(action: Action) -> Self {
        Self {
            action,
            root: None,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            batches: 0,
            discovered: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            vanished: 0,
            failures: Vec::new(),
            outcome: RunOutcome::Completed,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Aborted(_))
    }
}

/// Drives a traversal through an [`Executor`] one batch at a time.
pub struct BatchCoordinator<P> {
    config: RunConfig,
    progress: P,
    cancel: Option<Arc<AtomicBool>>,
}

impl<P: ProgressSink> BatchCoordinator<P> {
    pub fn new(config: RunConfig, progress: P) -> Self {
        Self {
            config,
            progress,
            cancel: None,
        }
    }

    /// Stop pulling records once `flag` is set. [`scan`](Self::scan) also
    /// hands the flag to the traversal, so a long stretch without empty
    /// directories is interrupted too.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Traverse `root` and apply `executor` to every empty directory found.
    ///
    /// Fails only when `root` is not a usable directory; later traversal
    /// failures end the run with [`RunOutcome::Aborted`] in the summary.
    pub fn scan<W: Write, M: TrashMover>(
        &mut self,
        root: &Path,
        executor: &mut Executor<W, M>,
    ) -> Result<RunSummary, Error> {
        let mut traverser = Traverser::new(root)?;
        if let Some(flag) = &self.cancel {
            traverser = traverser.with_cancel(flag.clone());
        }
        info!(
            root = %traverser.root().display(),
            action = %executor.action(),
            batch_size = self.config.batch_size.get(),
            "searching for empty directories"
        );

        let mut summary = self.run(traverser.by_ref(), executor);
        summary.root = Some(traverser.root().to_path_buf());
        summary.skipped = traverser.skipped();
        Ok(summary)
    }

    /// Consume `records` in batches of the configured size.
    pub fn run<I, W, M>(&mut self, records: I, executor: &mut Executor<W, M>) -> RunSummary
    where
        I: IntoIterator<Item = Result<EmptyDir, Error>>,
        W: Write,
        M: TrashMover,
    {
        let start = Instant::now();
        let mut summary = RunSummary::new(executor.action());
        let mut records = records.into_iter();
        let size = self.config.batch_size.get();
        let mut batch = Vec::with_capacity(size.min(4096));

        loop {
            let mut stop = None;
            while batch.len() < size {
                if self.cancelled() {
                    stop = Some(RunOutcome::Cancelled);
                    break;
                }
                match records.next() {
                    Some(Ok(record)) => batch.push(record),
                    Some(Err(e)) => {
                        stop = Some(RunOutcome::Aborted(e.to_string()));
                        break;
                    }
                    // A source that honours the flag ends early rather than
                    // finishing, so the flag decides the outcome here.
                    None if self.cancelled() => {
                        stop = Some(RunOutcome::Cancelled);
                        break;
                    }
                    None => {
                        stop = Some(RunOutcome::Completed);
                        break;
                    }
                }
            }

            if !batch.is_empty() {
                self.process(&mut summary, executor, &batch, start);
                batch.clear();
            }

            if let Some(outcome) = stop {
                summary.outcome = outcome;
                break;
            }
        }

        summary.elapsed = start.elapsed();
        info!(
            discovered = summary.discovered,
            succeeded = summary.succeeded,
            failed = summary.failed,
            vanished = summary.vanished,
            outcome = ?summary.outcome,
            "run finished"
        );
        summary
    }

    fn process<W: Write, M: TrashMover>(
        &mut self,
        summary: &mut RunSummary,
        executor: &mut Executor<W, M>,
        batch: &[EmptyDir],
        start: Instant,
    ) {
        summary.batches += 1;
        debug!(batch = summary.batches, len = batch.len(), "processing batch");

        for result in executor.execute(batch) {
            summary.discovered += 1;
            match result.outcome {
                Outcome::Succeeded => summary.succeeded += 1,
                Outcome::Vanished => summary.vanished += 1,
                Outcome::Failed(reason) => {
                    summary.failed += 1;
                    summary.failures.push(ActionError {
                        path: result.path,
                        reason,
                    });
                }
            }
        }

        if self.config.report_progress {
            self.progress.on_batch(&ProgressEvent {
                batch_index: summary.batches,
                paths_in_batch: batch.len(),
                cumulative: summary.discovered,
                elapsed: start.elapsed(),
            });
        }
    }
}
