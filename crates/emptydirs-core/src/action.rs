use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::traverse::EmptyDir;
use crate::trash::{trash_location_name, TrashMover};

/// What to do with each empty directory found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Print each path.
    List,
    /// Only count.
    Count,
    /// Move each directory to the platform trash.
    Trash,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::List => "list",
            Action::Count => "count",
            Action::Trash => "trash",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(String),
    /// The path was already gone when the action ran.
    Vanished,
}

/// Per-path result of applying an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub path: PathBuf,
    pub outcome: Outcome,
}

impl ActionResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }
}

/// Applies an [`Action`] to batches of empty directories.
///
/// `out` receives the paths for [`Action::List`]; `mover` performs the moves
/// for [`Action::Trash`]. Failures are returned per path and never stop the
/// rest of the batch.
pub struct Executor<W, M> {
    action: Action,
    out: W,
    mover: M,
    /// Ancestors of paths whose trash move failed in this run.
    blocked: HashSet<PathBuf>,
}

impl<W: Write, M: TrashMover> Executor<W, M> {
    pub fn new(action: Action, out: W, mover: M) -> Self {
        Self {
            action,
            out,
            mover,
            blocked: HashSet::new(),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn execute(&mut self, batch: &[EmptyDir]) -> Vec<ActionResult> {
        let results = batch
            .iter()
            .map(|record| {
                let outcome = match self.action {
                    Action::List => self.list_one(&record.path),
                    Action::Count => Outcome::Succeeded,
                    Action::Trash => self.trash_one(&record.path),
                };
                ActionResult {
                    path: record.path.clone(),
                    outcome,
                }
            })
            .collect();

        if self.action == Action::List {
            if let Err(e) = self.out.flush() {
                warn!(error = %e, "failed to flush output");
            }
        }

        results
    }

    fn list_one(&mut self, path: &Path) -> Outcome {
        match writeln!(self.out, "{}", path.display()) {
            Ok(()) => Outcome::Succeeded,
            Err(e) => Outcome::Failed(format!("write failed: {e}")),
        }
    }

    fn trash_one(&mut self, path: &Path) -> Outcome {
        // Moving an ancestor would carry the failed child along with it.
        if self.blocked.contains(path) {
            let reason = "contains an entry that could not be trashed".to_string();
            warn!(path = %path.display(), "{reason}");
            return Outcome::Failed(reason);
        }

        match self.mover.move_to_trash(path) {
            Ok(()) => {
                info!("Moved to {}: {}", trash_location_name(), path.display());
                Outcome::Succeeded
            }
            Err(_) if is_gone(path) => {
                debug!(path = %path.display(), "already gone");
                Outcome::Vanished
            }
            Err(reason) => {
                warn!(path = %path.display(), error = %reason, "failed to move to trash");
                self.block_ancestors(path);
                Outcome::Failed(reason)
            }
        }
    }

    fn block_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            // Everything above an already blocked path is blocked too.
            if !self.blocked.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }
}

fn is_gone(path: &Path) -> bool {
    matches!(fs::symlink_metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
}
