use std::path::{Path, PathBuf};

use serde::Serialize;

/// Fatal errors that stop a run before or during traversal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("batch size must be at least 1 (got {0})")]
    InvalidBatchSize(i64),

    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot access {}: {source}", .path.display())]
    RootAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("traversal aborted at {}: {source}", .path.display())]
    Aborted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Classify a failure to resolve the root path.
    pub fn root(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::PathNotFound(path.to_path_buf()),
            _ => Error::RootAccess {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// True for errors raised by invalid input before any traversal starts.
    pub fn is_config(&self) -> bool {
        !matches!(self, Error::Aborted { .. })
    }
}

/// A directory that could not be listed. Recovered locally: the directory is
/// treated as non-empty and traversal continues.
#[derive(Debug, thiserror::Error)]
#[error("cannot read {}: {source}", .path.display())]
pub struct AccessError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A per-path action failure, collected into the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}: {reason}", .path.display())]
pub struct ActionError {
    pub path: PathBuf,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn missing_root_is_not_found() {
        let err = Error::root(Path::new("/nope"), io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, Error::PathNotFound(ref p) if p == Path::new("/nope")));
        assert!(err.is_config());
    }

    #[test]
    fn denied_root_keeps_its_cause() {
        let err = Error::root(
            Path::new("/locked"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        match &err {
            Error::RootAccess { path, source } => {
                assert_eq!(path, Path::new("/locked"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.is_config());
        assert!(!err.to_string().contains("does not exist"));
    }
}
