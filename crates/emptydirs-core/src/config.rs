use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// User configuration loaded from `<config dir>/emptydirs/config.toml`.
///
/// All fields have defaults so the config file is optional. Command line
/// flags take precedence over anything set here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default)]
    pub quiet: bool,
    /// Minimum number of seconds between two progress lines.
    #[serde(default = "default_progress_interval")]
    pub progress_interval_secs: u64,
}

fn default_batch_size() -> i64 {
    1000
}

fn default_progress_interval() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            quiet: false,
            progress_interval_secs: default_progress_interval(),
        }
    }
}

impl Config {
    /// Load the user config, or defaults if there is no config file.
    pub fn load() -> Result<Self, Error> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load an explicit config file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "emptydirs").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Validated settings for one run of the batch coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub batch_size: NonZeroUsize,
    /// Emit a progress event after every batch.
    pub report_progress: bool,
}

impl RunConfig {
    /// Fails with [`Error::InvalidBatchSize`] unless `batch_size >= 1`.
    pub fn new(batch_size: i64, report_progress: bool) -> Result<Self, Error> {
        let batch_size = usize::try_from(batch_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(Error::InvalidBatchSize(batch_size))?;
        Ok(Self {
            batch_size,
            report_progress,
        })
    }
}
