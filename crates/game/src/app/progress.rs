use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::write_text_atomic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const PROGRESS_VERSION: u32 = 1;
const PROGRESS_FILE: &str = "progress.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StageRecord {
    pub cleared: bool,
    pub best_rescued: u32,
    pub total_targets: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Progress {
    pub version: u32,
    pub stages: BTreeMap<u32, StageRecord>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            version: PROGRESS_VERSION,
            stages: BTreeMap::new(),
        }
    }
}

/// What a finished stage reports back for saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StageOutcome {
    pub stage_no: u32,
    pub rescued: u32,
    pub total: u32,
}

#[derive(Debug, Error)]
pub(crate) enum ProgressError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("unsupported progress version {actual}, expected {expected}")]
    Version { expected: u32, actual: u32 },
    #[error("failed to encode progress: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub(crate) fn progress_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(PROGRESS_FILE)
}

impl Progress {
    pub(crate) fn record(&self, stage_no: u32) -> StageRecord {
        self.stages.get(&stage_no).copied().unwrap_or_default()
    }

    pub(crate) fn apply(&mut self, outcome: StageOutcome) {
        let record = self.stages.entry(outcome.stage_no).or_default();
        record.cleared = true;
        record.best_rescued = record.best_rescued.max(outcome.rescued);
        record.total_targets = outcome.total;
    }

    /// A missing file is empty progress.
    pub(crate) fn load(path: &Path) -> Result<Self, ProgressError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ProgressError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let progress = parse_progress_json(&raw).map_err(|message| ProgressError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        if progress.version != PROGRESS_VERSION {
            return Err(ProgressError::Version {
                expected: PROGRESS_VERSION,
                actual: progress.version,
            });
        }
        Ok(progress)
    }

    pub(crate) fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(progress) => progress,
            Err(error) => {
                warn!(error = %error, "progress_load_failed_using_empty");
                Self::default()
            }
        }
    }

    pub(crate) fn save(&self, path: &Path) -> Result<(), ProgressError> {
        let json = serde_json::to_string_pretty(self).map_err(ProgressError::Encode)?;
        write_text_atomic(path, &json).map_err(|source| ProgressError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_progress_json(raw: &str) -> Result<Progress, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, Progress>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        if path.is_empty() || path == "." {
            format!("{source}")
        } else {
            format!("at {path}: {source}")
        }
    })
}

/// Folds a cleared stage into the saved progress. Failures are logged, not fatal.
pub(crate) fn record_stage_outcome(cache_dir: &Path, outcome: StageOutcome) {
    let path = progress_path(cache_dir);
    let mut progress = Progress::load_or_default(&path);
    progress.apply(outcome);
    match progress.save(&path) {
        Ok(()) => info!(
            stage = outcome.stage_no,
            rescued = outcome.rescued,
            total = outcome.total,
            "progress_saved"
        ),
        Err(error) => warn!(error = %error, "progress_save_failed"),
    }
}
