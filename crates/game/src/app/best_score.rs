use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::storage::{read_text_if_exists, write_text_atomic};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::session::{format_elapsed, format_minutes_seconds};

pub const BEST_SCORE_FILE_NAME: &str = "best_score.json";

#[derive(Debug, Error)]
pub enum BestScoreError {
    #[error("failed to access personal best at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("personal best at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BestScoreFile {
    best_ms: Option<u64>,
}

/// Longest attempt on this machine, kept in the data directory.
#[derive(Debug)]
pub struct PersonalBest {
    path: PathBuf,
    best_ms: Option<u64>,
}

impl PersonalBest {
    pub fn load(data_dir: &Path) -> Result<Self, BestScoreError> {
        let path = data_dir.join(BEST_SCORE_FILE_NAME);
        let text = read_text_if_exists(&path).map_err(|source| BestScoreError::Io {
            path: path.clone(),
            source,
        })?;
        let file = match text {
            Some(text) => serde_json::from_str::<BestScoreFile>(&text).map_err(|source| {
                BestScoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            None => BestScoreFile::default(),
        };
        Ok(Self {
            path,
            best_ms: file.best_ms,
        })
    }

    /// Starts empty at the usual location, for when the stored file is
    /// unreadable. The next improvement overwrites it.
    pub fn empty(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(BEST_SCORE_FILE_NAME),
            best_ms: None,
        }
    }

    pub fn best_ms(&self) -> Option<u64> {
        self.best_ms
    }

    /// Keeps the longer of the stored and given durations. Returns true when
    /// `elapsed` is a new record; the file is only written in that case.
    pub fn record(&mut self, elapsed: Duration) -> Result<bool, BestScoreError> {
        let elapsed_ms = elapsed.as_millis() as u64;
        if self.best_ms.is_some_and(|best| elapsed_ms <= best) {
            return Ok(false);
        }
        let file = BestScoreFile {
            best_ms: Some(elapsed_ms),
        };
        let text = serde_json::to_string_pretty(&file).map_err(|source| BestScoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_text_atomic(&self.path, &text).map_err(|source| BestScoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.best_ms = Some(elapsed_ms);
        Ok(true)
    }

    pub fn display(&self) -> String {
        match self.best_ms {
            Some(best_ms) => format_minutes_seconds(best_ms),
            None => "no record yet".to_string(),
        }
    }
}

/// Shareable one-liner for a finished attempt.
pub fn brag_line(elapsed: Duration) -> String {
    format!(
        "I stayed perfectly still for {}. Can you beat it?",
        format_elapsed(elapsed)
    )
}
