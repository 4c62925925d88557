//! Filesystem match-record source.
//!
//! Handles the input side of the pipeline:
//! - Strict JSONL reading of match records
//! - Grouping records by player
//! - Per-share-key memoisation of the raw input

mod cache;
mod jsonl;
mod source;

pub use cache::*;
pub use jsonl::*;
pub use source::*;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record on line {line} of {path:?}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Reader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("No match history for share key '{0}'")]
    NotFound(String),

    #[error("Invalid share key: {0:?}")]
    InvalidKey(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn matches_dir(&self) -> PathBuf {
        self.data_dir.join("matches")
    }

    /// Path of the JSONL file behind a share key.
    ///
    /// Keys are limited to ASCII letters, digits, '-' and '_' so they cannot
    /// escape the matches directory.
    pub fn match_file(&self, share_key: &str) -> Result<PathBuf, StorageError> {
        let valid = !share_key.is_empty()
            && share_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(share_key.to_string()));
        }
        Ok(self.matches_dir().join(format!("{}.jsonl", share_key)))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
