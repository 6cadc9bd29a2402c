// File: src/error.rs
use thiserror::Error;

/// Failures of the persistent key-value store.
///
/// None of these ever reach callers of the progress stores: reads fall back to
/// defaults and writes are logged and reported as "not persisted".
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("quota exceeded writing '{key}': {needed} bytes needed, limit {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
}

/// Failures loading or validating a [`crate::config::ProgressConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("location '{location}' requires unknown location '{prerequisite}'")]
    UnknownPrerequisite {
        location: String,
        prerequisite: String,
    },

    #[error("location '{0}' appears in more than one journey")]
    DuplicateLocation(String),
}
