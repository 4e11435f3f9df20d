//! Persisted state files for conduit
//!
//! A [`StateStore`] owns one YAML document on disk. Every mutation runs as
//! a scoped update: take an exclusive lock, read the current document,
//! mutate it in memory, then atomically replace the file. Readers never see
//! a partially written document.

pub mod lock;
pub mod store;

pub use lock::StateLock;
pub use store::{StateDocument, StateStore};

use std::path::PathBuf;

/// State store errors
#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("State file does not exist: {0:?}")]
    Missing(PathBuf),

    #[error("Invalid state in {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
