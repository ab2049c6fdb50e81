//! Word lookup error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or querying the vocabulary.
#[derive(Debug, Error)]
pub enum WordsError {
    /// No words are available (the list failed to load or was empty).
    #[error("Vocabulary is empty or failed to load")]
    EmptyVocabulary,

    /// The word list file could not be read.
    #[error("Failed to load word list from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WordsError {
    /// Create a load error for the given path.
    pub fn load(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }
}
