//! Words domain module.
//!
//! Provides the vocabulary used by the `RandomWord` and `GetSubWords` tools.
//! The vocabulary is loaded once when the server starts and is read-only
//! afterwards, so it can be shared freely between concurrent tool calls.

mod error;
mod vocabulary;

pub use error::WordsError;
pub use vocabulary::{Vocabulary, normalize};

use tracing::{info, warn};

use crate::core::config::WordsConfig;

/// Load the vocabulary described by the configuration.
///
/// A missing or unreadable word list is not fatal: the server keeps running
/// with an empty vocabulary and the word tools report `EmptyVocabulary`.
pub fn load_vocabulary(config: &WordsConfig) -> Vocabulary {
    let vocabulary = match &config.wordlist_path {
        Some(path) => match Vocabulary::from_path(path) {
            Ok(v) => v,
            Err(e) => {
                warn!("{}", e);
                Vocabulary::empty()
            }
        },
        None => Vocabulary::builtin(),
    };

    if vocabulary.is_empty() {
        warn!("Vocabulary is empty - word tools will return errors");
    } else {
        info!("Vocabulary ready with {} words", vocabulary.len());
    }

    vocabulary
}
