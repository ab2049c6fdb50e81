//! In-memory vocabulary with random and sub-word lookups.
//!
//! Every entry is stored together with its letter histogram so that sub-word
//! queries are a single linear scan with a 26-slot comparison per word.

use rand::Rng;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

use super::error::WordsError;

/// Word list compiled into the binary.
const BUILTIN_WORDS: &str = include_str!("../../../data/words.txt");

/// Letter histogram over `a..=z`.
type LetterCounts = [u8; 26];

#[derive(Debug, Clone)]
struct Entry {
    word: String,
    counts: LetterCounts,
}

/// An immutable set of lowercase ASCII words.
///
/// Built once at startup and shared behind an `Arc` by every tool call.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entries: Vec<Entry>,
}

impl Vocabulary {
    /// An empty vocabulary. Lookups report `EmptyVocabulary`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The word list embedded in the binary.
    pub fn builtin() -> Self {
        Self::from_words(BUILTIN_WORDS.lines())
    }

    /// Load a newline-separated word list from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, WordsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| WordsError::load(path, e))?;
        let vocabulary = Self::from_words(text.lines());
        info!(
            "Loaded {} words from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    /// Build a vocabulary from arbitrary words.
    ///
    /// Entries are trimmed and lowercased; anything that still contains a
    /// non-letter is dropped. The result is sorted and free of duplicates.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_ascii_lowercase())
            .filter(|w| !w.is_empty() && w.bytes().all(|b| b.is_ascii_lowercase()))
            .collect();

        let entries = unique
            .into_iter()
            .map(|word| Entry {
                counts: letter_counts(&word),
                word,
            })
            .collect();

        Self { entries }
    }

    /// Number of words loaded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `word` (case-insensitive) is part of the vocabulary.
    pub fn contains(&self, word: &str) -> bool {
        let word = word.to_ascii_lowercase();
        self.entries
            .binary_search_by(|e| e.word.as_str().cmp(word.as_str()))
            .is_ok()
    }

    /// Pick one word uniformly at random.
    pub fn random_word(&self) -> Result<&str, WordsError> {
        if self.entries.is_empty() {
            return Err(WordsError::EmptyVocabulary);
        }
        let index = rand::thread_rng().gen_range(0..self.entries.len());
        Ok(&self.entries[index].word)
    }

    /// Every vocabulary word that can be spelled from the letters of `input`.
    ///
    /// The input is case-folded and every character that is not an ASCII
    /// letter is stripped before comparison. Results are ordered longest
    /// first, then alphabetically.
    pub fn sub_words(&self, input: &str) -> Vec<String> {
        let normalized = normalize(input);
        if normalized.is_empty() {
            return Vec::new();
        }

        let available = letter_counts(&normalized);
        let mut matches: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.word.len() <= normalized.len() && dominated_by(&e.counts, &available))
            .map(|e| e.word.clone())
            .collect();

        matches.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        debug!("{} sub-words found for '{}'", matches.len(), normalized);
        matches
    }
}

/// Lowercase `input` and keep only ASCII letters.
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn letter_counts(word: &str) -> LetterCounts {
    let mut counts = [0u8; 26];
    for b in word.bytes().filter(u8::is_ascii_lowercase) {
        let slot = &mut counts[(b - b'a') as usize];
        *slot = slot.saturating_add(1);
    }
    counts
}

fn dominated_by(word: &LetterCounts, available: &LetterCounts) -> bool {
    word.iter().zip(available.iter()).all(|(w, a)| w <= a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Write;

    fn small() -> Vocabulary {
        Vocabulary::from_words([
            "listen", "silent", "enlist", "tinsel", "inlets", "list", "tin", "sit", "net", "ten",
            "lit", "stone", "notes", "a", "apple",
        ])
    }

    #[test]
    fn test_builtin_is_loaded() {
        let vocab = Vocabulary::builtin();
        assert!(vocab.len() > 500);
        assert!(vocab.contains("listen"));
    }

    #[test]
    fn test_from_words_normalizes_entries() {
        let vocab = Vocabulary::from_words(["  Apple ", "apple", "don't", "", "x-ray", "Zone"]);
        assert_eq!(vocab.len(), 2);
        assert!(vocab.contains("apple"));
        assert!(vocab.contains("ZONE"));
        assert!(!vocab.contains("don't"));
    }

    #[test]
    fn test_sub_words_contains_itself() {
        let vocab = small();
        for entry in &vocab.entries {
            let result = vocab.sub_words(&entry.word);
            assert!(
                result.contains(&entry.word),
                "{} missing from its own sub-words",
                entry.word
            );
        }
    }

    #[test]
    fn test_sub_words_are_letter_subsets() {
        let vocab = Vocabulary::builtin();
        for input in ["listen", "mississippi", "strength", "aeiou", "tooth"] {
            let available = letter_counts(&normalize(input));
            for word in vocab.sub_words(input) {
                assert!(
                    dominated_by(&letter_counts(&word), &available),
                    "{word} is not a sub-word of {input}"
                );
            }
        }
    }

    #[test]
    fn test_sub_words_respects_multiplicity() {
        let vocab = Vocabulary::from_words(["too", "to", "toot"]);
        assert_eq!(vocab.sub_words("to"), vec!["to"]);
        assert_eq!(vocab.sub_words("toot"), vec!["toot", "too", "to"]);
    }

    #[test]
    fn test_sub_words_empty_input() {
        let vocab = small();
        assert!(vocab.sub_words("").is_empty());
        assert!(vocab.sub_words("123 !?").is_empty());
    }

    #[test]
    fn test_sub_words_normalization_policy() {
        let vocab = small();
        let plain = vocab.sub_words("listen");
        assert_eq!(vocab.sub_words("LiStEn"), plain);
        assert_eq!(vocab.sub_words("l-i s.t'e n42"), plain);
    }

    #[test]
    fn test_sub_words_ordering_and_no_duplicates() {
        let vocab = small();
        let result = vocab.sub_words("silent");
        assert_eq!(
            &result[..5],
            &["enlist", "inlets", "listen", "silent", "tinsel"]
        );
        let unique: HashSet<_> = result.iter().collect();
        assert_eq!(unique.len(), result.len());
        assert!(!result.contains(&"stone".to_string()));
    }

    #[test]
    fn test_random_word_empty() {
        let vocab = Vocabulary::empty();
        assert!(matches!(
            vocab.random_word(),
            Err(WordsError::EmptyVocabulary)
        ));
    }

    #[test]
    fn test_random_word_visits_most_words() {
        let vocab = small();
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            seen.insert(vocab.random_word().unwrap().to_string());
        }
        // 15 words, 2000 draws: missing more than a couple is practically impossible
        assert!(seen.len() >= vocab.len() - 2, "only saw {}", seen.len());
        assert!(seen.iter().all(|w| vocab.contains(w)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Alpha\nbeta\n\ngamma").unwrap();
        let vocab = Vocabulary::from_path(file.path()).unwrap();
        assert_eq!(vocab.len(), 3);
        assert!(vocab.contains("alpha"));
    }

    #[test]
    fn test_from_path_missing() {
        let result = Vocabulary::from_path("/nonexistent/words.txt");
        assert!(matches!(result, Err(WordsError::Load { .. })));
    }
}
