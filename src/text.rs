//! Tokenization and stop-word filtering.
//!
//! The sketching core only sees token sequences. This module turns raw text into those
//! tokens with a stop-word policy passed in as configuration rather than process-wide state.

use std::collections::HashSet;

/// Stop-word policy: an explicit word list plus a minimum token length.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopWords {
    /// Words always dropped, stored lowercase.
    pub words: HashSet<String>,
    /// Tokens with fewer chars than this are dropped.
    pub min_len: usize,
}

impl Default for StopWords {
    fn default() -> Self {
        Self {
            words: HashSet::from(["the".to_string()]),
            min_len: 3,
        }
    }
}

impl StopWords {
    /// A policy that keeps every token.
    pub fn none() -> Self {
        Self {
            words: HashSet::new(),
            min_len: 0,
        }
    }

    /// Build a policy from a word list and a minimum length. Words are lowercased.
    pub fn new<I, S>(words: I, min_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(|w| w.into().to_lowercase()).collect(),
            min_len,
        }
    }

    /// True if `token` should be dropped.
    pub fn contains(&self, token: &str) -> bool {
        token.chars().count() < self.min_len || self.words.contains(token)
    }
}

/// Turns raw text into normalized tokens and decides which of them are stop words.
pub trait Tokenizer {
    /// Split raw text into normalized tokens, in order, stop words included.
    fn tokenize(&self, raw: &str) -> Vec<String>;

    /// True if `token` must not contribute to a signature.
    fn is_stop_word(&self, token: &str) -> bool;

    /// Tokens of `raw` with stop words removed.
    fn terms(&self, raw: &str) -> Vec<String> {
        self.tokenize(raw)
            .into_iter()
            .filter(|t| !self.is_stop_word(t))
            .collect()
    }
}

/// Whitespace tokenizer: strips `. , : ; '`, lowercases, splits on whitespace.
#[derive(Debug, Clone, Default)]
pub struct WordTokenizer {
    stop_words: StopWords,
}

impl WordTokenizer {
    /// Create a tokenizer with the given stop-word policy.
    pub fn new(stop_words: StopWords) -> Self {
        Self { stop_words }
    }

    /// The stop-word policy in use.
    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, raw: &str) -> Vec<String> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, '.' | ',' | ':' | ';' | '\''))
            .collect::<String>()
            .to_lowercase();
        cleaned.split_whitespace().map(str::to_string).collect()
    }

    fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }
}
