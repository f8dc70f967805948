//! Tokenizer for full-text indexes
//!
//! Text is split on a configurable delimiter, and additionally on `-` and
//! `_`. Each token is case-folded and stripped of punctuation. Tokens that
//! normalize to nothing are dropped.

use std::collections::HashSet;

/// Characters removed from tokens during normalization
pub const STOP_CHARS: &str = "\"'\\`[]{}(),./?:;*&^%$#@!=<>|~+";

/// Delimiter used when none is configured
pub const DEFAULT_DELIMITER: &str = " ";

/// Splits and normalizes text into index tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenizer {
    delimiter: String,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl Tokenizer {
    /// Tokenizer splitting on `delimiter`
    ///
    /// An empty delimiter splits on any whitespace.
    pub fn new(delimiter: impl Into<String>) -> Self {
        Tokenizer {
            delimiter: delimiter.into(),
        }
    }

    /// Configured delimiter
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Tokenize text into normalized terms, in order, with repeats
    ///
    /// # Example
    ///
    /// ```
    /// use strata_index::tokenizer::Tokenizer;
    ///
    /// let tokens = Tokenizer::default().tokenize("The Pixies, Live!");
    /// assert_eq!(tokens, vec!["the", "pixies", "live"]);
    /// ```
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let chunks: Vec<&str> = if self.delimiter.is_empty() {
            text.split_whitespace().collect()
        } else {
            text.split(self.delimiter.as_str()).collect()
        };
        chunks
            .into_iter()
            .flat_map(|chunk| chunk.split(|c: char| c == '-' || c == '_'))
            .map(normalize)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Tokenize and deduplicate, preserving first-seen order
    pub fn tokenize_unique(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tokenize(text)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }
}

/// Case-fold a token and strip punctuation and surrounding whitespace
pub fn normalize(token: &str) -> String {
    let folded: String = token
        .chars()
        .filter(|c| !STOP_CHARS.contains(*c))
        .flat_map(char::to_lowercase)
        .collect();
    folded.trim().to_string()
}
