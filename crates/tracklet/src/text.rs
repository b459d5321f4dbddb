//! Title normalization shared by duplicate detection and intake.
//!
//! A title is reduced to its *significant words*: lowercased, split on
//! whitespace, stripped of non-alphanumeric characters, with stop words and
//! empty tokens dropped. Each word appears once, in first-seen order.

use std::collections::HashSet;

/// Words that never count towards title similarity.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "for", "is", "to", "of", "in", "on", "at", "by", "with",
    "from", "issue",
];

/// Stop-word list with optional additions from configuration.
#[derive(Debug, Clone)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// The built-in list only.
    pub fn builtin() -> Self {
        Self {
            words: STOP_WORDS.iter().map(|w| (*w).to_string()).collect(),
        }
    }

    /// The built-in list plus `extra`. Extra words are normalized the same way
    /// tokens are, so "The" and "the," both become "the".
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stop_words = Self::builtin();
        for word in extra {
            let token = normalize_token(word.as_ref());
            if !token.is_empty() {
                stop_words.words.insert(token);
            }
        }
        stop_words
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Reduce `text` to its significant words.
    pub fn significant_words(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        text.split_whitespace()
            .map(normalize_token)
            .filter(|token| !token.is_empty() && !self.contains(token))
            .filter(|token| seen.insert(token.clone()))
            .collect()
    }
}

impl Default for StopWords {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lowercase a token and drop everything that isn't a letter or digit.
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Significant words using the built-in stop-word list.
pub fn significant_words(text: &str) -> Vec<String> {
    StopWords::builtin().significant_words(text)
}

/// Number of distinct significant words two normalized word lists share.
pub fn shared_word_count(a: &[String], b: &[String]) -> usize {
    a.iter().filter(|word| b.contains(word)).count()
}
