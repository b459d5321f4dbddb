//! Duplicate detection for new issue titles.
//!
//! Flags existing issues whose titles share enough significant words with a
//! candidate title. This is a review aid, not a uniqueness guarantee: false
//! positives and false negatives are expected.

use crate::config::DuplicatesConfig;
use crate::domain::Issue;
use crate::text::{shared_word_count, StopWords};
use tracing::debug;

/// Default number of shared significant words that marks two titles as similar.
pub const DEFAULT_MIN_SHARED_WORDS: usize = 2;

/// Lexical-overlap duplicate detector.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    stop_words: StopWords,
    min_shared_words: usize,
}

impl DuplicateDetector {
    pub fn new(stop_words: StopWords, min_shared_words: usize) -> Self {
        Self {
            stop_words,
            min_shared_words: min_shared_words.max(1),
        }
    }

    /// Build a detector from the `[duplicates]` config section.
    pub fn from_config(config: &DuplicatesConfig) -> Self {
        Self::new(
            StopWords::with_extra(config.extra_stop_words()),
            config.min_shared_words(),
        )
    }

    pub fn min_shared_words(&self) -> usize {
        self.min_shared_words
    }

    /// Return every known issue whose title looks like `candidate_title`,
    /// in the order the issues were given.
    pub fn find_similar<'a>(&self, candidate_title: &str, known: &'a [Issue]) -> Vec<&'a Issue> {
        let candidate = self.stop_words.significant_words(candidate_title);
        if candidate.is_empty() {
            return Vec::new();
        }

        let matches: Vec<&Issue> = known
            .iter()
            .filter(|issue| {
                let words = self.stop_words.significant_words(&issue.title);
                shared_word_count(&candidate, &words) >= self.min_shared_words
            })
            .collect();

        debug!(
            candidate = candidate_title,
            known = known.len(),
            matches = matches.len(),
            "duplicate check"
        );
        matches
    }

    /// Whether any known issue is similar to `candidate_title`.
    pub fn has_similar(&self, candidate_title: &str, known: &[Issue]) -> bool {
        !self.find_similar(candidate_title, known).is_empty()
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(StopWords::builtin(), DEFAULT_MIN_SHARED_WORDS)
    }
}
