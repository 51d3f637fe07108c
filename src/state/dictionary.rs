//! Playable-word dictionaries.
//!
//! Membership only: whether a word may be played at all, independent of
//! whether it traces on a grid.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

/// Static word membership test.
pub trait Dictionary: Send + Sync {
    fn contains(&self, word: &str) -> bool;
}

/// Accepts every word.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Dictionary for AcceptAll {
    fn contains(&self, _word: &str) -> bool {
        true
    }
}

/// In-memory word list, stored uppercase.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_ascii_uppercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Parse whitespace-separated words. Lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Self {
        Self::from_words(
            text.lines()
                .filter(|line| !line.trim_start().starts_with('#'))
                .flat_map(str::split_whitespace),
        )
    }

    /// Load a word list file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn insert(&mut self, word: &str) {
        self.words.insert(word.to_ascii_uppercase());
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordList {
    fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_ascii_uppercase())
    }
}
