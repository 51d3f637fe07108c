//! Word path search.
//!
//! Decides whether a word can be traced through 8-directionally adjacent
//! tiles without reusing a tile. Wildcard tiles match any letter.
//!
//! # Modes
//!
//! - [`SearchMode::Greedy`] commits to the first eligible neighbour at each
//!   step (in [`NEIGHBOR_OFFSETS`](super::grid::NEIGHBOR_OFFSETS) order) and
//!   never revisits sibling branches. It can miss words that some other
//!   path would trace. This is the default scoring behaviour.
//! - [`SearchMode::Exhaustive`] backtracks over every branch and finds a path
//!   whenever one exists.

use serde::{Deserialize, Serialize};

use super::grid::{Grid, Position};

/// Path search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// First-match traversal, no sibling retries
    #[default]
    Greedy,
    /// Full depth-first backtracking
    Exhaustive,
}

/// Outcome of a path search. Not finding a word is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchResult {
    pub found: bool,
    pub path_length: usize,
    /// Traced tiles, empty when not found
    pub path: Vec<Position>,
}

impl SearchResult {
    fn not_found() -> Self {
        Self::default()
    }

    fn traced(path: Vec<Position>) -> Self {
        Self {
            found: true,
            path_length: path.len(),
            path,
        }
    }

    /// Points awarded: one per letter on success.
    pub fn points(&self) -> u32 {
        if self.found {
            u32::try_from(self.path_length).unwrap_or(u32::MAX)
        } else {
            0
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let path: Vec<serde_json::Value> = self.path.iter().map(|p| p.to_json()).collect();
        serde_json::json!({
            "found": self.found,
            "path_length": self.path_length,
            "points": self.points(),
            "path": path
        })
    }
}

/// Search with the default (greedy) strategy.
pub fn find_word(grid: &Grid, word: &str) -> SearchResult {
    find_word_with(grid, word, SearchMode::default())
}

/// Search for `word` on `grid` using `mode`.
pub fn find_word_with(grid: &Grid, word: &str, mode: SearchMode) -> SearchResult {
    let letters: Vec<char> = word.chars().map(|c| c.to_ascii_uppercase()).collect();
    let Some(&first) = letters.first() else {
        return SearchResult::not_found();
    };

    let starts = grid
        .positions()
        .filter(|&pos| grid.get(pos).is_some_and(|t| t.matches(first)));

    for start in starts {
        // Fresh scratch buffer per start so marks never leak between attempts.
        let mut consumed = vec![false; grid.len()];
        let path = match mode {
            SearchMode::Greedy => trace_greedy(grid, &letters, start, &mut consumed),
            SearchMode::Exhaustive => {
                let mut path = vec![start];
                trace_exhaustive(grid, &letters, 1, start, &mut consumed, &mut path)
                    .then_some(path)
            }
        };
        if let Some(path) = path {
            return SearchResult::traced(path);
        }
    }

    SearchResult::not_found()
}

/// Eligible next step: in bounds, unused on this path, and matching `letter`.
fn is_eligible(grid: &Grid, consumed: &[bool], pos: Position, letter: char) -> bool {
    !consumed[grid.index_of(pos)] && grid.get(pos).is_some_and(|t| t.matches(letter))
}

fn trace_greedy(
    grid: &Grid,
    letters: &[char],
    start: Position,
    consumed: &mut [bool],
) -> Option<Vec<Position>> {
    let mut path = Vec::with_capacity(letters.len());
    path.push(start);
    let mut current = start;

    for &letter in &letters[1..] {
        consumed[grid.index_of(current)] = true;
        let next = current
            .neighbors(grid.side())
            .find(|&n| is_eligible(grid, consumed, n, letter))?;
        path.push(next);
        current = next;
    }

    Some(path)
}

fn trace_exhaustive(
    grid: &Grid,
    letters: &[char],
    index: usize,
    current: Position,
    consumed: &mut [bool],
    path: &mut Vec<Position>,
) -> bool {
    if index == letters.len() {
        return true;
    }

    consumed[grid.index_of(current)] = true;
    for next in current.neighbors(grid.side()) {
        if !is_eligible(grid, consumed, next, letters[index]) {
            continue;
        }
        path.push(next);
        if trace_exhaustive(grid, letters, index + 1, next, consumed, path) {
            return true;
        }
        path.pop();
    }
    consumed[grid.index_of(current)] = false;

    false
}
