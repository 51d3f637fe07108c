//! Board tile sources.
//!
//! Produces the flat tile sequence a [`Grid`](super::grid::Grid) is built
//! from: client-supplied text, the default board, a board file, or random
//! letters.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

use super::grid::WILDCARD;

/// Standard board tile count (4x4).
pub const BOARD_LEN: usize = 16;

/// Board used when a client supplies none.
pub const DEFAULT_BOARD: &str = "TAP*EAKSOBRSS*XD";

/// Board source errors.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Invalid board length {got} (expected {expected}) after removing characters outside [A-Za-z*]")]
    InvalidLength { got: usize, expected: usize },
    #[error("Failed to read board file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Check if `c` may appear on a board.
pub fn is_tile_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == WILDCARD
}

/// Strip every character outside `[A-Za-z*]`.
pub fn sanitize(board: &str) -> String {
    board.chars().filter(|&c| is_tile_char(c)).collect()
}

/// Require exactly `expected` tiles.
pub fn validate_length(tiles: &str, expected: usize) -> Result<(), BoardError> {
    let got = tiles.chars().count();
    if got != expected {
        return Err(BoardError::InvalidLength { got, expected });
    }
    Ok(())
}

/// `len` random uppercase letters.
pub fn random_tiles<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    (0..len)
        .map(|_| char::from(rng.gen_range(b'A'..=b'Z')))
        .collect()
}

/// Read and sanitise a board file.
pub fn load_board_file(path: impl AsRef<Path>) -> Result<String, BoardError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| BoardError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(sanitize(&contents))
}
