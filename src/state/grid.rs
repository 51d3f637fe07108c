//! Letter grid layout.
//!
//! A grid is a square of tiles built from a flat, row-major tile sequence.
//! It is immutable once built; path search works on a scratch buffer.

use std::fmt;

use thiserror::Error;

/// Symbol used for wildcard tiles.
pub const WILDCARD: char = '*';

/// Neighbour offsets in search order: N, S, E, W, NE, NW, SE, SW.
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, 1),
    (0, -1),
    (-1, 1),
    (-1, -1),
    (1, 1),
    (1, -1),
];

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    /// An uppercase letter `A..=Z`
    Letter(char),
    /// Matches any letter
    Wildcard,
}

impl Tile {
    /// Parse a tile, normalising letters to uppercase.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            WILDCARD => Some(Self::Wildcard),
            c if c.is_ascii_alphabetic() => Some(Self::Letter(c.to_ascii_uppercase())),
            _ => None,
        }
    }

    /// Check if this tile can stand for `letter` (already uppercase).
    pub fn matches(&self, letter: char) -> bool {
        match self {
            Self::Wildcard => true,
            Self::Letter(l) => *l == letter,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Self::Wildcard => WILDCARD,
            Self::Letter(l) => *l,
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Check if position is within a grid of the given side.
    pub fn is_within(&self, side: usize) -> bool {
        self.row < side && self.col < side
    }

    /// Check if two positions are adjacent (including diagonals).
    pub fn is_adjacent_to(&self, other: &Position) -> bool {
        let row_diff = self.row.abs_diff(other.row);
        let col_diff = self.col.abs_diff(other.col);
        row_diff <= 1 && col_diff <= 1 && (row_diff != 0 || col_diff != 0)
    }

    /// In-bounds neighbours, in [`NEIGHBOR_OFFSETS`] order.
    pub fn neighbors(self, side: usize) -> impl Iterator<Item = Position> {
        NEIGHBOR_OFFSETS.into_iter().filter_map(move |(dr, dc)| {
            let row = self.row.checked_add_signed(dr)?;
            let col = self.col.checked_add_signed(dc)?;
            let pos = Position::new(row, col);
            pos.is_within(side).then_some(pos)
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({"row": self.row, "col": self.col})
    }
}

/// Grid construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Tile count {0} does not form a square grid")]
    NotSquare(usize),
    #[error("Invalid tile character {0:?}")]
    InvalidTile(char),
}

/// Square letter grid, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    side: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Build a grid from a flat tile sequence.
    pub fn build(tiles: &[char]) -> Result<Self, GridError> {
        let side = exact_side(tiles.len()).ok_or(GridError::NotSquare(tiles.len()))?;
        let tiles = tiles
            .iter()
            .map(|&c| Tile::from_char(c).ok_or(GridError::InvalidTile(c)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { side, tiles })
    }

    /// Build a grid from a string of tile characters.
    pub fn parse(tiles: &str) -> Result<Self, GridError> {
        let chars: Vec<char> = tiles.chars().collect();
        Self::build(&chars)
    }

    /// Side length (rows == columns).
    pub fn side(&self) -> usize {
        self.side
    }

    /// Total tile count.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tiles in row-major order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Rows of the 2D layout.
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.chunks(self.side)
    }

    /// Get tile at position.
    pub fn get(&self, pos: Position) -> Option<Tile> {
        if pos.is_within(self.side) {
            Some(self.tiles[self.index_of(pos)])
        } else {
            None
        }
    }

    /// Row-major index of an in-bounds position.
    pub fn index_of(&self, pos: Position) -> usize {
        pos.row * self.side + pos.col
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.tiles.len()).map(|i| Position::new(i / self.side, i % self.side))
    }

    /// Display form: `"T, A, P, *"`.
    pub fn to_display_string(&self) -> String {
        self.tiles
            .iter()
            .map(|t| t.as_char().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Convert grid to JSON rows.
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows()
            .map(|row| {
                let cells: Vec<serde_json::Value> = row
                    .iter()
                    .map(|t| serde_json::json!(t.as_char().to_string()))
                    .collect();
                serde_json::Value::Array(cells)
            })
            .collect();
        serde_json::Value::Array(rows)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

/// Side length if `n` is a non-zero perfect square.
fn exact_side(n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let mut side = (n as f64).sqrt() as usize;
    // Float rounding can land one off for large n.
    while side * side > n {
        side -= 1;
    }
    while (side + 1) * (side + 1) <= n {
        side += 1;
    }
    (side * side == n).then_some(side)
}
