//! Game configuration.

use serde::{Deserialize, Serialize};

use super::board::{BOARD_LEN, DEFAULT_BOARD};
use super::search::SearchMode;

/// Longest accepted session duration, in seconds.
pub const MAX_DURATION: u32 = i32::MAX as u32;

/// Tunables for game creation and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Tiles a client-supplied board must have
    pub board_len: usize,
    /// Upper bound for `duration`, inclusive
    pub max_duration: u32,
    /// Board used when a request carries none
    pub default_board: String,
    pub search_mode: SearchMode,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_len: BOARD_LEN,
            max_duration: MAX_DURATION,
            default_board: DEFAULT_BOARD.to_string(),
            search_mode: SearchMode::Greedy,
        }
    }
}

impl GameConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = GameConfig::default();
        assert_eq!(config.board_len, 16);
        assert_eq!(config.default_board, "TAP*EAKSOBRSS*XD");
        assert_eq!(config.search_mode, SearchMode::Greedy);
    }

    #[test]
    fn test_partial_json() {
        let config = GameConfig::from_json_str(r#"{"search_mode": "exhaustive", "max_duration": 300}"#)
            .unwrap();
        assert_eq!(
            config,
            GameConfig {
                max_duration: 300,
                search_mode: SearchMode::Exhaustive,
                ..GameConfig::default()
            }
        );
    }

    #[test]
    fn test_bad_json() {
        assert!(GameConfig::from_json_str(r#"{"board_len": "four"}"#).is_err());
    }
}
