//! Game state for the word-grid server.
//!
//! - `grid` - Square tile layout built from a flat tile sequence
//! - `search` - Word path search over a grid
//! - `session` - One game: token, clock, score
//! - `registry` - Shared store of live sessions
//! - `board` - Tile sources (client text, default, file, random)
//! - `dictionary` - Playable-word membership
//! - `config` - Tunables
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                           AppState                            │
//! │                                                               │
//! │  ┌──────────────────┐  ┌────────────┐  ┌──────────────────┐   │
//! │  │ SessionRegistry  │  │ Dictionary │  │    GameConfig    │   │
//! │  │                  │  │            │  │                  │   │
//! │  │ session_id →     │  │ word → ok? │  │ board_len        │   │
//! │  │   Session        │  │            │  │ max_duration     │   │
//! │  │     └─ Grid      │  │            │  │ search_mode      │   │
//! │  └──────────────────┘  └────────────┘  └──────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! A play runs: word charset check → session lookup → token → expiry →
//! dictionary → path search → score.

pub mod board;
pub mod config;
pub mod dictionary;
pub mod grid;
pub mod registry;
pub mod search;
pub mod session;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use board::{BoardError, BOARD_LEN, DEFAULT_BOARD};
pub use config::{GameConfig, MAX_DURATION};
pub use dictionary::{AcceptAll, Dictionary, WordList};
pub use grid::{Grid, GridError, Position, Tile, WILDCARD};
pub use registry::{RegistryError, SessionRegistry};
pub use search::{find_word, find_word_with, SearchMode, SearchResult};
pub use session::{PlayOutcome, Session, SessionError, SessionId, SessionSnapshot};

/// Create-game request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameRequest {
    /// Seconds the game stays playable
    pub duration: i64,
    /// Generate random tiles instead of using `board`
    pub random: bool,
    /// Board text; the default board is used when absent
    #[serde(default)]
    pub board: Option<String>,
}

/// Play-word request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayWordRequest {
    pub token: String,
    pub word: String,
}

/// Response to game creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedGame {
    pub id: SessionId,
    pub token: String,
    pub duration: u32,
    pub board: String,
}

/// Response to play and read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameState {
    pub id: SessionId,
    pub token: String,
    pub duration: u32,
    pub board: String,
    pub points: u32,
    pub time_left: u32,
}

impl From<SessionSnapshot> for CreatedGame {
    fn from(s: SessionSnapshot) -> Self {
        Self {
            id: s.id,
            token: s.token,
            duration: s.duration,
            board: s.board,
        }
    }
}

impl From<SessionSnapshot> for GameState {
    fn from(s: SessionSnapshot) -> Self {
        Self {
            id: s.id,
            token: s.token,
            duration: s.duration,
            board: s.board,
            points: s.score,
            time_left: s.time_left,
        }
    }
}

/// Request errors, one per failure condition of the public operations.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Duration must be between 1 and {max} seconds, got {got}")]
    InvalidDuration { got: i64, max: u32 },
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("Word {0:?} contains characters outside A-Z")]
    InvalidWord(String),
    #[error("Word {0:?} is not in the dictionary")]
    NotInDictionary(String),
    #[error("Game {0} not found")]
    NotFound(SessionId),
    #[error("Invalid token")]
    Unauthorized,
    #[error("Game has expired")]
    Expired,
}

impl RequestError {
    /// HTTP status for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidDuration { .. }
            | Self::Board(_)
            | Self::Grid(_)
            | Self::InvalidWord(_)
            | Self::NotInDictionary(_) => 400,
            Self::Unauthorized => 401,
            Self::NotFound(_) => 404,
            Self::Expired => 410,
        }
    }
}

impl From<SessionError> for RequestError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthorized => Self::Unauthorized,
            SessionError::Expired => Self::Expired,
        }
    }
}

impl From<RegistryError> for RequestError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::NotFound(id),
            RegistryError::Session(e) => e.into(),
        }
    }
}

/// Combined application state handed to every request handler.
///
/// Cheap to clone; clones share the same sessions.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    dictionary: Arc<dyn Dictionary>,
    config: GameConfig,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(dictionary: Arc<dyn Dictionary>, config: GameConfig) -> Self {
        info!(?config, "Creating app state");
        Self {
            sessions: SessionRegistry::new(),
            dictionary,
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Create a game from a request.
    #[instrument(skip(self))]
    pub fn create_game(&self, request: &CreateGameRequest) -> Result<CreatedGame, RequestError> {
        let duration = self.validate_duration(request.duration)?;

        let tiles = if request.random {
            board::random_tiles(self.config.board_len, &mut rand::thread_rng())
        } else {
            let raw = request
                .board
                .as_deref()
                .unwrap_or(&self.config.default_board);
            let tiles = board::sanitize(raw);
            board::validate_length(&tiles, self.config.board_len).inspect_err(|e| {
                warn!(error = %e, "Rejected board");
            })?;
            tiles
        };

        let grid = Grid::parse(&tiles)?;
        Ok(self.sessions.create(grid, duration).into())
    }

    fn validate_duration(&self, duration: i64) -> Result<u32, RequestError> {
        let max = self.config.max_duration;
        u32::try_from(duration)
            .ok()
            .filter(|d| (1..=max).contains(d))
            .ok_or(RequestError::InvalidDuration { got: duration, max })
    }

    /// Play a word now.
    pub fn play_word(
        &self,
        id: SessionId,
        request: &PlayWordRequest,
    ) -> Result<GameState, RequestError> {
        self.play_word_at(id, request, Utc::now())
    }

    #[instrument(skip(self, request), fields(word = %request.word))]
    pub fn play_word_at(
        &self,
        id: SessionId,
        request: &PlayWordRequest,
        now: DateTime<Utc>,
    ) -> Result<GameState, RequestError> {
        let word = request.word.as_str();
        if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
            debug!("Rejected word characters");
            return Err(RequestError::InvalidWord(request.word.clone()));
        }

        let mode = self.config.search_mode;
        let dictionary = &self.dictionary;
        self.sessions.with_session_mut(id, |session| -> Result<GameState, RequestError> {
            session.check_playable_at(&request.token, now)?;
            if !dictionary.contains(word) {
                debug!(session_id = id, "Word not in dictionary");
                return Err(RequestError::NotInDictionary(request.word.clone()));
            }
            let outcome = session.play_at(&request.token, word, mode, now)?;
            Ok(outcome.snapshot.into())
        })?
    }

    /// Read a game now.
    pub fn get_game(&self, id: SessionId) -> Result<GameState, RequestError> {
        self.get_game_at(id, Utc::now())
    }

    pub fn get_game_at(&self, id: SessionId, now: DateTime<Utc>) -> Result<GameState, RequestError> {
        Ok(self.sessions.get_at(id, now)?.into())
    }

    /// End a game, removing it for good.
    pub fn end_game(&self, id: SessionId) -> Result<(), RequestError> {
        Ok(self.sessions.remove(id)?)
    }

    /// Remove games expired for longer than `grace`.
    pub fn cleanup(&self, grace: TimeDelta) -> Vec<SessionId> {
        self.sessions.cleanup_expired(grace, Utc::now())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Arc::new(AcceptAll), GameConfig::default())
    }
}
