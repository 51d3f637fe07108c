//! Game session state.
//!
//! A session owns one grid, an access token, a clock and a score. Its
//! condition is derived rather than stored:
//!
//! ```text
//! ┌─────────┐  create   ┌──────────┐  now - started_at > duration  ┌─────────┐
//! │ (none)  │──────────▶│ Playable │──────────────────────────────▶│ Expired │
//! └─────────┘           └────┬─────┘                               └────┬────┘
//!                            │ remove                                   │ remove
//!                            ▼                                          ▼
//!                       ┌─────────────────────────────────────────────────┐
//!                       │ Ended (gone from the registry)                  │
//!                       └─────────────────────────────────────────────────┘
//! ```
//!
//! Expired sessions stay readable and keep their final score; only scoring
//! is refused.

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::grid::Grid;
use super::search::{self, SearchMode, SearchResult};

/// Session identifier.
pub type SessionId = u64;

/// Random bytes per access token (hex encoded to twice as many chars).
pub const TOKEN_BYTES: usize = 16;

/// Session operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Token does not match this session")]
    Unauthorized,
    #[error("Session has expired")]
    Expired,
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub token: String,
    pub duration: u32,
    pub board: String,
    pub score: u32,
    pub time_left: u32,
}

/// Result of an accepted play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub search: SearchResult,
    pub snapshot: SessionSnapshot,
}

/// One game instance.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    token: String,
    grid: Grid,
    /// Playable window in seconds
    duration: u32,
    started_at: DateTime<Utc>,
    score: u32,
    /// Words that traced successfully, uppercase, in play order
    words_played: Vec<String>,
}

impl Session {
    /// Create a session starting now with a fresh token.
    pub fn new(id: SessionId, grid: Grid, duration: u32) -> Self {
        Self::with_start(id, grid, duration, Utc::now())
    }

    /// Create a session with an explicit start time.
    pub fn with_start(id: SessionId, grid: Grid, duration: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            token: generate_token(),
            grid,
            duration,
            started_at,
            score: 0,
            words_played: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn words_played(&self) -> &[String] {
        &self.words_played
    }

    /// Seconds elapsed since start, as of `now`.
    fn elapsed_at(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.started_at
    }

    /// Check if play is still accepted at `now`.
    pub fn is_playable_at(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_at(now) <= TimeDelta::seconds(i64::from(self.duration))
    }

    pub fn is_playable(&self) -> bool {
        self.is_playable_at(Utc::now())
    }

    /// Check if the session expired before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_playable_at(now)
    }

    /// Whole seconds left in the playable window, computed live.
    pub fn time_left_at(&self, now: DateTime<Utc>) -> u32 {
        let duration = i64::from(self.duration);
        let left = duration.saturating_sub(self.elapsed_at(now).num_seconds());
        // A start in the future never reports more than the full window.
        u32::try_from(left.clamp(0, duration)).unwrap_or(0)
    }

    pub fn time_left(&self) -> u32 {
        self.time_left_at(Utc::now())
    }

    /// Constant-time token comparison.
    pub fn authenticate(&self, token: &str) -> bool {
        let expected = self.token.as_bytes();
        let given = token.as_bytes();
        if expected.len() != given.len() {
            return false;
        }
        expected
            .iter()
            .zip(given)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Check token and clock without mutating.
    pub fn check_playable_at(&self, token: &str, now: DateTime<Utc>) -> Result<(), SessionError> {
        if !self.authenticate(token) {
            warn!(session_id = self.id, "Token mismatch");
            return Err(SessionError::Unauthorized);
        }
        if self.is_expired_at(now) {
            debug!(session_id = self.id, "Play after expiry");
            return Err(SessionError::Expired);
        }
        Ok(())
    }

    /// Play a word now.
    pub fn play(
        &mut self,
        token: &str,
        word: &str,
        mode: SearchMode,
    ) -> Result<PlayOutcome, SessionError> {
        self.play_at(token, word, mode, Utc::now())
    }

    /// Play a word as of `now`: authenticate, check expiry, search, score.
    pub fn play_at(
        &mut self,
        token: &str,
        word: &str,
        mode: SearchMode,
        now: DateTime<Utc>,
    ) -> Result<PlayOutcome, SessionError> {
        self.check_playable_at(token, now)?;

        let search = search::find_word_with(&self.grid, word, mode);
        let points = search.points();
        self.score = self.score.saturating_add(points);
        if search.found {
            self.words_played.push(word.to_ascii_uppercase());
        }

        info!(
            session_id = self.id,
            word,
            found = search.found,
            points,
            score = self.score,
            "Word played"
        );

        Ok(PlayOutcome {
            search,
            snapshot: self.snapshot_at(now),
        })
    }

    /// Snapshot as of `now`.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            token: self.token.clone(),
            duration: self.duration,
            board: self.grid.to_display_string(),
            score: self.score,
            time_left: self.time_left_at(now),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_at(Utc::now())
    }

    /// Convert full session state to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let now = Utc::now();
        serde_json::json!({
            "id": self.id,
            "token": self.token,
            "duration": self.duration,
            "board": self.grid.to_display_string(),
            "grid": self.grid.to_json(),
            "score": self.score,
            "time_left": self.time_left_at(now),
            "expired": self.is_expired_at(now),
            "words_played": self.words_played,
            "started_at": self.started_at.to_rfc3339()
        })
    }
}

/// Unguessable hex token.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
