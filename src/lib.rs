//! Word-grid game state.
//!
//! Core of a multiplayer word-finding game server: clients create a lettered
//! grid session, then submit words that must be traced through adjacent
//! tiles.
//!
//! # Overview
//!
//! - **Grid** - Square tile layout built from a flat tile sequence, with
//!   `*` wildcard tiles.
//!
//! - **Path Search** - Traces a word through 8-directionally adjacent,
//!   unused tiles. Greedy by default, exhaustive on request.
//!
//! - **Sessions** - One game each: token, clock, score. Expired sessions
//!   stay readable but refuse play.
//!
//! - **Registry** - Thread-safe store of live sessions keyed by id.
//!
//! # Design Principles
//!
//! 1. **No networking** - This crate is pure state, no HTTP.
//!
//! 2. **Explicit envelopes** - Each public operation has typed request and
//!    response structs, ready for JSON.
//!
//! 3. **One handle, many handlers** - [`AppState`] is cloned into every
//!    request handler; clones share sessions.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wordgrid_state::{AppState, CreateGameRequest, GameConfig, PlayWordRequest, WordList};
//!
//! let words = WordList::from_words(["tea", "tap"]);
//! let app = AppState::new(Arc::new(words), GameConfig::default());
//!
//! let game = app
//!     .create_game(&CreateGameRequest { duration: 60, random: false, board: None })
//!     .unwrap();
//! assert_eq!(game.board, "T, A, P, *, E, A, K, S, O, B, R, S, S, *, X, D");
//!
//! let state = app
//!     .play_word(game.id, &PlayWordRequest { token: game.token.clone(), word: "tea".into() })
//!     .unwrap();
//! assert_eq!(state.points, 3);
//! ```

pub mod state;
pub mod telemetry;

pub use state::*;
