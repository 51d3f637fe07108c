//! Session registry.
//!
//! Process-wide store of live sessions keyed by id. The id counter and the
//! map share one lock; each session has its own lock so searches on
//! different sessions do not serialise on the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::grid::Grid;
use super::search::SearchMode;
use super::session::{PlayOutcome, Session, SessionError, SessionId, SessionSnapshot};

/// Registry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Session {0} not found")]
    NotFound(SessionId),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Last id handed out; ids start at 1
    last_id: SessionId,
    sessions: HashMap<SessionId, Arc<Mutex<Session>>>,
}

/// Shared handle to the live sessions. Clones refer to the same registry.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, id: SessionId) -> Result<Arc<Mutex<Session>>, RegistryError> {
        self.lock()
            .sessions
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    /// Create a session starting now.
    pub fn create(&self, grid: Grid, duration: u32) -> SessionSnapshot {
        self.create_at(grid, duration, Utc::now())
    }

    /// Create a session with an explicit start time.
    #[instrument(skip(self, grid), fields(side = grid.side()))]
    pub fn create_at(&self, grid: Grid, duration: u32, started_at: DateTime<Utc>) -> SessionSnapshot {
        let mut inner = self.lock();
        inner.last_id += 1;
        let id = inner.last_id;

        let session = Session::with_start(id, grid, duration, started_at);
        let snapshot = session.snapshot_at(started_at);
        inner.sessions.insert(id, Arc::new(Mutex::new(session)));

        info!(session_id = id, duration, live = inner.sessions.len(), "Session created");
        snapshot
    }

    /// Look up a session.
    pub fn get(&self, id: SessionId) -> Result<SessionSnapshot, RegistryError> {
        self.get_at(id, Utc::now())
    }

    pub fn get_at(&self, id: SessionId, now: DateTime<Utc>) -> Result<SessionSnapshot, RegistryError> {
        self.with_session(id, |session| session.snapshot_at(now))
    }

    /// Check if a session exists.
    pub fn contains(&self, id: SessionId) -> bool {
        self.lock().sessions.contains_key(&id)
    }

    /// Delete a session. Absent ids are reported as `NotFound`.
    #[instrument(skip(self))]
    pub fn remove(&self, id: SessionId) -> Result<(), RegistryError> {
        match self.lock().sessions.remove(&id) {
            Some(_) => {
                info!(session_id = id, "Session removed");
                Ok(())
            }
            None => {
                debug!(session_id = id, "Remove of unknown session");
                Err(RegistryError::NotFound(id))
            }
        }
    }

    /// Play a word on a session now.
    pub fn play(
        &self,
        id: SessionId,
        token: &str,
        word: &str,
        mode: SearchMode,
    ) -> Result<PlayOutcome, RegistryError> {
        self.play_at(id, token, word, mode, Utc::now())
    }

    #[instrument(skip(self, token))]
    pub fn play_at(
        &self,
        id: SessionId,
        token: &str,
        word: &str,
        mode: SearchMode,
        now: DateTime<Utc>,
    ) -> Result<PlayOutcome, RegistryError> {
        self.with_session_mut(id, |session| session.play_at(token, word, mode, now))?
            .map_err(RegistryError::from)
    }

    /// Run `f` with shared access to a session.
    pub fn with_session<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&Session) -> R,
    ) -> Result<R, RegistryError> {
        let entry = self.entry(id)?;
        let session = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&session))
    }

    /// Run `f` with exclusive access to a session. Concurrent callers on the
    /// same id are serialised; the registry lock is not held meanwhile.
    pub fn with_session_mut<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, RegistryError> {
        let entry = self.entry(id)?;
        let mut session = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut session))
    }

    /// Remove sessions expired for longer than `grace`. Returns removed ids.
    ///
    /// Never called implicitly: expiry alone does not end a session. The
    /// registry lock is released while each session is inspected.
    pub fn cleanup_expired(&self, grace: TimeDelta, now: DateTime<Utc>) -> Vec<SessionId> {
        // A cutoff before the representable range means nothing is that old.
        let Some(cutoff) = now.checked_sub_signed(grace) else {
            return Vec::new();
        };

        let entries: Vec<(SessionId, Arc<Mutex<Session>>)> = self
            .lock()
            .sessions
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(entry)))
            .collect();

        let mut expired: Vec<SessionId> = entries
            .into_iter()
            .filter(|(_, entry)| {
                let session = entry.lock().unwrap_or_else(PoisonError::into_inner);
                session.is_expired_at(cutoff)
            })
            .map(|(id, _)| id)
            .collect();
        expired.sort_unstable();

        let mut inner = self.lock();
        // Ids are never reused, so anything still present is the entry inspected.
        expired.retain(|id| inner.sessions.remove(id).is_some());
        drop(inner);

        if !expired.is_empty() {
            warn!(count = expired.len(), "Removed expired sessions");
        }

        expired
    }

    /// Live session ids, ascending.
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.lock().sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Count live sessions.
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;
    use std::thread;

    fn make_grid() -> Grid {
        Grid::parse("TAP*EAKSOBRSS*XD").unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let registry = SessionRegistry::new();
        let created = registry.create(make_grid(), 60);

        assert_eq!(created.score, 0);
        assert_eq!(registry.len(), 1);
        let fetched = registry.get(created.id).unwrap();
        assert_eq!(fetched.token, created.token);
        assert_eq!(fetched.board, created.board);
    }

    #[test]
    fn test_ids_strictly_increase() {
        let registry = SessionRegistry::new();
        let first = registry.create(make_grid(), 60);
        let second = registry.create(make_grid(), 60);
        assert_eq!(first.id, 1);
        assert!(second.id > first.id);
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let registry = SessionRegistry::new();
        let first = registry.create(make_grid(), 60);
        registry.remove(first.id).unwrap();
        let second = registry.create(make_grid(), 60);
        assert!(second.id > first.id);
    }

    #[test]
    fn test_remove() {
        let registry = SessionRegistry::new();
        let created = registry.create(make_grid(), 60);

        registry.remove(created.id).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.get(created.id), Err(RegistryError::NotFound(created.id)));
        assert_eq!(registry.remove(created.id), Err(RegistryError::NotFound(created.id)));
    }

    #[test]
    fn test_play_unknown_session() {
        let registry = SessionRegistry::new();
        let created = registry.create(make_grid(), 60);
        let result = registry.play(99, &created.token, "TEA", SearchMode::Greedy);
        assert_eq!(result, Err(RegistryError::NotFound(99)));
    }

    #[test]
    fn test_play_errors_are_distinct() {
        let registry = SessionRegistry::new();
        let start = Utc::now();
        let created = registry.create_at(make_grid(), 5, start);

        let result = registry.play(created.id, "bad", "TEA", SearchMode::Greedy);
        assert_eq!(result, Err(RegistryError::Session(SessionError::Unauthorized)));

        let late = start + TimeDelta::seconds(6);
        let result = registry.play_at(created.id, &created.token, "TEA", SearchMode::Greedy, late);
        assert_eq!(result, Err(RegistryError::Session(SessionError::Expired)));

        // Expired sessions are still readable
        assert_eq!(registry.get_at(created.id, late).unwrap().score, 0);
    }

    #[test]
    fn test_play_updates_score() {
        let registry = SessionRegistry::new();
        let created = registry.create(make_grid(), 60);

        let outcome = registry
            .play(created.id, &created.token, "TEA", SearchMode::Greedy)
            .unwrap();
        assert_eq!(outcome.snapshot.score, 3);
        assert_eq!(registry.get(created.id).unwrap().score, 3);
    }

    #[test]
    fn test_get_idempotent() {
        let registry = SessionRegistry::new();
        let start = Utc::now();
        let created = registry.create_at(make_grid(), 60, start);
        let now = start + TimeDelta::seconds(3);
        assert_eq!(
            registry.get_at(created.id, now).unwrap(),
            registry.get_at(created.id, now).unwrap()
        );
    }

    #[test]
    fn test_concurrent_create_unique_ids() {
        let registry = SessionRegistry::new();
        let mut ids: Vec<SessionId> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = registry.clone();
                    s.spawn(move || {
                        (0..25)
                            .map(|_| registry.create(make_grid(), 60).id)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 200);
        assert_eq!(registry.len(), 200);
    }

    #[test]
    fn test_concurrent_plays_all_counted() {
        let registry = SessionRegistry::new();
        let created = registry.create(make_grid(), 600);

        thread::scope(|s| {
            for _ in 0..8 {
                let registry = registry.clone();
                let token = created.token.clone();
                s.spawn(move || {
                    for _ in 0..50 {
                        registry
                            .play(created.id, &token, "TEA", SearchMode::Greedy)
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(registry.get(created.id).unwrap().score, 8 * 50 * 3);
    }

    #[test]
    fn test_cleanup_expired() {
        let registry = SessionRegistry::new();
        let now = Utc::now();
        let old = registry.create_at(make_grid(), 10, now - TimeDelta::seconds(100));
        let fresh = registry.create_at(make_grid(), 10, now);

        let removed = registry.cleanup_expired(TimeDelta::seconds(30), now);
        assert_eq!(removed, vec![old.id]);
        assert_eq!(registry.ids(), vec![fresh.id]);
        assert!(!registry.contains(old.id));
    }

    #[test]
    fn test_cleanup_expired_huge_grace() {
        let registry = SessionRegistry::new();
        let now = Utc::now();
        let live = registry.create_at(make_grid(), 10, now - TimeDelta::seconds(100));

        assert!(registry.cleanup_expired(TimeDelta::MAX, now).is_empty());
        assert_eq!(registry.ids(), vec![live.id]);

        // Lock still usable afterwards
        assert_eq!(registry.get(live.id).unwrap().id, live.id);
        registry.create(make_grid(), 10);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_cleanup_does_not_hold_registry_during_play() {
        let registry = SessionRegistry::new();
        let now = Utc::now();
        let busy = registry.create_at(make_grid(), 10, now - TimeDelta::seconds(100));
        let (locked_tx, locked_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        thread::scope(|s| {
            let holder = registry.clone();
            s.spawn(move || {
                holder
                    .with_session_mut(busy.id, |_| {
                        locked_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                    })
                    .unwrap();
            });
            locked_rx.recv().unwrap();

            let sweeper = registry.clone();
            let sweep = s.spawn(move || sweeper.cleanup_expired(TimeDelta::zero(), now));

            // The sweep is parked on the busy session, but the registry is free.
            let created = registry.create(make_grid(), 60);
            assert!(registry.get(created.id).is_ok());

            release_tx.send(()).unwrap();
            assert_eq!(sweep.join().unwrap(), vec![busy.id]);
        });

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_play_racing_remove() {
        let registry = SessionRegistry::new();
        let created = registry.create(make_grid(), 600);
        let other = registry.create(make_grid(), 600);
        let (locked_tx, locked_rx) = mpsc::channel();
        let (removed_tx, removed_rx) = mpsc::channel::<()>();

        let in_flight = thread::scope(|s| {
            let player = registry.clone();
            let token = created.token.clone();
            let play = s.spawn(move || {
                player
                    .with_session_mut(created.id, |session| {
                        locked_tx.send(()).unwrap();
                        removed_rx.recv().unwrap();
                        session.play(&token, "TEA", SearchMode::Greedy)
                    })
                    .unwrap()
            });

            locked_rx.recv().unwrap();
            registry.remove(created.id).unwrap();
            assert_eq!(registry.len(), 1);
            removed_tx.send(()).unwrap();

            play.join().unwrap()
        });

        // The play already holding the session completes on the detached copy.
        assert_eq!(in_flight.unwrap().snapshot.score, 3);

        assert_eq!(registry.get(created.id), Err(RegistryError::NotFound(created.id)));
        assert_eq!(
            registry.play(created.id, &created.token, "TEA", SearchMode::Greedy),
            Err(RegistryError::NotFound(created.id))
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ids(), vec![other.id]);
    }
}
