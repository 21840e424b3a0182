//! In-memory conversation store.
//!
//! A coarse [`std::sync::Mutex`] guards the id → session map and is only
//! held for map lookups. Each session sits behind its own
//! [`tokio::sync::Mutex`]; a request owns that lock for the whole turn, so
//! turns for different sessions never wait on each other and a second
//! concurrent request for a busy session is rejected with
//! [`SessionError::Busy`] rather than queued.
//!
//! Nothing is persisted: all sessions are lost when the process exits.

pub mod turn;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SessionError;

pub use turn::{ToolCallRecord, ToolCallStatus, Turn, TurnContent, TurnRole};

/// Longest accepted client-supplied session id.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// A conversation: an id plus its append-only turn history.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    turns: Vec<Turn>,
    last_active_at: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            turns: Vec::new(),
            last_active_at: Utc::now(),
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Turns in the order they were appended.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Appends a turn. Earlier turns are never modified.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.touch();
    }

    fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

/// Exclusive access to one session for the duration of a turn.
///
/// Dropping the lease releases the session.
pub type SessionLease = OwnedMutexGuard<Session>;

/// Process-wide map from session id to conversation.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Session>>>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<Session>>>> {
        // A panic while holding the map lock cannot leave the map half-updated.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the session with `id`, creating it if the id is unknown or
    /// absent. New sessions without a supplied id get a fresh UUID.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidId`] if `id` is malformed.
    /// - [`SessionError::Busy`] if another turn holds the session.
    pub fn get_or_create(&self, id: Option<&str>) -> Result<SessionLease, SessionError> {
        let id = match id {
            Some(id) => {
                validate_session_id(id)?;
                id.to_string()
            }
            None => Uuid::new_v4().to_string(),
        };

        let slot = {
            let mut map = self.map();
            Arc::clone(map.entry(id.clone()).or_insert_with(|| {
                info!(session_id = %id, "session created");
                Arc::new(tokio::sync::Mutex::new(Session::new(id.clone())))
            }))
        };

        let mut lease = slot
            .try_lock_owned()
            .map_err(|_| SessionError::Busy { id: id.clone() })?;
        lease.touch();
        debug!(session_id = %id, turns = lease.turns().len(), "session acquired");
        Ok(lease)
    }

    /// Appends `turn` to a held session.
    pub fn append(session: &mut Session, turn: Turn) {
        session.append(turn);
    }

    /// Drops the session with `id` and its history.
    ///
    /// A turn still running against it finishes on the detached copy; the
    /// next request with the same id starts from an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if no session has this id.
    pub fn reset(&self, id: &str) -> Result<(), SessionError> {
        if self.map().remove(id).is_some() {
            info!(session_id = %id, "session reset");
            Ok(())
        } else {
            Err(SessionError::NotFound { id: id.to_string() })
        }
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// Whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Removes sessions idle for longer than `ttl`. Sessions in the middle
    /// of a turn are kept. Returns the number removed.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let now = Utc::now();
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, slot| match slot.try_lock() {
            Ok(session) => now.signed_duration_since(session.last_active_at) < ttl,
            Err(_) => true,
        });
        let evicted = before - map.len();
        if evicted > 0 {
            info!(evicted, remaining = map.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Spawns a task that calls [`evict_idle`](Self::evict_idle) every
    /// `interval` until `shutdown` is cancelled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        ttl: Duration,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.evict_idle(ttl);
                    }
                }
            }
            debug!("session sweeper stopped");
        })
    }
}

/// Checks a client-supplied session id: 1 to 128 characters from
/// `[A-Za-z0-9_-]`.
///
/// # Errors
///
/// Returns [`SessionError::InvalidId`] describing the first violation.
pub fn validate_session_id(id: &str) -> Result<(), SessionError> {
    if id.is_empty() {
        return Err(SessionError::InvalidId {
            reason: "session id must not be empty".to_string(),
        });
    }
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(SessionError::InvalidId {
            reason: format!("session id exceeds {MAX_SESSION_ID_LEN} characters"),
        });
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SessionError::InvalidId {
            reason: "session id may only contain letters, digits, '-' and '_'".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_new_session_gets_uuid() {
        let store = SessionStore::new();
        let lease = store
            .get_or_create(None)
            .unwrap_or_else(|e| panic!("get_or_create: {e}"));
        assert!(Uuid::parse_str(lease.id()).is_ok());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_id_is_created_with_that_id() {
        let store = SessionStore::new();
        let lease = store
            .get_or_create(Some("tab-42"))
            .unwrap_or_else(|e| panic!("get_or_create: {e}"));
        assert_eq!(lease.id(), "tab-42");
    }

    #[test]
    fn test_resume_keeps_history() {
        let store = SessionStore::new();
        {
            let mut lease = store
                .get_or_create(Some("abc"))
                .unwrap_or_else(|e| panic!("{e}"));
            SessionStore::append(&mut lease, Turn::user("first"));
        }
        let mut lease = store
            .get_or_create(Some("abc"))
            .unwrap_or_else(|e| panic!("{e}"));
        SessionStore::append(&mut lease, Turn::user("second"));
        let texts: Vec<String> = lease.turns().iter().map(|t| t.content.as_text()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_same_session_concurrent_is_busy() {
        let store = SessionStore::new();
        let _held = store
            .get_or_create(Some("abc"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            store.get_or_create(Some("abc")).err(),
            Some(SessionError::Busy {
                id: "abc".to_string()
            })
        );
        assert!(store.get_or_create(Some("other")).is_ok());
    }

    #[test]
    fn test_reset_unknown_is_not_found() {
        let store = SessionStore::new();
        assert!(matches!(
            store.reset("nope"),
            Err(SessionError::NotFound { .. })
        ));
    }

    #[test]
    fn test_reset_clears_history() {
        let store = SessionStore::new();
        {
            let mut lease = store
                .get_or_create(Some("abc"))
                .unwrap_or_else(|e| panic!("{e}"));
            lease.append(Turn::user("hello"));
        }
        store.reset("abc").unwrap_or_else(|e| panic!("{e}"));
        assert!(store.is_empty());
        let lease = store
            .get_or_create(Some("abc"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(lease.turns().is_empty());
    }

    #[test]
    fn test_evict_idle_skips_busy_sessions() {
        let store = SessionStore::new();
        drop(store.get_or_create(Some("idle")));
        let _busy = store
            .get_or_create(Some("busy"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(store.evict_idle(Duration::ZERO), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_evict_idle_keeps_fresh_sessions() {
        let store = SessionStore::new();
        drop(store.get_or_create(Some("fresh")));
        assert_eq!(store.evict_idle(Duration::from_secs(3600)), 0);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let store = Arc::new(SessionStore::new());
        let token = CancellationToken::new();
        let handle = Arc::clone(&store).spawn_sweeper(
            Duration::from_secs(60),
            Duration::from_millis(10),
            token.clone(),
        );
        token.cancel();
        handle.await.unwrap_or_else(|e| panic!("join: {e}"));
    }

    #[test_case("" ; "empty")]
    #[test_case("has space" ; "space")]
    #[test_case("../etc" ; "path")]
    #[test_case(&"x".repeat(129) ; "too long")]
    fn test_invalid_ids_rejected(id: &str) {
        assert!(matches!(
            validate_session_id(id),
            Err(SessionError::InvalidId { .. })
        ));
    }

    #[test_case("abc" ; "letters")]
    #[test_case("A-1_b" ; "mixed")]
    #[test_case("3f2b8c1e-8a7d-4b8e-9f3a-1c2d3e4f5a6b" ; "uuid")]
    fn test_valid_ids_accepted(id: &str) {
        assert!(validate_session_id(id).is_ok());
    }
}
