use crate::session::store::SessionData;
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Opaque identifier carried in the session cookie
pub type SessionId = String;

/// Live sessions kept when no limit is configured
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Generate a fresh session id (32 lowercase hex chars)
pub fn generate_session_id() -> SessionId {
    Uuid::new_v4().simple().to_string()
}

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session value could not be converted: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No session attached to request")]
    Missing,
}

struct SessionEntry {
    data: SessionData,
    /// Tick of the last access, for least-recently-used eviction
    last_seen: u64,
}

/// Registry of live sessions: owns every session's variables
///
/// Holds at most `max_sessions` sessions; creating one beyond that evicts the
/// least recently used.
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionEntry>,
    max_sessions: usize,
    clock: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }

    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions: max_sessions.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Drop the least recently used session; false when there is none
    fn evict_least_recent(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| entry.value().last_seen)
            .map(|entry| entry.key().clone());

        match oldest {
            Some(id) => {
                if self.sessions.remove(&id).is_some() {
                    counter!("prefixed_session_sessions_evicted_total").increment(1);
                    warn!(
                        "Session limit ({}) reached, evicted least recently used session {}",
                        self.max_sessions, id
                    );
                }
                true
            }
            None => false,
        }
    }

    /// Create an empty session and return its id
    pub fn create_session(&self) -> SessionId {
        while self.sessions.len() >= self.max_sessions {
            if !self.evict_least_recent() {
                break;
            }
        }

        let id = generate_session_id();
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                data: SessionData::new(),
                last_seen: self.tick(),
            },
        );

        counter!("prefixed_session_sessions_created_total").increment(1);
        gauge!("prefixed_session_sessions_active").set(self.sessions.len() as f64);
        debug!("Created session {}", id);

        id
    }

    /// Resolve the id presented by a client, creating a new session when it
    /// is absent or unknown. The flag is true when a session was created.
    pub fn resolve(&self, presented: Option<&str>) -> (SessionId, bool) {
        match presented {
            Some(id) => {
                if let Some(mut entry) = self.sessions.get_mut(id) {
                    entry.last_seen = self.tick();
                    return (id.to_string(), false);
                }
                debug!("Unknown session id {} presented, issuing a new one", id);
                (self.create_session(), true)
            }
            None => (self.create_session(), true),
        }
    }

    /// Run `f` against the session's variables while holding its entry lock
    ///
    /// The lock covers only this call; do not re-enter the manager from `f`.
    pub fn with_data<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut SessionData) -> R,
    ) -> Result<R, SessionError> {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.last_seen = self.tick();
        Ok(f(&mut entry.data))
    }

    /// Copy of a session's variables, for inspection
    pub fn snapshot(&self, id: &str) -> Option<SessionData> {
        self.sessions.get(id).map(|entry| entry.data.clone())
    }

    /// Drop a session and all of its variables
    pub fn destroy(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            counter!("prefixed_session_sessions_destroyed_total").increment(1);
            gauge!("prefixed_session_sessions_active").set(self.sessions.len() as f64);
            info!("Destroyed session {}", id);
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
