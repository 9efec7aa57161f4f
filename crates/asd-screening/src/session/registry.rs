use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::auth::StoredAuth;
use super::storage::MemoryKeyValueStore;

/// Request header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("sess-{id:06}"))
}

/// The two storage areas a single client owns.
#[derive(Debug, Default)]
pub struct BrowserSession {
    /// Survives across visits: login record and chat history.
    pub local: Arc<MemoryKeyValueStore>,
    /// Scoped to the visit: the latest screening outcome.
    pub session: Arc<MemoryKeyValueStore>,
}

impl BrowserSession {
    pub fn auth(&self) -> StoredAuth<MemoryKeyValueStore> {
        StoredAuth::new(self.local.clone())
    }
}

/// Sessions untouched for this long are dropped the next time a session opens.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

#[derive(Debug)]
struct SessionEntry {
    session: Arc<BrowserSession>,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn open(&self) -> (SessionId, Arc<BrowserSession>) {
        let id = next_session_id();
        let session = Arc::new(BrowserSession::default());
        let now = Instant::now();
        let mut guard = self.sessions.lock().expect("session mutex poisoned");

        let before = guard.len();
        guard.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        if guard.len() < before {
            debug!(expired = before - guard.len(), "idle sessions dropped");
        }

        guard.insert(
            id.clone(),
            SessionEntry {
                session: session.clone(),
                last_seen: now,
            },
        );
        (id, session)
    }

    /// Looks up a session and marks it as used.
    pub fn get(&self, id: &SessionId) -> Option<Arc<BrowserSession>> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        guard.get_mut(id).map(|entry| {
            entry.last_seen = Instant::now();
            entry.session.clone()
        })
    }

    pub fn close(&self, id: &SessionId) -> Option<Arc<BrowserSession>> {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        guard.remove(id).map(|entry| entry.session)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::KeyValueStore;

    #[test]
    fn sessions_are_isolated() {
        let registry = SessionRegistry::default();
        let (first_id, first) = registry.open();
        let (second_id, second) = registry.open();
        assert_ne!(first_id, second_id);
        assert!(first_id.0.starts_with("sess-"));

        first
            .session
            .set_item("screeningResults", "{}".to_string())
            .expect("write");
        assert!(second.session.is_empty());

        let fetched = registry.get(&first_id).expect("session registered");
        assert_eq!(fetched.session.len(), 1);

        registry.close(&first_id);
        assert!(registry.get(&first_id).is_none());
    }

    #[test]
    fn idle_sessions_are_dropped_when_another_opens() {
        let registry = SessionRegistry::with_idle_timeout(Duration::ZERO);
        let (first_id, _) = registry.open();
        let (second_id, _) = registry.open();

        assert!(registry.get(&first_id).is_none());
        assert!(registry.get(&second_id).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn active_sessions_survive_new_logins() {
        let registry = SessionRegistry::default();
        let ids: Vec<_> = (0..3).map(|_| registry.open().0).collect();
        assert_eq!(registry.len(), 3);
        assert!(ids.iter().all(|id| registry.get(id).is_some()));
    }
}
