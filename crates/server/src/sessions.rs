use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scopewise_agent::runtime::ChatSession;
use scopewise_core::config::ServerConfig;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { idle_ttl: Duration::from_secs(3600), max_sessions: 1000 }
    }
}

impl From<&ServerConfig> for SessionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            idle_ttl: Duration::from_secs(config.session_idle_secs),
            max_sessions: config.max_sessions as usize,
        }
    }
}

struct Entry {
    session: Arc<ChatSession>,
    last_seen: Instant,
}

/// In-memory sessions keyed by id.
///
/// Idle sessions expire after `idle_ttl` and are swept whenever a session is
/// created. At capacity the least recently used idle session is evicted.
/// Sessions with a reply in flight are never evicted.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    limits: SessionLimits,
}

impl SessionRegistry {
    pub fn new(limits: SessionLimits) -> Self {
        Self { sessions: Arc::default(), limits }
    }

    pub async fn create(&self) -> Arc<ChatSession> {
        let session = Arc::new(ChatSession::default());
        let mut sessions = self.sessions.write().await;

        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.session.is_busy() || now.duration_since(entry.last_seen) < self.limits.idle_ttl
        });
        let expired = before - sessions.len();

        let mut evicted = None;
        if sessions.len() >= self.limits.max_sessions {
            evicted = sessions
                .iter()
                .filter(|(_, entry)| !entry.session.is_busy())
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            if let Some(id) = evicted {
                sessions.remove(&id);
            }
        }

        sessions.insert(session.id(), Entry { session: Arc::clone(&session), last_seen: now });
        info!(
            event_name = "server.session.created",
            session_id = %session.id(),
            expired,
            evicted = ?evicted,
            active = sessions.len(),
            "estimator session created"
        );
        session
    }

    /// Looks a session up and marks it as recently used.
    pub async fn get(&self, id: Uuid) -> Option<Arc<ChatSession>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_seen = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    /// A turn still running on a removed session completes but is no longer reachable.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(event_name = "server.session.removed", session_id = %id, "estimator session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::{SessionLimits, SessionRegistry};

    #[tokio::test]
    async fn created_sessions_are_retrievable() {
        let registry = SessionRegistry::default();
        let session = registry.create().await;

        let found = registry.get(session.id()).await.expect("session registered");
        assert_eq!(found.id(), session.id());
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_expire_on_next_create() {
        let registry =
            SessionRegistry::new(SessionLimits { idle_ttl: Duration::ZERO, max_sessions: 10 });
        let stale = registry.create().await;

        let fresh = registry.create().await;

        assert!(registry.get(stale.id()).await.is_none());
        assert!(registry.get(fresh.id()).await.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let registry = SessionRegistry::new(SessionLimits {
            idle_ttl: Duration::from_secs(3600),
            max_sessions: 2,
        });
        let first = registry.create().await;
        let second = registry.create().await;
        registry.get(first.id()).await.expect("touch first");

        let third = registry.create().await;

        assert_eq!(registry.len().await, 2);
        assert!(registry.get(second.id()).await.is_none());
        assert!(registry.get(first.id()).await.is_some());
        assert!(registry.get(third.id()).await.is_some());
    }

    #[tokio::test]
    async fn removed_sessions_are_gone() {
        let registry = SessionRegistry::default();
        let session = registry.create().await;

        assert!(registry.remove(session.id()).await);
        assert!(!registry.remove(session.id()).await);
        assert_eq!(registry.len().await, 0);
    }
}
