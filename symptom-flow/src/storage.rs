use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{error::Result, session::SessionState};

/// One interactive user session and its result slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            state: SessionState::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_random() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True when the session has not been written since `cutoff`.
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.updated_at < cutoff
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    /// Replace an existing session. Returns `false` (and stores nothing) when the id is gone.
    async fn update(&self, session: Session) -> Result<bool>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn count(&self) -> Result<usize>;
    /// Drop every session whose last write is older than `max_idle`; returns how many went.
    async fn remove_idle(&self, max_idle: Duration) -> Result<usize>;
}

/// In-memory implementation of SessionStorage
#[derive(Clone, Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn update(&self, session: Session) -> Result<bool> {
        match self.sessions.get_mut(&session.id) {
            Some(mut entry) => {
                *entry = session;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.sessions.len())
    }

    async fn remove_idle(&self, max_idle: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_idle;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_idle_since(cutoff));
        Ok(before.saturating_sub(self.sessions.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_get_delete() {
        let storage = InMemorySessionStorage::new();
        let mut session = Session::new("session1");
        session.state.set("FLU", "Alice");

        storage.save(session).await.unwrap();
        let loaded = storage.get("session1").await.unwrap().unwrap();
        assert_eq!(loaded.state.get().unwrap().disease_name, "FLU");
        assert_eq!(storage.count().await.unwrap(), 1);

        storage.delete("session1").await.unwrap();
        assert!(storage.get("session1").await.unwrap().is_none());
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_does_not_recreate_deleted_session() {
        let storage = InMemorySessionStorage::new();
        let mut session = Session::new("gone");
        storage.save(session.clone()).await.unwrap();
        storage.delete("gone").await.unwrap();

        session.state.set("FLU", "Alice");
        assert!(!storage.update(session).await.unwrap());
        assert!(storage.get("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_existing_session() {
        let storage = InMemorySessionStorage::new();
        let mut session = Session::new("live");
        storage.save(session.clone()).await.unwrap();

        session.state.set("COLD", "Bob");
        assert!(storage.update(session).await.unwrap());
        let loaded = storage.get("live").await.unwrap().unwrap();
        assert_eq!(loaded.state.get().unwrap().disease_name, "COLD");
    }

    #[tokio::test]
    async fn test_remove_idle_keeps_recent_sessions() {
        let storage = InMemorySessionStorage::new();
        let mut stale = Session::new("stale");
        stale.updated_at = Utc::now() - Duration::minutes(45);
        storage.save(stale).await.unwrap();
        storage.save(Session::new("fresh")).await.unwrap();

        let removed = storage.remove_idle(Duration::minutes(30)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(storage.get("stale").await.unwrap().is_none());
        assert!(storage.get("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let storage = InMemorySessionStorage::new();
        let mut a = Session::new_random();
        let b = Session::new_random();
        assert_ne!(a.id, b.id);

        a.state.set("COVID", "Bob");
        storage.save(a.clone()).await.unwrap();
        storage.save(b.clone()).await.unwrap();

        assert!(storage.get(&b.id).await.unwrap().unwrap().state.is_empty());
        assert!(!storage.get(&a.id).await.unwrap().unwrap().state.is_empty());
    }
}
