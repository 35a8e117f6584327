//! In-memory session store.
//!
//! Used by the test suites and usable as a deployment choice where session
//! durability across restarts is not wanted (a restart is then equivalent to
//! "log everyone out").

use std::collections::HashMap;

use async_trait::async_trait;
use lectio_core::types::DbId;
use tokio::sync::Mutex;

use crate::models::session::RefreshSession;
use crate::store::{SessionStore, StoreError};

/// Process-local [`SessionStore`] keyed by token hash.
///
/// All operations take the single map lock, which also makes `remove` the
/// atomic claim required to serialize concurrent rotations.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, RefreshSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: RefreshSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session.token_hash) {
            return Err(StoreError::Duplicate);
        }
        sessions.insert(session.token_hash.clone(), session);
        Ok(())
    }

    async fn get(&self, token_hash: &str) -> Result<Option<RefreshSession>, StoreError> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(token_hash) {
            Some(session) if session.is_expired_at(chrono::Utc::now()) => {
                // Lazy purge on lookup.
                tracing::debug!(
                    subject_id = session.subject_id,
                    "purged expired refresh session on lookup"
                );
                sessions.remove(token_hash);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn remove(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.lock().await.remove(token_hash).is_some())
    }

    async fn remove_all_for_subject(&self, subject_id: DbId) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.subject_id != subject_id);
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn session(token_hash: &str, subject_id: DbId, ttl_secs: i64) -> RefreshSession {
        let now = Utc::now();
        RefreshSession {
            token_hash: token_hash.to_string(),
            subject_id,
            fingerprint: "fp".to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
        }
    }

    #[tokio::test]
    async fn insert_then_get_returns_the_session() {
        let store = MemorySessionStore::new();
        store.insert(session("h1", 1, 60)).await.unwrap();

        let found = store.get("h1").await.unwrap().expect("session should exist");
        assert_eq!(found.subject_id, 1);
        assert_eq!(found.fingerprint, "fp");
    }

    #[tokio::test]
    async fn insert_duplicate_key_fails() {
        let store = MemorySessionStore::new();
        store.insert(session("h1", 1, 60)).await.unwrap();

        let err = store.insert(session("h1", 2, 60)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn expired_session_is_not_found_and_is_purged() {
        let store = MemorySessionStore::new();
        store.insert(session("h1", 1, -5)).await.unwrap();

        assert!(store.get("h1").await.unwrap().is_none());
        // The lazy purge deleted the row, so a later remove is a no-op.
        assert!(!store.remove("h1").await.unwrap());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MemorySessionStore::new();
        store.insert(session("h1", 1, 60)).await.unwrap();

        assert!(store.remove("h1").await.unwrap());
        assert!(!store.remove("h1").await.unwrap());
    }

    #[tokio::test]
    async fn remove_all_for_subject_only_touches_that_subject() {
        let store = MemorySessionStore::new();
        store.insert(session("h1", 1, 60)).await.unwrap();
        store.insert(session("h2", 1, 60)).await.unwrap();
        store.insert(session("h3", 2, 60)).await.unwrap();

        assert_eq!(store.remove_all_for_subject(1).await.unwrap(), 2);
        assert!(store.get("h1").await.unwrap().is_none());
        assert!(store.get("h2").await.unwrap().is_none());
        assert!(store.get("h3").await.unwrap().is_some());
    }
}
