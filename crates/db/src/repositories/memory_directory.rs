//! In-memory user directory for tests.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use lectio_core::types::DbId;
use tokio::sync::Mutex;

use crate::models::user::User;
use crate::repositories::UserDirectory;
use crate::store::StoreError;

/// Process-local [`UserDirectory`] seeded via [`MemoryUserDirectory::add`].
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<Vec<User>>,
    next_id: AtomicI64,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Add a user with the given credentials, returning the assigned id.
    pub async fn add(&self, username: &str, email: &str, password_hash: &str) -> DbId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = chrono::Utc::now();
        self.users.lock().await.push(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Flip a user's `is_active` flag.
    pub async fn set_active(&self, id: DbId, is_active: bool) {
        let mut users = self.users.lock().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.is_active = is_active;
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}
