//! User lookup collaborator.
//!
//! The auth core only needs to resolve credentials to a subject id; the rest
//! of the platform's user management lives elsewhere. [`UserDirectory`] is
//! that boundary, with a Postgres implementation for production and an
//! in-memory one for tests.

pub mod memory_directory;
pub mod user_repo;

pub use memory_directory::MemoryUserDirectory;
pub use user_repo::PgUserDirectory;

use async_trait::async_trait;
use lectio_core::types::DbId;

use crate::models::user::User;
use crate::store::StoreError;

/// Read-only user lookup used by the login and refresh flows.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by username (case-sensitive).
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Find a user by internal id.
    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError>;
}
