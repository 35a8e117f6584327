//! Refresh-session storage.
//!
//! [`SessionStore`] is the single shared mutable resource of the auth core.
//! Two implementations are provided:
//!
//! - [`PgSessionStore`] -- durable, backed by the `refresh_sessions` table.
//! - [`MemorySessionStore`] -- process-local; a restart logs everyone out.
//!
//! Both obey the same contract, so the session manager and the tests are
//! written against the trait.

pub mod memory;
pub mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

use async_trait::async_trait;
use lectio_core::types::DbId;

use crate::models::session::RefreshSession;

/// Errors surfaced by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row with the same key already exists.
    #[error("duplicate session key")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Keyed storage for refresh sessions.
///
/// Keys are token hashes (SHA-256 hex of the opaque refresh id). All methods
/// must be safe under concurrent access; in particular `remove` is the atomic
/// claim that serializes concurrent rotations of the same session -- exactly
/// one caller observes `true`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session. Fails with [`StoreError::Duplicate`] if the key
    /// is already present.
    async fn insert(&self, session: RefreshSession) -> Result<(), StoreError>;

    /// Look up a live session by token hash.
    ///
    /// Expired-but-unpurged rows are removed lazily and reported as `None`.
    async fn get(&self, token_hash: &str) -> Result<Option<RefreshSession>, StoreError>;

    /// Delete a session by token hash. Idempotent; returns `true` only if
    /// this call deleted the row.
    async fn remove(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Delete every session belonging to a subject. Returns the count of
    /// deleted rows.
    async fn remove_all_for_subject(&self, subject_id: DbId) -> Result<u64, StoreError>;
}
