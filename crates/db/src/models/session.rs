//! Refresh-session model.

use lectio_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A refresh session row from the `refresh_sessions` table.
///
/// The opaque refresh id handed to clients is never stored; `token_hash` is
/// its SHA-256 hex digest, so a store leak does not compromise live sessions.
/// Rows are replaced (delete + insert) on every rotation, never updated in
/// place.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshSession {
    pub token_hash: String,
    pub subject_id: DbId,
    /// Client-supplied opaque device/browser identifier the session is bound to.
    pub fingerprint: String,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

impl RefreshSession {
    /// Whether the session is past its expiry at time `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}
