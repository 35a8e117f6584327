//! Refresh-session lifecycle: create, rotate, revoke.
//!
//! The manager is the only component that touches both the claims codec and
//! the session store. Refresh ids handed to clients are opaque UUIDv4
//! strings; the store is keyed by their SHA-256 digest.

use std::sync::Arc;

use chrono::{Duration, Utc};
use lectio_core::types::{DbId, Timestamp};
use lectio_db::models::session::RefreshSession;
use lectio_db::store::{SessionStore, StoreError};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::claims::{ClaimsCodec, ClaimsError};
use crate::auth::AuthConfig;

/// Bounded retries for refresh-id allocation on key collision.
const ID_ALLOC_ATTEMPTS: u32 = 3;

/// What to do with a session when a refresh attempt presents the wrong
/// fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintPolicy {
    /// Reject the attempt but keep the session, so a forged fingerprint
    /// cannot be used to log the legitimate client out.
    Reject,
    /// Treat the mismatch as compromise evidence and revoke the session.
    Revoke,
}

/// Errors from session lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No live session for the presented refresh id. Also what a client sees
    /// for an expired session, and what the loser of a concurrent rotation
    /// observes.
    #[error("refresh session not found")]
    NotFound,

    /// The supplied fingerprint does not match the session's.
    #[error("refresh fingerprint mismatch")]
    FingerprintMismatch,

    /// Could not allocate a unique refresh id within the retry budget.
    #[error("refresh id allocation exhausted after {ID_ALLOC_ATTEMPTS} attempts")]
    IdAllocation,

    #[error(transparent)]
    Claims(#[from] ClaimsError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Credentials produced by sign-in and refresh.
#[derive(Debug)]
pub struct SessionTokens {
    /// Subject the session belongs to, for post-rotation account checks.
    pub subject_id: DbId,
    /// Signed access token for the response body.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Opaque refresh id for the session cookie. Never stored server-side in
    /// plaintext.
    pub refresh_id: String,
    /// Refresh session expiry, also the cookie max-age.
    pub refresh_expires_at: Timestamp,
}

/// Orchestrates the access/refresh token lifecycle against a [`SessionStore`].
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    codec: Arc<ClaimsCodec>,
    config: AuthConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, codec: Arc<ClaimsCodec>, config: AuthConfig) -> Self {
        Self {
            store,
            codec,
            config,
        }
    }

    /// Start a new session lineage for `subject`: a fresh refresh session
    /// bound to `fingerprint`, plus an access token.
    ///
    /// Id collisions are retried with a new id up to [`ID_ALLOC_ATTEMPTS`]
    /// times before surfacing [`AuthError::IdAllocation`].
    pub async fn create_session(
        &self,
        subject: DbId,
        fingerprint: &str,
    ) -> Result<SessionTokens, AuthError> {
        let access_token = self
            .codec
            .issue(subject, Duration::minutes(self.config.access_ttl_mins))?;

        let now = Utc::now();
        let expires_at = now + Duration::days(self.config.refresh_ttl_days);

        for attempt in 1..=ID_ALLOC_ATTEMPTS {
            let refresh_id = Uuid::new_v4().to_string();
            let session = RefreshSession {
                token_hash: hash_refresh_id(&refresh_id),
                subject_id: subject,
                fingerprint: fingerprint.to_string(),
                issued_at: now,
                expires_at,
            };

            match self.store.insert(session).await {
                Ok(()) => {
                    tracing::debug!(subject_id = subject, "created refresh session");
                    return Ok(SessionTokens {
                        subject_id: subject,
                        access_token,
                        access_expires_in: self.config.access_ttl_mins * 60,
                        refresh_id,
                        refresh_expires_at: expires_at,
                    });
                }
                Err(StoreError::Duplicate) => {
                    tracing::warn!(attempt, "refresh id collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthError::IdAllocation)
    }

    /// Rotate a session: validate the refresh id and fingerprint, delete the
    /// old record, insert a replacement, and issue a new access token.
    ///
    /// Delete-before-insert ordering means a crash between the two steps
    /// leaves at most the old session revoked, never two live sessions for
    /// one lineage. The delete is also the atomic claim that serializes
    /// concurrent rotations: the loser's delete hits no row and it observes
    /// [`AuthError::NotFound`].
    pub async fn refresh(
        &self,
        refresh_id: &str,
        fingerprint: &str,
    ) -> Result<SessionTokens, AuthError> {
        let token_hash = hash_refresh_id(refresh_id);

        let session = self
            .store
            .get(&token_hash)
            .await?
            .ok_or(AuthError::NotFound)?;

        // The store already treats expired rows as absent; this re-check
        // covers a row that expired between lookup paths, and logs the
        // distinction the client never sees.
        if session.is_expired_at(Utc::now()) {
            tracing::info!(subject_id = session.subject_id, "refresh session expired");
            let _ = self.store.remove(&token_hash).await?;
            return Err(AuthError::NotFound);
        }

        if session.fingerprint != fingerprint {
            tracing::warn!(
                subject_id = session.subject_id,
                policy = ?self.config.fingerprint_policy,
                "refresh fingerprint mismatch"
            );
            if self.config.fingerprint_policy == FingerprintPolicy::Revoke {
                self.store.remove(&token_hash).await?;
            }
            return Err(AuthError::FingerprintMismatch);
        }

        if !self.store.remove(&token_hash).await? {
            // Lost a concurrent rotation of the same session.
            tracing::info!(
                subject_id = session.subject_id,
                "refresh session already rotated"
            );
            return Err(AuthError::NotFound);
        }

        self.create_session(session.subject_id, &session.fingerprint)
            .await
    }

    /// Revoke the session for the presented refresh id. Idempotent; revoking
    /// an unknown or already-revoked id succeeds.
    pub async fn revoke(&self, refresh_id: &str) -> Result<(), AuthError> {
        let removed = self.store.remove(&hash_refresh_id(refresh_id)).await?;
        tracing::debug!(removed, "revoked refresh session");
        Ok(())
    }

    /// Revoke every session for `subject` ("log out everywhere"). Returns the
    /// number of sessions removed.
    pub async fn revoke_all(&self, subject: DbId) -> Result<u64, AuthError> {
        let count = self.store.remove_all_for_subject(subject).await?;
        tracing::info!(subject_id = subject, count, "revoked all refresh sessions");
        Ok(count)
    }
}

/// SHA-256 hex digest of an opaque refresh id, the store key.
pub fn hash_refresh_id(refresh_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(refresh_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use lectio_db::store::MemorySessionStore;

    fn test_config(policy: FingerprintPolicy) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_ttl_mins: 15,
            refresh_ttl_days: 7,
            fingerprint_policy: policy,
            cookie_secure: false,
        }
    }

    fn manager(policy: FingerprintPolicy) -> SessionManager {
        let config = test_config(policy);
        let codec = Arc::new(ClaimsCodec::new(&config.jwt_secret));
        SessionManager::new(Arc::new(MemorySessionStore::new()), codec, config)
    }

    #[tokio::test]
    async fn refresh_is_single_use() {
        let mgr = manager(FingerprintPolicy::Reject);
        let tokens = mgr.create_session(1, "dev-A").await.unwrap();

        let rotated = mgr.refresh(&tokens.refresh_id, "dev-A").await.unwrap();
        assert_ne!(rotated.refresh_id, tokens.refresh_id);

        // The old id must be dead after rotation.
        let replay = mgr.refresh(&tokens.refresh_id, "dev-A").await;
        assert_matches!(replay, Err(AuthError::NotFound));
    }

    #[tokio::test]
    async fn fingerprint_mismatch_rejects_without_revoking() {
        let mgr = manager(FingerprintPolicy::Reject);
        let tokens = mgr.create_session(1, "dev-A").await.unwrap();

        let result = mgr.refresh(&tokens.refresh_id, "dev-B").await;
        assert_matches!(result, Err(AuthError::FingerprintMismatch));

        // The mismatched attempt must not have destroyed the session.
        let ok = mgr.refresh(&tokens.refresh_id, "dev-A").await;
        assert!(ok.is_ok(), "session should survive a mismatched attempt");
    }

    #[tokio::test]
    async fn fingerprint_mismatch_revokes_under_revoke_policy() {
        let mgr = manager(FingerprintPolicy::Revoke);
        let tokens = mgr.create_session(1, "dev-A").await.unwrap();

        let result = mgr.refresh(&tokens.refresh_id, "dev-B").await;
        assert_matches!(result, Err(AuthError::FingerprintMismatch));

        // Under the revoke policy the session is gone even for the real
        // fingerprint.
        let replay = mgr.refresh(&tokens.refresh_id, "dev-A").await;
        assert_matches!(replay, Err(AuthError::NotFound));
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let mgr = manager(FingerprintPolicy::Reject);
        let tokens = mgr.create_session(1, "dev-A").await.unwrap();

        mgr.revoke(&tokens.refresh_id).await.unwrap();
        mgr.revoke(&tokens.refresh_id).await.unwrap();

        let replay = mgr.refresh(&tokens.refresh_id, "dev-A").await;
        assert_matches!(replay, Err(AuthError::NotFound));
    }

    #[tokio::test]
    async fn revoke_all_kills_every_session_for_the_subject() {
        let mgr = manager(FingerprintPolicy::Reject);
        let t1 = mgr.create_session(42, "dev-A").await.unwrap();
        let t2 = mgr.create_session(42, "dev-B").await.unwrap();
        let t3 = mgr.create_session(42, "dev-C").await.unwrap();
        let other = mgr.create_session(7, "dev-Z").await.unwrap();

        assert_eq!(mgr.revoke_all(42).await.unwrap(), 3);

        for (id, fp) in [
            (&t1.refresh_id, "dev-A"),
            (&t2.refresh_id, "dev-B"),
            (&t3.refresh_id, "dev-C"),
        ] {
            assert_matches!(mgr.refresh(id, fp).await, Err(AuthError::NotFound));
        }

        // Unrelated subject untouched.
        assert!(mgr.refresh(&other.refresh_id, "dev-Z").await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_refresh_has_exactly_one_winner() {
        let mgr = Arc::new(manager(FingerprintPolicy::Reject));
        let tokens = mgr.create_session(1, "dev-A").await.unwrap();

        let a = {
            let mgr = Arc::clone(&mgr);
            let id = tokens.refresh_id.clone();
            tokio::spawn(async move { mgr.refresh(&id, "dev-A").await })
        };
        let b = {
            let mgr = Arc::clone(&mgr);
            let id = tokens.refresh_id.clone();
            tokio::spawn(async move { mgr.refresh(&id, "dev-A").await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one concurrent refresh may win");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AuthError::NotFound))));

        // Exactly one live session remains for the lineage.
        assert_eq!(mgr.revoke_all(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn full_lifecycle_scenario() {
        let mgr = manager(FingerprintPolicy::Reject);
        let codec = ClaimsCodec::new("test-secret-that-is-long-enough-for-hmac");

        let t1 = mgr.create_session(42, "dev-A").await.unwrap();

        let t2 = mgr.refresh(&t1.refresh_id, "dev-A").await.unwrap();
        assert_ne!(t2.refresh_id, t1.refresh_id);

        // The rotated access token still carries the original subject.
        let claims = codec.verify(&t2.access_token).unwrap();
        assert_eq!(claims.sub, 42);

        // The pre-rotation id is dead.
        assert_matches!(
            mgr.refresh(&t1.refresh_id, "dev-A").await,
            Err(AuthError::NotFound)
        );
    }
}
