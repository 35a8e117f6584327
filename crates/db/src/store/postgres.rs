//! Durable session store backed by the `refresh_sessions` table.

use async_trait::async_trait;
use lectio_core::types::DbId;

use crate::models::session::RefreshSession;
use crate::store::{SessionStore, StoreError};
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "token_hash, subject_id, fingerprint, issued_at, expires_at";

/// Postgres-backed [`SessionStore`].
///
/// Expired rows are purged lazily on lookup; no background sweep is required.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: RefreshSession) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO refresh_sessions ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5)"
        );
        let result = sqlx::query(&query)
            .bind(&session.token_hash)
            .bind(session.subject_id)
            .bind(&session.fingerprint)
            .bind(session.issued_at)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            // PostgreSQL unique violation: error code 23505.
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                Err(StoreError::Duplicate)
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn get(&self, token_hash: &str) -> Result<Option<RefreshSession>, StoreError> {
        // Lazy purge: an expired row is physically removed here and treated
        // as absent for lookup purposes.
        let purged = sqlx::query(
            "DELETE FROM refresh_sessions WHERE token_hash = $1 AND expires_at <= NOW()",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await?;
        if purged.rows_affected() > 0 {
            tracing::debug!("purged expired refresh session on lookup");
            return Ok(None);
        }

        let query = format!(
            "SELECT {COLUMNS} FROM refresh_sessions
             WHERE token_hash = $1 AND expires_at > NOW()"
        );
        let session = sqlx::query_as::<_, RefreshSession>(&query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn remove(&self, token_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_all_for_subject(&self, subject_id: DbId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE subject_id = $1")
            .bind(subject_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
