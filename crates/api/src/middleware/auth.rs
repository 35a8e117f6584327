//! Bearer-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lectio_core::types::DbId;

use crate::error::{unauthorized, AppError};
use crate::state::AppState;

/// Verified subject identity extracted from a `Bearer <token>` Authorization
/// header.
///
/// Verification is self-contained: signature and expiry via the claims codec,
/// no session-store lookup. Use as an extractor parameter in any handler that
/// requires authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(subject_id = user.subject_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The subject's internal database id (from `claims.sub`).
    pub subject_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(unauthorized)?;

        // The distinguishing failure kind stays in logs; the client always
        // sees the same generic 401.
        let claims = state.codec.verify(token).map_err(|e| {
            tracing::debug!(kind = %e, "access token rejected");
            unauthorized()
        })?;

        Ok(AuthUser {
            subject_id: claims.sub,
        })
    }
}
