use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lectio_core::error::CoreError;
use lectio_db::store::StoreError;
use serde_json::json;

use crate::auth::claims::ClaimsError;
use crate::auth::session::AuthError;

/// Application-level error type for HTTP handlers.
///
/// Wraps domain errors and implements [`IntoResponse`] to produce consistent
/// JSON error bodies. All authentication failures collapse to one generic
/// 401; only server-side logs retain the distinguishing kind.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `lectio_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A session lifecycle error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A session/user store error reaching a handler directly.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// The one body every client-caused auth failure maps to.
const UNAUTHORIZED_MESSAGE: &str = "Invalid or expired credentials";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Session lifecycle errors ---
            AppError::Auth(auth) => classify_auth_error(auth),

            // --- Store errors ---
            AppError::Store(store) => classify_store_error(store),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a session lifecycle error to an HTTP status, code, and message.
///
/// Client-caused failures (missing/expired session, fingerprint mismatch,
/// bad token) all produce the same generic 401 so the response leaks nothing
/// about which check failed. Config/allocation failures are 500s.
fn classify_auth_error(err: &AuthError) -> (StatusCode, &'static str, String) {
    match err {
        AuthError::NotFound
        | AuthError::FingerprintMismatch
        | AuthError::Claims(ClaimsError::Malformed)
        | AuthError::Claims(ClaimsError::Signature)
        | AuthError::Claims(ClaimsError::Expired) => {
            tracing::debug!(kind = %err, "authentication failure");
            (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                UNAUTHORIZED_MESSAGE.to_string(),
            )
        }
        AuthError::Claims(ClaimsError::Signing(e)) => {
            tracing::error!(error = %e, "access token signing failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        AuthError::IdAllocation => {
            tracing::error!("refresh id allocation exhausted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        AuthError::Store(store) => classify_store_error(store),
    }
}

/// Map a store error to an HTTP status, code, and message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::Duplicate => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "Duplicate key".to_string(),
        ),
        StoreError::Database(db_err) => {
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

/// Build the generic unauthorized error used wherever a specific cause must
/// not reach the client.
pub fn unauthorized() -> AppError {
    AppError::Core(CoreError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()))
}
