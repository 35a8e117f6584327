pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/login        login (public)
/// /auth/refresh      refresh (cookie-gated)
/// /auth/logout       logout (cookie-gated, never fails)
/// /auth/logout-all   logout everywhere (requires auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/auth", auth::router())
}
