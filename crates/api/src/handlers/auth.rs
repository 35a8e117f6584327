//! Handlers for the `/auth` resource (login, refresh, logout).
//!
//! Transport carriage: the access token travels in the JSON response body;
//! the opaque refresh id travels in an httponly, same-site-lax cookie scoped
//! to `/` whose max-age matches the refresh session TTL. A missing or
//! malformed cookie is equivalent to "no session".

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lectio_core::error::CoreError;
use serde::{Deserialize, Serialize};

use crate::auth::password::verify_password;
use crate::auth::session::SessionTokens;
use crate::error::{unauthorized, AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Name of the refresh-session cookie.
pub const REFRESH_COOKIE: &str = "lectio_refresh";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Opaque device/browser identifier the refresh session is bound to.
    pub fingerprint: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub fingerprint: String,
}

/// Successful authentication response returned by login and refresh.
///
/// The refresh id is deliberately absent: it only travels in the cookie.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with username + password + fingerprint. Returns an access
/// token and sets the refresh cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    if input.fingerprint.is_empty() {
        return Err(AppError::BadRequest(
            "fingerprint must not be empty".into(),
        ));
    }

    // Resolve the subject via the user-lookup collaborator. Unknown user and
    // wrong password produce the same generic 401.
    let user = state
        .users
        .find_by_username(&input.username)
        .await?
        .ok_or_else(unauthorized)?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(unauthorized());
    }

    let tokens = state
        .sessions
        .create_session(user.id, &input.fingerprint)
        .await?;

    tracing::info!(subject_id = user.id, "login succeeded");
    respond_with_tokens(&state, jar, tokens)
}

/// POST /api/v1/auth/refresh
///
/// Exchange the refresh cookie + fingerprint for a new access token and a
/// rotated refresh cookie. On success (and when a concurrent rotation wins
/// the race) the presented refresh id is consumed; a mismatched fingerprint
/// leaves the session intact under the default reject policy.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<RefreshRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let refresh_id = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(unauthorized)?;

    let tokens = state.sessions.refresh(&refresh_id, &input.fingerprint).await?;

    // The account may have been deactivated since sign-in; rotation must not
    // keep a disabled subject's lineage alive for the rest of the TTL.
    match state.users.find_by_id(tokens.subject_id).await? {
        Some(user) if user.is_active => {}
        _ => {
            tracing::warn!(subject_id = tokens.subject_id, "refresh for deactivated account");
            state.sessions.revoke(&tokens.refresh_id).await?;
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is deactivated".into(),
            )));
        }
    }

    respond_with_tokens(&state, jar, tokens)
}

/// POST /api/v1/auth/logout
///
/// Revoke the session referenced by the refresh cookie and clear the cookie.
/// Always returns 204: logging out is idempotent and safe to retry, and a
/// client without a cookie has nothing to revoke.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, StatusCode)> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        if let Err(e) = state.sessions.revoke(cookie.value()).await {
            // Never fails observably; the client's retry is safe either way.
            tracing::error!(error = %e, "logout revoke failed");
        }
    }

    Ok((jar.add(clear_refresh_cookie()), StatusCode::NO_CONTENT))
}

/// POST /api/v1/auth/logout-all
///
/// Revoke every refresh session for the authenticated subject ("log out
/// everywhere"). Requires a valid access token.
pub async fn logout_all(
    State(state): State<AppState>,
    user: AuthUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, StatusCode)> {
    if let Err(e) = state.sessions.revoke_all(user.subject_id).await {
        tracing::error!(error = %e, "logout-all revoke failed");
    }

    Ok((jar.add(clear_refresh_cookie()), StatusCode::NO_CONTENT))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Set the rotated refresh cookie and build the token response body.
fn respond_with_tokens(
    state: &AppState,
    jar: CookieJar,
    tokens: SessionTokens,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let cookie = refresh_cookie(
        &tokens.refresh_id,
        state.config.auth.refresh_ttl_days,
        state.config.auth.cookie_secure,
    );

    let body = AuthResponse {
        access_token: tokens.access_token,
        token_type: "Bearer",
        expires_in: tokens.access_expires_in,
    };

    Ok((jar.add(cookie), Json(body)))
}

/// Build the refresh-session cookie: httponly, same-site-lax, path `/`,
/// max-age equal to the refresh TTL.
fn refresh_cookie(refresh_id: &str, ttl_days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, refresh_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(ttl_days))
        .build()
}

/// Build the removal cookie for the refresh session.
fn clear_refresh_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}
