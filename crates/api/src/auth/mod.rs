//! The session/token core.
//!
//! - [`claims`] -- signed access-token issuance and verification (stateless).
//! - [`session`] -- refresh-session lifecycle: create, rotate, revoke.
//! - [`password`] -- Argon2id password hashing for the login collaborator.

pub mod claims;
pub mod password;
pub mod session;

pub use session::FingerprintPolicy;

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_TTL_MINS: i64 = 15;
/// Default refresh session expiry in days.
const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

/// Token and session-policy configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 secret used to sign and verify access tokens.
    ///
    /// Process-wide, initialized once at startup; rotating it invalidates all
    /// previously issued, unexpired tokens.
    pub jwt_secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_ttl_mins: i64,
    /// Refresh session lifetime in days (default: 7).
    pub refresh_ttl_days: i64,
    /// What to do with a session when a refresh attempt presents the wrong
    /// fingerprint (default: reject without revoking).
    pub fingerprint_policy: FingerprintPolicy,
    /// Whether the refresh cookie is marked `Secure` (default: false, for
    /// plain-HTTP local development).
    pub cookie_secure: bool,
}

impl AuthConfig {
    /// Load auth configuration from environment variables.
    ///
    /// | Env Var               | Required | Default  |
    /// |-----------------------|----------|----------|
    /// | `JWT_SECRET`          | **yes**  | --       |
    /// | `ACCESS_TTL_MINS`     | no       | `15`     |
    /// | `REFRESH_TTL_DAYS`    | no       | `7`      |
    /// | `FINGERPRINT_POLICY`  | no       | `reject` |
    /// | `COOKIE_SECURE`       | no       | `false`  |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty, or if a variable fails
    /// to parse. Misconfiguration should fail fast at startup.
    pub fn from_env() -> Self {
        let jwt_secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!jwt_secret.is_empty(), "JWT_SECRET must not be empty");

        let access_ttl_mins: i64 = std::env::var("ACCESS_TTL_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_TTL_MINS.to_string())
            .parse()
            .expect("ACCESS_TTL_MINS must be a valid i64");

        let refresh_ttl_days: i64 = std::env::var("REFRESH_TTL_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_TTL_DAYS.to_string())
            .parse()
            .expect("REFRESH_TTL_DAYS must be a valid i64");

        let fingerprint_policy = match std::env::var("FINGERPRINT_POLICY")
            .unwrap_or_else(|_| "reject".into())
            .as_str()
        {
            "reject" => FingerprintPolicy::Reject,
            "revoke" => FingerprintPolicy::Revoke,
            other => panic!("FINGERPRINT_POLICY must be 'reject' or 'revoke', got '{other}'"),
        };

        let cookie_secure: bool = std::env::var("COOKIE_SECURE")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("COOKIE_SECURE must be 'true' or 'false'");

        Self {
            jwt_secret,
            access_ttl_mins,
            refresh_ttl_days,
            fingerprint_policy,
            cookie_secure,
        }
    }
}
