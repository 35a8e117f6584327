//! Access-token claims: issuing and verification.
//!
//! Access tokens are HS256-signed JWTs. A token's validity is a pure function
//! of the token, the signing key, and the clock -- never a store lookup -- so
//! verification stays cheap on every request. The flip side is that a token
//! stays valid until expiry even if its refresh session has been revoked; the
//! short access TTL bounds that exposure window.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lectio_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier (UUID v4) for audit correlation.
    pub jti: String,
}

/// Errors from issuing or verifying an access token.
#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    /// The token is structurally invalid (not a JWT, bad base64, bad JSON).
    #[error("access token is malformed")]
    Malformed,

    /// The signature does not match the process signing key.
    #[error("access token signature is invalid")]
    Signature,

    /// The token is past its `exp` claim.
    #[error("access token has expired")]
    Expired,

    /// Signing failed; indicates a key/config problem, not client input.
    #[error("access token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Stateless issue/verify codec around a single HS256 signing key.
///
/// Constructed once at startup and injected wherever tokens are produced or
/// checked.
#[derive(Clone)]
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl ClaimsCodec {
    pub fn new(secret: &str) -> Self {
        // Strict expiry: `now >= exp` must fail, so no leeway.
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a signed access token for `subject` expiring after `ttl`.
    pub fn issue(&self, subject: DbId, ttl: Duration) -> Result<String, ClaimsError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: subject,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(ClaimsError::Signing)
    }

    /// Verify structure, signature, and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, ClaimsError> {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return Err(match e.kind() {
                    ErrorKind::ExpiredSignature => ClaimsError::Expired,
                    ErrorKind::InvalidSignature => ClaimsError::Signature,
                    _ => ClaimsError::Malformed,
                })
            }
        };

        // jsonwebtoken still accepts a token at the instant `exp == now`;
        // the contract here is strict: `now >= exp` fails.
        if claims.exp <= chrono::Utc::now().timestamp() {
            return Err(ClaimsError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn codec() -> ClaimsCodec {
        ClaimsCodec::new("test-secret-that-is-long-enough-for-hmac")
    }

    #[test]
    fn issue_then_verify_round_trips_the_subject() {
        let codec = codec();
        let token = codec
            .issue(42, Duration::minutes(15))
            .expect("issue should succeed");

        let claims = codec.verify(&token).expect("verify should succeed");
        assert_eq!(claims.sub, 42);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn expired_token_fails_with_expired() {
        let codec = codec();
        // A token whose expiry is already in the past.
        let token = codec
            .issue(1, Duration::seconds(-30))
            .expect("issue should succeed");

        assert_matches!(codec.verify(&token), Err(ClaimsError::Expired));
    }

    #[test]
    fn token_expiring_this_instant_is_already_expired() {
        let codec = codec();
        // `exp == now` at issue time; expiry is inclusive, so this must fail.
        let token = codec
            .issue(1, Duration::zero())
            .expect("issue should succeed");

        assert_matches!(codec.verify(&token), Err(ClaimsError::Expired));
    }

    #[test]
    fn token_signed_with_a_different_secret_fails() {
        let token = ClaimsCodec::new("secret-alpha")
            .issue(1, Duration::minutes(15))
            .expect("issue should succeed");

        let result = ClaimsCodec::new("secret-bravo").verify(&token);
        assert_matches!(result, Err(ClaimsError::Signature));
    }

    #[test]
    fn garbage_token_fails_with_malformed() {
        assert_matches!(codec().verify("not-a-jwt"), Err(ClaimsError::Malformed));
    }

    #[test]
    fn tampered_payload_fails() {
        let codec = codec();
        let token = codec
            .issue(7, Duration::minutes(15))
            .expect("issue should succeed");

        // Swap the payload segment for a different (validly encoded) one.
        let other = codec
            .issue(8, Duration::minutes(15))
            .expect("issue should succeed");
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_matches!(codec.verify(&forged), Err(ClaimsError::Signature));
    }
}
