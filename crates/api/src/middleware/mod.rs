//! Request-gating extractors.
//!
//! - [`auth::AuthUser`] -- verifies the Bearer access token and carries the
//!   subject identity into handlers.

pub mod auth;
