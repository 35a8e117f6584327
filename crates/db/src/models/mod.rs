//! Database entity models.

pub mod session;
pub mod user;
