//! Shared primitives for the lectio platform crates.

pub mod error;
pub mod types;
