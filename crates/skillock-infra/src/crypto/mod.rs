//! Cryptographic operations for skillock.
//!
//! - `hash`: SHA-256 content hashing for lockfile integrity

pub mod hash;
