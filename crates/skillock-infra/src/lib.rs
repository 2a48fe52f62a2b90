//! Infrastructure layer for skillock.
//!
//! Contains implementations of the ports defined in `skillock-core`: SHA-256
//! content hashing and filesystem lockfile storage. Also hosts the
//! `skillock.toml` loader and the end-to-end lock pipeline that ties the
//! resolver, the lockfile factory, and storage together.

pub mod config;
pub mod crypto;
pub mod lockfile;
pub mod pipeline;
