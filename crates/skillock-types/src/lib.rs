//! Shared domain types for skillock.
//!
//! This crate contains the data types exchanged between the resolver, the
//! lockfile model, and the collaborators that feed them: parsed skill
//! records, resolution results, locked skill entries, configuration, and the
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod config;
pub mod error;
pub mod lockfile;
pub mod resolution;
pub mod skill;
