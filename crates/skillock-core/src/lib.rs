//! Resolution and lockfile logic for skillock.
//!
//! This crate holds the version-constraint algebra, the agent dependency
//! graph, the SAT-based resolver, and the lockfile model. It defines the
//! "ports" (`ContentHasher`, `LockfileStore`) that the infrastructure layer
//! implements, and depends only on `skillock-types` -- never on
//! `skillock-infra` or any I/O crate.

pub mod dependency;
pub mod lockfile;
pub mod service;
