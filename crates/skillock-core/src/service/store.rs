//! LockfileStore trait for persisting lockfiles.
//!
//! Defined in skillock-core so callers can read and write lockfiles without
//! depending on a filesystem implementation. `FsLockfileStore` lives in
//! skillock-infra.

use std::path::Path;

use skillock_types::error::LockfileError;

use crate::lockfile::Lockfile;

pub trait LockfileStore: Send + Sync {
    /// Persist `lockfile` at `path`, creating parent directories as needed.
    fn write(&self, path: &Path, lockfile: &Lockfile) -> Result<(), LockfileError>;

    /// Load a lockfile. Missing optional fields are tolerated; malformed JSON
    /// is an error.
    fn read(&self, path: &Path) -> Result<Lockfile, LockfileError>;
}
