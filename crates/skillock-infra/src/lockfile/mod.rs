//! Filesystem lockfile storage.
//!
//! Implements the `LockfileStore` trait from `skillock-core`. Writes go to a
//! temporary file in the destination directory which is then renamed over
//! the target, so a crash mid-write never leaves a truncated lockfile.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use skillock_core::lockfile::Lockfile;
use skillock_core::service::store::LockfileStore;
use skillock_types::error::LockfileError;

/// Local filesystem implementation of `LockfileStore`.
pub struct FsLockfileStore;

impl FsLockfileStore {
    pub fn new() -> Self {
        Self
    }

    /// Lockfile path inside `dir`: `{dir}/{file_name}`.
    pub fn lockfile_path(dir: &Path, file_name: &str) -> PathBuf {
        dir.join(file_name)
    }
}

impl Default for FsLockfileStore {
    fn default() -> Self {
        Self::new()
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LockfileError + '_ {
    move |source| LockfileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl LockfileStore for FsLockfileStore {
    fn write(&self, path: &Path, lockfile: &Lockfile) -> Result<(), LockfileError> {
        let json = lockfile.to_json()?;

        // Ensure parent directory exists
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(io_error(parent))?;
        tmp.write_all(json.as_bytes()).map_err(io_error(path))?;
        tmp.write_all(b"\n").map_err(io_error(path))?;
        tmp.as_file().sync_all().map_err(io_error(path))?;
        tmp.persist(path).map_err(|err| LockfileError::Io {
            path: path.to_path_buf(),
            source: err.error,
        })?;

        tracing::info!(
            path = %path.display(),
            skills = lockfile.skill_count(),
            "wrote lockfile"
        );
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Lockfile, LockfileError> {
        let content = std::fs::read_to_string(path).map_err(io_error(path))?;
        let lockfile = Lockfile::from_json(&content)?;
        tracing::debug!(
            path = %path.display(),
            skills = lockfile.skill_count(),
            "read lockfile"
        );
        Ok(lockfile)
    }
}
