use crate::address::Address;
use crate::error::Result;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Existence-only marker that a background server should be running on an
/// address.
///
/// The file is empty. It is created by the background supervisor once the
/// server has been spawned, and removing it (normally via `server:stop`)
/// asks that supervisor to shut the server down. Nothing in the file ties
/// it to a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Lock file for `address` in the system temp directory.
    pub fn for_address(address: &Address) -> Self {
        Self::in_dir(std::env::temp_dir(), address)
    }

    /// Lock file for `address` in `dir`.
    pub fn in_dir(dir: impl AsRef<Path>, address: &Address) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.pid", address.lock_stem())),
        }
    }

    /// Location of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the lock file currently exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Creates the lock file, leaving an existing one untouched.
    pub fn create(&self) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        tracing::debug!(lock_file = %self.path.display(), "Created lock file");
        Ok(())
    }

    /// Removes the lock file.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn remove(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(lock_file = %self.path.display(), "Removed lock file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
