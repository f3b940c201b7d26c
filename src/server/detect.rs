use crate::address::Address;
use crate::server::lock::LockFile;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpStream;

/// Default connect timeout of the probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Detects whether another server already occupies an address.
///
/// Two sources are consulted in order: a lock file left by a background
/// server started with this tool, then a TCP connect to the address. A lock
/// file short-circuits the probe, so a stale lock reports a collision.
#[derive(Debug, Clone)]
pub struct CollisionDetector {
    lock_dir: PathBuf,
    probe_timeout: Duration,
}

impl CollisionDetector {
    /// Create a detector looking for lock files in `lock_dir`.
    pub fn new(lock_dir: impl Into<PathBuf>, probe_timeout: Duration) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            probe_timeout,
        }
    }

    /// Whether a server is already tracked or listening on `address`.
    #[tracing::instrument(skip(self), fields(address = %address))]
    pub async fn is_other_server_running(&self, address: &Address) -> bool {
        let lock = LockFile::in_dir(&self.lock_dir, address);
        if lock.exists() {
            tracing::debug!(lock_file = %lock.path().display(), "Lock file present");
            return true;
        }

        self.probe(address).await
    }

    /// Attempts a TCP connect to `address`, closing the socket right away.
    pub async fn probe(&self, address: &Address) -> bool {
        match tokio::time::timeout(self.probe_timeout, TcpStream::connect(address.as_str())).await
        {
            Ok(Ok(stream)) => {
                drop(stream);
                tracing::debug!("Something is listening on the address");
                true
            }
            Ok(Err(e)) => {
                tracing::trace!(error = %e, "Connect probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(timeout = ?self.probe_timeout, "Connect probe timed out");
                false
            }
        }
    }
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self::new(std::env::temp_dir(), DEFAULT_PROBE_TIMEOUT)
    }
}
