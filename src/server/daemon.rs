//! Background mode.
//!
//! `server:start` does not fork. It re-executes the current binary with the
//! hidden [`SUPERVISE_COMMAND`], stdio detached, and returns as soon as that
//! process exists. The supervisor makes itself a session leader, spawns the
//! web server, creates the lock file and then polls for the lock file's
//! removal, which is the only way to ask it to stop.

use crate::address::Address;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::server::lock::LockFile;
use crate::server::process::{OutputMode, ServerProcess};
use async_process::{Command, Stdio};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Hidden subcommand running the background supervisor.
pub const SUPERVISE_COMMAND: &str = "server:supervise";

/// How long a stopping server gets to exit before it is killed.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether this platform can run the server in the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCapability {
    Available,
    Unavailable(String),
}

impl DaemonCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, DaemonCapability::Available)
    }
}

/// Checks for the session control background mode relies on.
pub fn daemon_capability() -> DaemonCapability {
    if cfg!(unix) {
        DaemonCapability::Available
    } else {
        DaemonCapability::Unavailable(
            "This platform cannot detach the server from the terminal session.".to_string(),
        )
    }
}

/// Detaches the current process from its controlling terminal.
#[cfg(unix)]
pub fn detach_session() -> Result<()> {
    // SAFETY: setsid has no memory-safety preconditions.
    if unsafe { libc::setsid() } == -1 {
        return Err(Error::SessionDetachFailed(
            std::io::Error::last_os_error().to_string(),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn detach_session() -> Result<()> {
    Err(Error::SessionDetachFailed(
        "session control is not supported on this platform".to_string(),
    ))
}

/// Launches the background supervisor process.
#[derive(Debug, Clone)]
pub struct SupervisorCommand {
    program: PathBuf,
}

impl SupervisorCommand {
    /// Supervisor run by `program`, which must accept [`SUPERVISE_COMMAND`].
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Supervisor run by the currently executing binary.
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| Error::ForkFailed(format!("cannot locate own executable: {}", e)))?;
        Ok(Self::new(program))
    }

    /// Arguments handing `address` and `config` over to the supervisor.
    pub fn args(&self, address: &Address, config: &Config) -> Result<Vec<OsString>> {
        let config_json = serde_json::to_string(config)
            .map_err(|e| Error::ForkFailed(format!("cannot serialize configuration: {}", e)))?;

        Ok(vec![
            SUPERVISE_COMMAND.into(),
            address.as_str().into(),
            "--config-json".into(),
            config_json.into(),
        ])
    }

    /// Spawns the supervisor without waiting for it. Returns its pid.
    #[tracing::instrument(skip(self, config), fields(address = %address))]
    pub fn spawn(&self, address: &Address, config: &Config) -> Result<u32> {
        let child = Command::new(&self.program)
            .args(self.args(address, config)?)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::ForkFailed(format!("{}: {}", self.program.display(), e)))?;

        let pid = child.id();
        tracing::info!(pid, "Spawned background supervisor");
        Ok(pid)
    }
}

/// Supervises one background server until its lock file disappears.
pub struct Supervisor {
    process: ServerProcess,
    lock: LockFile,
    poll_interval: Duration,
}

impl Supervisor {
    /// Starts `process` with output disabled and hands it to [`adopt`](Self::adopt).
    #[tracing::instrument(skip_all, fields(address = %process.address()))]
    pub async fn start(
        mut process: ServerProcess,
        lock: LockFile,
        poll_interval: Duration,
    ) -> Result<Self> {
        process.start(OutputMode::Disabled)?;
        Self::adopt(process, lock, poll_interval).await
    }

    /// Takes over an already started `process` and creates `lock`.
    ///
    /// Fails with [`Error::SpawnFailed`] if the process is no longer running
    /// once the lock exists; the lock file is removed again in that case.
    /// On any failure the process is killed before this returns.
    pub async fn adopt(
        mut process: ServerProcess,
        lock: LockFile,
        poll_interval: Duration,
    ) -> Result<Self> {
        if let Err(e) = lock.create() {
            tracing::error!(error = %e, lock_file = %lock.path().display(), "Cannot create lock file");
            discard(&mut process).await;
            return Err(e);
        }

        let running = match process.is_running() {
            Ok(running) => running,
            Err(e) => {
                discard(&mut process).await;
                let _ = lock.remove();
                return Err(e);
            }
        };
        if !running {
            tracing::error!(exit_code = ?process.exit_code(), "Server process exited right after start");
            lock.remove()?;
            return Err(Error::SpawnFailed("the server process exited immediately".to_string()));
        }

        tracing::info!(pid = ?process.pid(), lock_file = %lock.path().display(), "Server running");
        Ok(Self {
            process,
            lock,
            poll_interval,
        })
    }

    pub fn lock(&self) -> &LockFile {
        &self.lock
    }

    pub fn process(&self) -> &ServerProcess {
        &self.process
    }

    /// Polls until the server exits, terminating it once the lock file is
    /// gone. Returns the server's exit code.
    pub async fn watch(mut self) -> Result<i32> {
        loop {
            match self.process.is_running() {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Lost track of the server process, stopping it");
                    self.stop().await?;
                    return Err(e);
                }
            }

            tokio::time::sleep(self.poll_interval).await;

            if !self.lock.exists() {
                tracing::info!("Lock file removed, stopping server");
                return self.stop().await;
            }
        }

        let code = self.process.wait().await?;
        tracing::info!(exit_code = code, "Server exited on its own");
        Ok(code)
    }

    async fn stop(&mut self) -> Result<i32> {
        if self.process.is_running().unwrap_or(true) {
            if let Err(e) = self.process.terminate() {
                tracing::warn!(error = %e, "Failed to terminate server");
            }
        }

        let code = match tokio::time::timeout(STOP_TIMEOUT, self.process.wait()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(timeout = ?STOP_TIMEOUT, "Server ignored SIGTERM, killing it");
                self.process.kill()?;
                self.process.wait().await?
            }
        };

        tracing::info!(exit_code = code, "Server stopped");
        Ok(code)
    }
}

/// Kills a server nobody will supervise and reaps it.
async fn discard(process: &mut ServerProcess) {
    if let Err(e) = process.kill() {
        tracing::warn!(error = %e, "Failed to kill unsupervised server");
        return;
    }
    if let Err(e) = process.wait().await {
        tracing::warn!(error = %e, "Failed to reap unsupervised server");
    }
}
