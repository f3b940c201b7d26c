// src/server/process.rs
use crate::address::Address;
use crate::error::{Error, Result};
use async_process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use futures_lite::io::{AsyncBufReadExt, AsyncRead, BufReader};
use futures_lite::StreamExt;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Status of a server process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Server is starting
    Starting,
    /// Server is running
    Running,
    /// Server was asked to terminate
    Stopping,
    /// Server has exited successfully, or was never started
    Stopped,
    /// Server failed to start or exited with a non-zero code
    Failed,
}

/// Which output stream of the server a relayed line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Callback receiving the server's output, one line at a time.
pub type OutputRelay = Arc<dyn Fn(StreamKind, &str) + Send + Sync>;

/// How the server's standard streams are wired.
#[derive(Clone)]
pub enum OutputMode {
    /// Output is discarded.
    Disabled,
    /// The server shares the current terminal.
    Inherit,
    /// Output is piped and forwarded line by line.
    Relay(OutputRelay),
}

impl OutputMode {
    pub fn is_disabled(&self) -> bool {
        matches!(self, OutputMode::Disabled)
    }
}

impl fmt::Debug for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Disabled => f.write_str("Disabled"),
            OutputMode::Inherit => f.write_str("Inherit"),
            OutputMode::Relay(_) => f.write_str("Relay"),
        }
    }
}

/// Relay that writes to this process' own stdout and stderr.
pub fn stdio_relay() -> OutputRelay {
    Arc::new(|kind: StreamKind, line: &str| match kind {
        StreamKind::Stdout => println!("{}", line),
        StreamKind::Stderr => eprintln!("{}", line),
    })
}

/// A PHP built-in web server process bound to one address and document root.
pub struct ServerProcess {
    executable: PathBuf,
    address: Address,
    document_root: PathBuf,
    env: HashMap<String, String>,
    child: Option<Child>,
    relay_task: Option<JoinHandle<()>>,
    status: ServerStatus,
    exit_code: Option<i32>,
}

impl ServerProcess {
    /// Create a server process; nothing is spawned until [`start`](Self::start).
    pub fn new(executable: PathBuf, address: Address, document_root: PathBuf) -> Self {
        Self {
            executable,
            address,
            document_root,
            env: HashMap::new(),
            child: None,
            relay_task: None,
            status: ServerStatus::Stopped,
            exit_code: None,
        }
    }

    /// Add environment variables for the spawned server.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Get the address the server binds to
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Get the server status
    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Exit code, once the process has exited
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// OS process id, while a child exists
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(|c| c.id())
    }

    /// Executable path
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments passed to the executable: `-S <address> -t <document root>`.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "-S".into(),
            self.address.as_str().into(),
            "-t".into(),
            self.document_root.clone().into_os_string(),
        ]
    }

    /// Start the server process without waiting for it.
    #[tracing::instrument(skip(self), fields(address = %self.address))]
    pub fn start(&mut self, output: OutputMode) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::Process("Server process already started".to_string()));
        }

        self.status = ServerStatus::Starting;

        let mut command = Command::new(&self.executable);
        command.args(self.args()).current_dir(&self.document_root);

        for (key, value) in &self.env {
            command.env(key, value);
        }

        match &output {
            OutputMode::Disabled => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
            }
            OutputMode::Inherit => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            OutputMode::Relay(_) => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
        }

        let mut child = command.spawn().map_err(|e| {
            self.status = ServerStatus::Failed;
            Error::SpawnFailed(format!("{}: {}", self.executable.display(), e))
        })?;
        tracing::debug!(pid = child.id(), mode = ?output, "Spawned server process");

        if let OutputMode::Relay(relay) = output {
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            self.relay_task = Some(tokio::spawn(relay_output(stdout, stderr, relay)));
        }

        self.child = Some(child);
        self.status = ServerStatus::Running;

        Ok(())
    }

    /// Whether the process is still alive. Records the exit code once it isn't.
    pub fn is_running(&mut self) -> Result<bool> {
        let Some(child) = self.child.as_mut() else {
            return Ok(false);
        };

        match child.try_status()? {
            None => Ok(true),
            Some(status) => {
                self.record_exit(status);
                Ok(false)
            }
        }
    }

    /// Ask the process to exit gracefully (SIGTERM on Unix).
    pub fn terminate(&mut self) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            return Err(Error::Process("Server process is not running".to_string()));
        };

        self.status = ServerStatus::Stopping;
        send_terminate(child)
    }

    /// Kill the process outright (SIGKILL on Unix).
    pub fn kill(&mut self) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            return Err(Error::Process("Server process is not running".to_string()));
        };

        self.status = ServerStatus::Stopping;
        child
            .kill()
            .map_err(|e| Error::Process(format!("Failed to kill process: {}", e)))
    }

    /// Wait for the process to exit and return its exit code.
    ///
    /// Relayed output is drained before this returns.
    pub async fn wait(&mut self) -> Result<i32> {
        let Some(child) = self.child.as_mut() else {
            return self
                .exit_code
                .ok_or_else(|| Error::Process("Server process was never started".to_string()));
        };

        let status = child
            .status()
            .await
            .map_err(|e| Error::Process(format!("Failed to wait for server process: {}", e)))?;
        let code = self.record_exit(status);

        if let Some(task) = self.relay_task.take() {
            let _ = task.await;
        }

        Ok(code)
    }

    /// Terminate the process and wait for it to exit.
    pub async fn stop(&mut self) -> Result<i32> {
        if self.is_running()? {
            self.terminate()?;
        }
        self.wait().await
    }

    fn record_exit(&mut self, status: ExitStatus) -> i32 {
        let code = exit_code_of(status);
        self.exit_code = Some(code);
        self.status = if code == 0 || self.status == ServerStatus::Stopping {
            ServerStatus::Stopped
        } else {
            ServerStatus::Failed
        };
        tracing::debug!(exit_code = code, status = ?self.status, "Server process exited");
        code
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> Result<()> {
    let pid = child.id() as libc::pid_t;
    // SAFETY: plain signal delivery to our own child.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == -1 {
        let err = std::io::Error::last_os_error();
        // ESRCH: already gone, nothing to terminate.
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(Error::Process(format!("Failed to terminate process: {}", err)));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> Result<()> {
    child
        .kill()
        .map_err(|e| Error::Process(format!("Failed to kill process: {}", e)))
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

async fn relay_output(
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    relay: OutputRelay,
) {
    futures::future::join(
        relay_lines(stdout, StreamKind::Stdout, Arc::clone(&relay)),
        relay_lines(stderr, StreamKind::Stderr, relay),
    )
    .await;
}

async fn relay_lines<R>(stream: Option<R>, kind: StreamKind, relay: OutputRelay)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };

    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => relay(kind, &line),
            Err(e) => {
                tracing::warn!(error = %e, stream = ?kind, "Failed to read server output");
                break;
            }
        }
    }
}
