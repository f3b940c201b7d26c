/// Server supervision module for php-devserver.
///
/// This module handles spawning PHP's built-in web server, tracking a
/// background instance through its lock file, detecting address collisions
/// and relaying the server's output. All public entry points are
/// instrumented with `tracing` spans.
///
/// # Components
///
/// * `daemon` - Background supervisor launch and lock file polling loop
/// * `detect` - Lock file and TCP connect collision detection
/// * `foreground` - Running the server attached to the current terminal
/// * `locator` - Finding the PHP executable
/// * `lock` - The per-address lock file
/// * `process` - The server process itself
/// * `report` - Human-readable status messages
///
/// # Examples
///
/// Checking an address before starting a server:
///
/// ```no_run
/// use php_devserver::Address;
/// use php_devserver::server::{CollisionDetector, LockFile};
/// use std::time::Duration;
///
/// # async fn check() {
/// let address = Address::resolve("127.0.0.1", "8000");
/// let detector = CollisionDetector::new(std::env::temp_dir(), Duration::from_secs(5));
///
/// if detector.is_other_server_running(&address).await {
///     println!("{} is taken", address);
/// }
/// println!("lock file: {}", LockFile::for_address(&address).path().display());
/// # }
/// ```
///
/// Running a server process until it exits:
///
/// ```no_run
/// use php_devserver::Address;
/// use php_devserver::server::{OutputMode, ServerProcess};
///
/// # async fn run() -> php_devserver::Result<()> {
/// let mut process = ServerProcess::new(
///     "/usr/bin/php".into(),
///     Address::resolve("127.0.0.1", "8000"),
///     "public".into(),
/// );
/// process.start(OutputMode::Inherit)?;
/// let exit_code = process.wait().await?;
/// # Ok(())
/// # }
/// ```
pub mod daemon;
pub mod detect;
pub mod foreground;
pub mod locator;
pub mod lock;
mod process;
pub mod report;

pub use daemon::{DaemonCapability, Supervisor, SupervisorCommand, daemon_capability};
pub use detect::CollisionDetector;
pub use foreground::Verbosity;
pub use locator::{ExecutableLocator, PhpExecutableLocator};
pub use lock::LockFile;
pub use process::{OutputMode, OutputRelay, ServerProcess, ServerStatus, StreamKind, stdio_relay};
pub use report::{
    ConsoleReporter, MessageLevel, RecordingReporter, Reporter, ReporterExt, StatusMessage,
};
