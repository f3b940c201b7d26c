/*!
 # php-devserver

 Run PHP's built-in web server for local development, either attached to the
 terminal or in the background.

 ## Overview

 php-devserver provides functionality to:
 - Run the server in the foreground, relaying its output and exit code
 - Start the server as a detached background process
 - Stop a background server again
 - Refuse to start when something already listens on the address

 A background server is tracked by an empty lock file in the temp directory,
 named after its address (`127.0.0.1:8000` → `127-0-0-1-8000.pid`). The
 process supervising the server polls that file and stops the server once
 it is gone; `server:stop` does nothing but delete it.

 ## Basic Usage

 ```no_run
 use php_devserver::{Address, DevServer, config::Config};

 #[tokio::main]
 async fn main() {
     let config = Config {
         document_root: "public".into(),
         ..Config::default()
     };
     let server = DevServer::new(config);
     let address = Address::resolve("127.0.0.1", "8080");

     // Blocks until the server exits
     let exit_code = server.run(&address).await;
     std::process::exit(exit_code);
 }
 ```
*/

pub mod address;
pub mod config;
pub mod error;
pub mod server;

pub use address::Address;
pub use config::Config;
pub use error::{Error, Result};
pub use server::{
    DaemonCapability, ExecutableLocator, LockFile, OutputRelay, Reporter, ServerProcess,
    ServerStatus, Verbosity,
};

use server::daemon::{self, Supervisor, SupervisorCommand};
use server::foreground::{foreground_output, run_attached};
use server::report::{ConsoleReporter, ReporterExt};
use server::{CollisionDetector, PhpExecutableLocator};
use std::path::Path;
use std::sync::Arc;

/// Runs, starts and stops the development web server.
///
/// Every command reports its progress through a [`Reporter`] and returns
/// the exit code of the command rather than a `Result`: all failures have
/// already been reported by the time it returns.
/// All public methods are instrumented with `tracing` spans.
pub struct DevServer {
    /// Configuration
    config: Config,
    /// Finds the server executable
    locator: Arc<dyn ExecutableLocator>,
    /// Receives status messages
    reporter: Arc<dyn Reporter>,
    /// Output relay for foreground runs, replacing the terminal
    relay: Option<OutputRelay>,
    /// Verbosity of foreground runs
    verbosity: Verbosity,
    /// Background supervisor launcher; the current binary when unset
    supervisor: Option<SupervisorCommand>,
}

impl DevServer {
    /// Create a server from a configuration file path
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        config::validate_config(&config)?;
        Ok(Self::new(config))
    }

    /// Create a server from a configuration
    pub fn new(config: Config) -> Self {
        let locator = Arc::new(PhpExecutableLocator::new(config.binary.clone()));
        Self {
            config,
            locator,
            reporter: Arc::new(ConsoleReporter),
            relay: None,
            verbosity: Verbosity::Normal,
            supervisor: None,
        }
    }

    /// Replace the executable locator
    pub fn with_locator(mut self, locator: Arc<dyn ExecutableLocator>) -> Self {
        self.locator = locator;
        self
    }

    /// Replace the status message reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Relay foreground output through `relay` instead of the terminal
    pub fn with_relay(mut self, relay: OutputRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Launch background supervisors with a specific program
    pub fn with_supervisor_command(mut self, supervisor: SupervisorCommand) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lock file tracking a background server on `address`
    pub fn lock_file(&self, address: &Address) -> LockFile {
        LockFile::in_dir(self.config.lock_dir(), address)
    }

    /// Whether a server is already tracked or listening on `address`
    pub async fn is_other_server_running(&self, address: &Address) -> bool {
        CollisionDetector::new(self.config.lock_dir(), self.config.probe_timeout())
            .is_other_server_running(address)
            .await
    }

    /// Run the server in the foreground until it exits.
    ///
    /// Returns the server's exit code, or 1 if it could not be started.
    #[tracing::instrument(skip(self), fields(address = %address))]
    pub async fn run(&self, address: &Address) -> i32 {
        match self.try_run(address).await {
            Ok(code) => code,
            Err(e) => self.fail(&e, &[]),
        }
    }

    /// Start the server in the background.
    ///
    /// Returns 0 once the background supervisor has been launched; the
    /// server itself comes up asynchronously. With `force`, an existing lock
    /// file or listener on the address is ignored.
    #[tracing::instrument(skip(self), fields(address = %address))]
    pub async fn start(&self, address: &Address, force: bool) -> i32 {
        match self.try_start(address, force).await {
            Ok(()) => {
                self.reporter
                    .success(format!("Web server listening on http://{}", address));
                0
            }
            Err(e @ Error::AddressCollision(_)) => self.fail(
                &e,
                &["Use the --force option if the server process terminated unexpectedly to start a new web server process."],
            ),
            Err(e @ Error::ForkUnavailable(_)) => self.fail(
                &e,
                &["You can use the \"server:run\" command instead to run the built-in web server."],
            ),
            Err(e) => self.fail(&e, &[]),
        }
    }

    /// Stop a background server by removing its lock file.
    ///
    /// Returns as soon as the lock file is gone; the server exits within one
    /// poll interval of its supervisor. Fails if there is no lock file.
    #[tracing::instrument(skip(self), fields(address = %address))]
    pub fn stop(&self, address: &Address) -> i32 {
        match self.try_stop(address) {
            Ok(()) => {
                self.reporter.success(format!(
                    "Stopped the web server listening on http://{}",
                    address
                ));
                0
            }
            Err(e) => self.fail(&e, &[]),
        }
    }

    /// Body of the background supervisor process.
    ///
    /// Detaches from the terminal session, starts the server and watches
    /// the lock file until it is removed and the server has exited. Only
    /// meant to run in the process launched by [`start`](Self::start).
    #[tracing::instrument(skip(self), fields(address = %address))]
    pub async fn supervise(&self, address: &Address) -> i32 {
        match self.try_supervise(address).await {
            Ok(()) => 0,
            Err(e) => self.fail(&e, &[]),
        }
    }

    async fn try_run(&self, address: &Address) -> Result<i32> {
        self.check_document_root()?;
        self.check_collision(address).await?;
        self.warn_production();

        self.reporter
            .success(format!("Server running on http://{}", address));
        self.reporter.comment("Quit the server with CONTROL-C.");

        let mut process = self.create_process(address)?;
        let output = foreground_output(self.verbosity, self.relay.clone());
        let output_disabled = output.is_disabled();

        let code = run_attached(&mut process, output).await?;
        if code != 0 {
            tracing::warn!(exit_code = code, "Server terminated unexpectedly");
            let mut lines = vec!["Built-in server terminated unexpectedly.".to_string()];
            if output_disabled {
                lines.push("Run the command again with -v option for more details.".to_string());
            }
            self.reporter.error(lines);
        }

        Ok(code)
    }

    async fn try_start(&self, address: &Address, force: bool) -> Result<()> {
        if let DaemonCapability::Unavailable(reason) = daemon::daemon_capability() {
            return Err(Error::ForkUnavailable(reason));
        }

        self.check_document_root()?;
        if force {
            tracing::debug!("Skipping collision check");
        } else {
            self.check_collision(address).await?;
        }
        self.warn_production();

        let supervisor = match &self.supervisor {
            Some(supervisor) => supervisor.clone(),
            None => SupervisorCommand::current_exe()?,
        };
        supervisor.spawn(address, &self.handoff_config()?)?;

        Ok(())
    }

    fn try_stop(&self, address: &Address) -> Result<()> {
        let lock = self.lock_file(address);
        if !lock.remove()? {
            return Err(Error::LockNotFound(address.clone()));
        }
        tracing::info!(lock_file = %lock.path().display(), "Requested background server stop");
        Ok(())
    }

    async fn try_supervise(&self, address: &Address) -> Result<()> {
        daemon::detach_session()?;

        let process = self.create_process(address)?;
        let supervisor = Supervisor::start(
            process,
            self.lock_file(address),
            self.config.poll_interval(),
        )
        .await?;
        supervisor.watch().await?;

        Ok(())
    }

    fn check_document_root(&self) -> Result<()> {
        if !self.config.document_root.is_dir() {
            return Err(Error::DocumentRootMissing(self.config.document_root.clone()));
        }
        Ok(())
    }

    async fn check_collision(&self, address: &Address) -> Result<()> {
        if self.is_other_server_running(address).await {
            return Err(Error::AddressCollision(address.clone()));
        }
        Ok(())
    }

    fn warn_production(&self) {
        if self.config.production_mode {
            self.reporter.warning(
                "Running PHP built-in server in production environment is NOT recommended!",
            );
        }
    }

    fn create_process(&self, address: &Address) -> Result<ServerProcess> {
        let executable = self
            .locator
            .locate()
            .ok_or_else(|| Error::ExecutableNotFound(self.locator.name().to_string()))?;
        tracing::debug!(executable = %executable.display(), "Located server executable");

        Ok(ServerProcess::new(
            executable,
            address.clone(),
            self.config.document_root.clone(),
        )
        .with_env(self.config.env.clone()))
    }

    /// Configuration for the supervisor, with paths made independent of
    /// the working directory.
    fn handoff_config(&self) -> Result<Config> {
        let mut config = self.config.clone();
        config.document_root = config.document_root.canonicalize()?;
        config.lock_dir = Some(self.config.lock_dir());
        if config.binary.is_none() {
            config.binary = self.locator.locate();
        }
        Ok(config)
    }

    fn fail(&self, error: &Error, hints: &[&str]) -> i32 {
        tracing::error!(error = %error, "Command failed");
        let mut lines = vec![error.to_string()];
        lines.extend(hints.iter().map(|hint| hint.to_string()));
        self.reporter.error(lines);
        error.exit_code()
    }
}
