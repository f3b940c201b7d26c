/// Error handling module for php-devserver.
///
/// This module defines the error types used throughout the library.
/// Every failure of the `run`, `start` and `stop` operations maps to one
/// variant here, and every variant is reported to the user with exit code 1.
///
/// # Example
///
/// ```
/// use php_devserver::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::AddressCollision(address)) => println!("{} is taken", address),
///         Err(Error::LockNotFound(address)) => println!("Nothing to stop on {}", address),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use crate::address::Address;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while supervising the development web server.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration file cannot be read
    /// - The configuration JSON is malformed
    /// - Field types are incorrect
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration is valid JSON but contains invalid values.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The document root directory does not exist.
    #[error("Document root directory '{}' does not exist", .0.display())]
    DocumentRootMissing(PathBuf),

    /// Something is already listening on the address, or a lock file
    /// claims it.
    ///
    /// Recoverable with `--force` (start only) or by choosing another address.
    #[error("A process is already listening on http://{0}.")]
    AddressCollision(Address),

    /// The web server executable could not be located.
    #[error("Unable to find {0} binary to run server.")]
    ExecutableNotFound(String),

    /// The platform cannot detach a process into its own session.
    #[error("Background mode is unavailable: {0}")]
    ForkUnavailable(String),

    /// The background supervisor process could not be created.
    #[error("Unable to start the server process: {0}")]
    ForkFailed(String),

    /// The server process did not come up.
    #[error("Unable to start the server process: {0}")]
    SpawnFailed(String),

    /// The supervisor could not become a session leader.
    #[error("Unable to set the child process as session leader: {0}")]
    SessionDetachFailed(String),

    /// `stop` was asked to stop an address with no lock file.
    #[error("No web server is listening on http://{0}")]
    LockNotFound(Address),

    /// Error when waiting on, signalling or reading from the server process.
    #[error("Server process error: {0}")]
    Process(String),

    /// Filesystem error, e.g. while creating or removing a lock file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit code reported to the shell for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Result type for php-devserver operations.
pub type Result<T> = std::result::Result<T, Error>;
