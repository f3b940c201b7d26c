use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_document_root() -> PathBuf {
    PathBuf::from("www")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

/// Configuration for the development web server.
///
/// Every field has a default, so an empty JSON object is a valid
/// configuration.
///
/// # JSON Schema
///
/// ```json
/// {
///   "documentRoot": "public",
///   "productionMode": false,
///   "binary": "/usr/local/bin/php",
///   "env": { "APP_ENV": "dev" },
///   "pollIntervalMs": 1000,
///   "probeTimeoutMs": 5000,
///   "lockDir": "/tmp"
/// }
/// ```
///
/// # Examples
///
/// ```
/// use php_devserver::config::Config;
/// use std::path::PathBuf;
///
/// let config = Config::parse_from_str(r#"{ "documentRoot": "public" }"#).unwrap();
/// assert_eq!(config.document_root, PathBuf::from("public"));
/// assert!(!config.production_mode);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory served by the web server; also its working directory.
    #[serde(default = "default_document_root")]
    pub document_root: PathBuf,

    /// When set, a warning is printed before the server is started.
    #[serde(default)]
    pub production_mode: bool,

    /// Explicit path to the web server executable.
    /// When absent the executable is looked up in `PHP_BINARY` and `PATH`.
    #[serde(default)]
    pub binary: Option<PathBuf>,

    /// Extra environment variables for the spawned server.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// How often the background supervisor checks for its lock file.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Connect timeout of the collision probe.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Directory holding lock files. Defaults to the system temp directory.
    #[serde(default)]
    pub lock_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_root: default_document_root(),
            production_mode: false,
            binary: None,
            env: HashMap::new(),
            poll_interval_ms: default_poll_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            lock_dir: None,
        }
    }
}

impl Config {
    /// Loads a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid JSON
    /// * The JSON does not conform to the expected schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Interval between lock file checks of the background supervisor.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Connect timeout of the collision probe.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Directory lock files live in.
    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
