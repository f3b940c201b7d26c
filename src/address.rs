//! Address resolution.
//!
//! Turns the `address` argument and `--port` option of the commands into the
//! canonical `host:port` form every other component works with. No syntax
//! validation happens here; a malformed address surfaces later as a spawn or
//! connect failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: &str = "8000";

/// A fully qualified `host:port` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Resolves a raw address argument and a port option into `host:port`.
    ///
    /// If `raw` already contains a `:` it is used as-is and `port` is ignored.
    ///
    /// ```
    /// use php_devserver::Address;
    ///
    /// assert_eq!(Address::resolve("example.com", "9000").as_str(), "example.com:9000");
    /// assert_eq!(Address::resolve("example.com:8080", "9000").as_str(), "example.com:8080");
    /// ```
    pub fn resolve(raw: &str, port: &str) -> Self {
        if raw.contains(':') {
            Self(raw.to_string())
        } else {
            Self(format!("{}:{}", raw, port))
        }
    }

    /// The canonical `host:port` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem used for this address' lock file: `.` and `:` become `-`.
    pub fn lock_stem(&self) -> String {
        self.0.replace(['.', ':'], "-")
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::resolve(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
