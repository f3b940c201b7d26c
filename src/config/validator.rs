use crate::config::Config;
use crate::error::{Error, Result};

/// Validates a configuration before any command uses it.
///
/// Existence of the document root is not checked here; the commands report
/// a missing document root themselves.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.document_root.as_os_str().is_empty() {
        return Err(Error::ConfigInvalid("documentRoot is empty".to_string()));
    }

    if let Some(binary) = &config.binary {
        if binary.as_os_str().is_empty() {
            return Err(Error::ConfigInvalid("binary is empty".to_string()));
        }
    }

    if config.poll_interval_ms == 0 {
        return Err(Error::ConfigInvalid(
            "pollIntervalMs must be greater than zero".to_string(),
        ));
    }

    if config.probe_timeout_ms == 0 {
        return Err(Error::ConfigInvalid(
            "probeTimeoutMs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
