//! Configuration module for php-devserver.
//!
//! This module handles parsing and validation of the settings the commands
//! need besides the address: the document root, the production-mode flag,
//! the server executable and the supervision timings. Configurations are
//! JSON, loaded from a file or a string.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use php_devserver::config::Config;
//!
//! let config = Config::from_file("devserver.json").unwrap();
//! println!("Serving {}", config.document_root.display());
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use php_devserver::config::{Config, validate_config};
//!
//! let config = Config {
//!     document_root: "public".into(),
//!     ..Config::default()
//! };
//! validate_config(&config).unwrap();
//! ```
mod parser;
pub mod validator;

pub use parser::Config;
pub use validator::validate_config;
