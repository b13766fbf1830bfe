//! Solverlink Configuration
//!
//! Configuration for the solver bridge:
//! - Which native solver library to load and where to look for it
//! - Logging level and output format
//! - Host namespace used to derive entry-point names
//!
//! # Layering
//!
//! Each layer overrides the one before it: built-in defaults, then
//! `~/.solverlink/config.toml`, then `solverlink.toml` in the project
//! directory, then `SOLVERLINK_*` environment variables. Library search
//! paths are the exception: project paths are prepended to global ones.
//!
//! # Example
//!
//! ```no_run
//! use solverlink_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("loading {}", config.library.name);
//! ```

pub mod bridge;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, reading or validating bridge configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no bridge configuration at {0}")]
    NotFound(PathBuf),

    #[error("cannot read bridge configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{file} is not valid TOML: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    /// A field parsed but failed validation (empty library name, unknown
    /// log level, malformed host namespace)
    #[error("bad value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("cannot resolve the home directory for the global config")]
    HomeNotFound,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub use bridge::{BridgeConfig, ConfigLayer, HostConfig, LibraryConfig, LoggingConfig};
pub use loader::{ConfigLoader, PROJECT_FILE};
