//! Bridge configuration (solverlink.toml)
//!
//! A file is read as a [`ConfigLayer`]: every section and field is optional,
//! and only the fields a layer sets override the layers below it. Resolving
//! layers over the defaults gives a [`BridgeConfig`].

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default native library name (resolved to `libmathsat.so` etc.)
pub const DEFAULT_LIBRARY: &str = "mathsat";

/// Default host namespace for entry-point names
pub const DEFAULT_NAMESPACE: &str = "solverlink.NativeApi";

/// Log levels accepted in `[logging] level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Complete bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Native library selection
    #[serde(default)]
    pub library: LibraryConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Host-side naming
    #[serde(default)]
    pub host: HostConfig,
}

/// `[library]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Short name ("mathsat") or absolute path of the solver library
    #[serde(default = "default_library")]
    pub name: String,

    /// Extra directories searched before the platform defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive; a bare level or a full `EnvFilter` expression
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// `[host]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Dotted namespace of the host class exposing the entry points
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_library() -> String {
    DEFAULT_LIBRARY.to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: default_library(),
            search_paths: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

/// One configuration file as written: `None` means "not set here"
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub library: LibraryLayer,
    #[serde(default)]
    pub logging: LoggingLayer,
    #[serde(default)]
    pub host: HostLayer,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibraryLayer {
    pub name: Option<String>,
    pub search_paths: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingLayer {
    pub level: Option<String>,
    pub json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HostLayer {
    pub namespace: Option<String>,
}

impl ConfigLayer {
    /// Read and validate one configuration file
    ///
    /// Values are validated as they would resolve over the defaults.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let layer = Self::parse(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        BridgeConfig::default().with_layer(&layer).validate()?;
        Ok(layer)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl BridgeConfig {
    /// Load one configuration file resolved over the defaults
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let layer = ConfigLayer::load_from_file(path)?;
        Ok(Self::default().with_layer(&layer))
    }

    /// Parse TOML text over the defaults without validating it
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        ConfigLayer::parse(content).map(|layer| Self::default().with_layer(&layer))
    }

    /// Validate field values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.library.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "library.name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        validate_level(&self.logging.level)?;

        let namespace = &self.host.namespace;
        if namespace.is_empty()
            || namespace.starts_with('.')
            || namespace.ends_with('.')
            || namespace.contains("..")
        {
            return Err(ConfigError::InvalidValue {
                field: "host.namespace".to_string(),
                reason: format!("'{}' is not a dotted name", namespace),
            });
        }

        Ok(())
    }

    /// Override with every field `layer` sets
    ///
    /// Search paths are the exception: the layer's paths are searched
    /// before the ones already configured.
    pub fn apply(&mut self, layer: &ConfigLayer) {
        if let Some(name) = &layer.library.name {
            self.library.name = name.clone();
        }
        if let Some(paths) = &layer.library.search_paths {
            let mut merged = paths.clone();
            merged.append(&mut self.library.search_paths);
            self.library.search_paths = merged;
        }
        if let Some(level) = &layer.logging.level {
            self.logging.level = level.clone();
        }
        if let Some(json) = layer.logging.json {
            self.logging.json = json;
        }
        if let Some(namespace) = &layer.host.namespace {
            self.host.namespace = namespace.clone();
        }
    }

    fn with_layer(mut self, layer: &ConfigLayer) -> Self {
        self.apply(layer);
        self
    }
}

/// Accept a bare level, or an `EnvFilter`-style directive list whose
/// level components are all known.
fn validate_level(level: &str) -> ConfigResult<()> {
    let invalid = || ConfigError::InvalidValue {
        field: "logging.level".to_string(),
        reason: format!("unknown level in '{}'", level),
    };

    if level.trim().is_empty() {
        return Err(invalid());
    }

    for directive in level.split(',') {
        let lvl = match directive.rsplit_once('=') {
            Some((_, lvl)) => lvl,
            None => directive,
        };
        if !LOG_LEVELS.contains(&lvl.trim().to_lowercase().as_str()) {
            return Err(invalid());
        }
    }
    Ok(())
}
