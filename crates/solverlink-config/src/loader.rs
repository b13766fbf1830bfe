//! Configuration Loader
//!
//! Layered loading of bridge configuration: global file, project file, environment.

use crate::bridge::{BridgeConfig, ConfigLayer};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const PROJECT_FILE: &str = "solverlink.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.solverlink/config.toml) - lowest priority
/// 2. Project config (./solverlink.toml) - overrides global
/// 3. Environment variables (SOLVERLINK_*) - overrides project
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config file instead of the one under the home directory
    pub fn with_global_path(path: PathBuf) -> Self {
        Self {
            global_config_path: Some(path),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find solverlink.toml, merges it over the
    /// global config (if any), then applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<BridgeConfig> {
        let mut config = self.load_global_config()?;

        if let Some(project) = Self::find_project_config(start_dir)? {
            config.apply(&project);
        }

        Self::apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<BridgeConfig> {
        let project = ConfigLayer::load_from_file(config_path)?;
        let mut config = self.load_global_config()?;
        config.apply(&project);

        Self::apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(start_dir: &Path) -> ConfigResult<Option<ConfigLayer>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_FILE);

            if config_path.exists() {
                return ConfigLayer::load_from_file(&config_path).map(Some);
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok(None),
            }
        }
    }

    /// Load global configuration, defaulting when the file is absent
    fn load_global_config(&mut self) -> ConfigResult<BridgeConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match Self::global_config_dir() {
                Ok(dir) => {
                    let path = dir.join("config.toml");
                    self.global_config_path = Some(path.clone());
                    path
                }
                // No home directory: nothing global to load
                Err(ConfigError::HomeNotFound) => return Ok(BridgeConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(BridgeConfig::default());
        }

        BridgeConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides
    ///
    /// - SOLVERLINK_LIBRARY: library name or path
    /// - SOLVERLINK_LOG: logging level / filter directive
    /// - SOLVERLINK_LOG_JSON: enable JSON log output
    fn apply_env_overrides(config: &mut BridgeConfig) {
        if let Ok(library) = env::var("SOLVERLINK_LIBRARY") {
            config.library.name = library;
        }

        if let Ok(level) = env::var("SOLVERLINK_LOG") {
            config.logging.level = level;
        }

        if let Ok(json) = env::var("SOLVERLINK_LOG_JSON") {
            config.logging.json = matches!(json.to_lowercase().as_str(), "true" | "1" | "yes");
        }
    }

    /// Get the global configuration directory (~/.solverlink)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".solverlink"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
