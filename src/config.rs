// src/config.rs

//! Loading `config.toml`.

use crate::constants::{
    CONFIG_FILENAME, DEFAULT_MAX_ARGUMENTS, DEFAULT_MAX_BACKGROUND_JOBS, DEFAULT_MAX_LINE_LENGTH,
    DEFAULT_PROMPT, SHELL_NAME,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why the configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The platform has no per-user config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// Reading or writing a file or directory failed.
    #[error("Config file '{path}' could not be read or written: {source}")]
    Io {
        /// The file or directory involved.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for `ShellConfig`.
    #[error("Failed to parse '{path}': {source}")]
    TomlParse {
        /// The offending file.
        path: String,
        /// The parser's report.
        #[source]
        source: toml::de::Error,
    },
    /// The defaults could not be rendered as TOML.
    #[error("Failed to serialize the default config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// A limit was set to zero.
    #[error("Invalid config value: '{0}' must be greater than zero.")]
    ZeroLimit(&'static str),
}

/// Tunables of the shell, read from `config.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Text written before each line is read.
    pub prompt: String,
    /// Longest accepted input line, in bytes.
    pub max_line_length: usize,
    /// Most argument words per command, program name included.
    pub max_arguments: usize,
    /// Most background jobs tracked at once.
    pub max_background_jobs: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_arguments: DEFAULT_MAX_ARGUMENTS,
            max_background_jobs: DEFAULT_MAX_BACKGROUND_JOBS,
        }
    }
}

impl ShellConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_line_length == 0 {
            return Err(ConfigError::ZeroLimit("max_line_length"));
        }
        if self.max_arguments == 0 {
            return Err(ConfigError::ZeroLimit("max_arguments"));
        }
        if self.max_background_jobs == 0 {
            return Err(ConfigError::ZeroLimit("max_background_jobs"));
        }
        Ok(self)
    }
}

/// Returns `<config dir>/jobsh/config.toml`, creating the directory if needed.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(SHELL_NAME);
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
            path: config_dir.display().to_string(),
            source: e,
        })?;
    }
    Ok(config_dir.join(CONFIG_FILENAME))
}

/// Loads the shell configuration.
///
/// An explicit path must exist. Without one, the default location is used and
/// a file holding the defaults is written there on first run.
pub fn load_config(explicit: Option<&Path>) -> Result<ShellConfig, ConfigError> {
    match explicit {
        Some(path) => read_config(path),
        None => {
            let path = default_config_path()?;
            if path.exists() {
                read_config(&path)
            } else {
                let default_config = ShellConfig::default();
                write_config(&path, &default_config)?;
                log::debug!("Wrote default config to '{}'", path.display());
                Ok(default_config)
            }
        }
    }
}

/// Reads and validates one config file.
pub fn read_config(path: &Path) -> Result<ShellConfig, ConfigError> {
    log::debug!("Loading config from '{}'", path.display());
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let config: ShellConfig = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: path.display().to_string(),
        source: e,
    })?;
    config.validate()
}

fn write_config(path: &Path, config: &ShellConfig) -> Result<(), ConfigError> {
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

// MARK: --- UNIT TESTS ---
