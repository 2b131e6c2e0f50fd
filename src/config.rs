use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::interop::{DEFAULT_FREE_SYMBOL, DEFAULT_INVOKE_SYMBOL};
use crate::logging::LogFormat;

/// Environment variable overriding `library.path`
pub const LIBRARY_PATH_ENV: &str = "SMA_LIBRARY_PATH";

pub const DEFAULT_BASE_NAME: &str = "com.fiskaly.kassensichv.sma";

const CONFIG_FILE_NAMES: [&str; 2] = ["sma.toml", ".sma.toml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub library: LibrarySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySettings {
    /// Explicit library file; skips platform resolution
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    #[serde(default = "default_true")]
    pub search_exe_dir: bool,

    #[serde(default = "default_base_name")]
    pub base_name: String,

    #[serde(default = "default_invoke_symbol")]
    pub invoke_symbol: String,

    #[serde(default = "default_free_symbol")]
    pub free_symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Extra filter directives, e.g. "sma_bridge=trace"
    #[serde(default)]
    pub filter: Option<String>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            path: None,
            search_paths: Vec::new(),
            search_exe_dir: true,
            base_name: default_base_name(),
            invoke_symbol: default_invoke_symbol(),
            free_symbol: default_free_symbol(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            filter: None,
        }
    }
}

fn default_true() -> bool { true }
fn default_base_name() -> String { DEFAULT_BASE_NAME.to_string() }
fn default_invoke_symbol() -> String { DEFAULT_INVOKE_SYMBOL.to_string() }
fn default_free_symbol() -> String { DEFAULT_FREE_SYMBOL.to_string() }
fn default_level() -> String { "info".to_string() }

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find and load `sma.toml` / `.sma.toml` from the current directory or its parents
    ///
    /// Falls back to defaults when no file exists. A file that exists but cannot be
    /// read or parsed is an error.
    pub fn discover() -> Result<Self, ConfigError> {
        match std::env::current_dir() {
            Ok(dir) => Self::discover_from(&dir),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn discover_from(start: &Path) -> Result<Self, ConfigError> {
        Ok(Self::try_discover_from(start)?.unwrap_or_default())
    }

    /// Load the nearest config file at or above `start`, if there is one
    pub fn try_discover_from(start: &Path) -> Result<Option<Self>, ConfigError> {
        let mut current = Some(start);

        while let Some(dir) = current {
            for name in CONFIG_FILE_NAMES {
                let config_path = dir.join(name);
                if config_path.is_file() {
                    return Self::load(&config_path).map(Some);
                }
            }
            current = dir.parent();
        }

        Ok(None)
    }

    /// Apply environment overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(LIBRARY_PATH_ENV).filter(|p| !p.is_empty()) {
            self.library.path = Some(PathBuf::from(path));
        }
        self
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }
}
