use crate::error::ConfigError;
use crate::session::{DEFAULT_FAREWELL, DEFAULT_MAX_NESTING};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "MINI_SHELL_CONFIG";

fn default_prompt() -> String {
    "shell $ ".to_string()
}

fn default_welcome() -> String {
    "Welcome to mini-shell.".to_string()
}

fn default_farewell() -> String {
    DEFAULT_FAREWELL.to_string()
}

fn default_max_nesting() -> usize {
    DEFAULT_MAX_NESTING
}

fn default_history_entries() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShellConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Printed once when the interactive loop starts.
    #[serde(default = "default_welcome")]
    pub welcome: String,
    /// Printed by `exit` and at end of input.
    #[serde(default = "default_farewell")]
    pub farewell: String,
    /// How deep `prev` and `source` may re-enter the line executor.
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            welcome: default_welcome(),
            farewell: default_farewell(),
            max_nesting: default_max_nesting(),
            history: HistoryConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Line-editor history. Only kept in memory unless `file` is set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_history_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: None,
            max_entries: default_history_entries(),
        }
    }
}

/// Diagnostic logging. Off unless a level is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// One of off, error, warn, info, debug, trace.
    #[serde(default)]
    pub level: Option<String>,
    /// Log to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LogConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        match &self.level {
            None => Ok(LevelFilter::Off),
            Some(level) => level
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("unknown log level: {level}"))),
        }
    }
}

impl ShellConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load configuration with resolution order:
    /// 1. `explicit` (the `--config` flag)
    /// 2. the file named by `MINI_SHELL_CONFIG`
    /// 3. built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting == 0 {
            return Err(ConfigError::InvalidValue(
                "max_nesting must be at least 1".to_string(),
            ));
        }
        if self.history.max_entries == 0 {
            return Err(ConfigError::InvalidValue(
                "history.max_entries must be at least 1".to_string(),
            ));
        }
        self.log.level_filter()?;
        Ok(())
    }
}
