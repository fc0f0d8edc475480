//! Error types for process orchestration and configuration.

use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort the pipeline currently being built.
///
/// The `Display` form is what the user sees, so it mirrors `perror` output.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("pipe: {0}")]
    Pipe(Errno),

    #[error("fork: {0}")]
    Fork(Errno),

    #[error("wait: {0}")]
    Wait(Errno),

    /// An argument or path contains an interior nul byte and cannot be passed to exec.
    #[error("{0}: argument contains a nul byte")]
    NulByte(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}
