use crate::config::LogConfig;
use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode, WriteLogger};
use std::fs::OpenOptions;

/// Install the global logger described by `config`.
///
/// Nothing is installed when the level is `off`, so a default shell writes no
/// diagnostics at all. Must be called at most once per process.
pub fn init(config: &LogConfig) -> Result<()> {
    let level = config.level_filter()?;
    if level == LevelFilter::Off {
        return Ok(());
    }
    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            WriteLogger::init(level, Config::default(), file)?;
        }
        None => {
            TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;
        }
    }
    Ok(())
}
