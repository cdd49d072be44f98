#![deny(missing_docs)]
//! Shared logging utilities for the importer workspace.
//!
//! This crate provides the `importer_*` logging macros used across the codebase,
//! the logger initialization used by the command-line driver, and a minimal
//! test initializer for the global logger.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Environment variable selecting the log level.
pub const LOG_LEVEL_ENV: &str = "HTML2DOCX_LOG";

/// Environment variable naming an optional log file.
pub const LOG_FILE_ENV: &str = "HTML2DOCX_LOG_FILE";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! importer_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! importer_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! importer_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! importer_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! importer_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Logger configuration for the command-line driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Maximum level emitted by every logger.
    pub level: LevelFilter,
    /// When set, log records are also written to this file.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file: None,
        }
    }
}

impl LogSettings {
    /// Reads [`LOG_LEVEL_ENV`] and [`LOG_FILE_ENV`].
    pub fn from_env() -> Self {
        let level = std::env::var(LOG_LEVEL_ENV).ok();
        let file = std::env::var(LOG_FILE_ENV).ok();
        Self::from_values(level.as_deref(), file.as_deref())
    }

    /// Builds settings from raw values; unknown levels fall back to `info`.
    pub fn from_values(level: Option<&str>, file: Option<&str>) -> Self {
        let level = level
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .and_then(|l| {
                let parsed = l.parse::<LevelFilter>().ok();
                if parsed.is_none() {
                    eprintln!("Warning: unknown log level {l:?}, using info");
                }
                parsed
            })
            .unwrap_or(LevelFilter::Info);
        let file = file
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(PathBuf::from);
        Self { level, file }
    }
}

/// Initialize the global logger with a terminal logger and, when configured,
/// a file logger.
///
/// Does nothing if a logger is already installed.
pub fn initialize(settings: &LogSettings) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        settings.level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = settings.file.as_ref() {
        if let Some(file_logger) = create_file_logger(path, settings.level, config) {
            loggers.push(file_logger);
        }
    }

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: &PathBuf,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info_without_file() {
        let settings = LogSettings::from_values(None, None);
        assert_eq!(settings, LogSettings::default());
    }

    #[test]
    fn parses_level_case_insensitively_and_keeps_file() {
        let settings = LogSettings::from_values(Some("DEBUG"), Some("run.log"));
        assert_eq!(settings.level, LevelFilter::Debug);
        assert_eq!(settings.file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let settings = LogSettings::from_values(Some("loud"), Some("  "));
        assert_eq!(settings.level, LevelFilter::Info);
        assert_eq!(settings.file, None);
    }

    #[test]
    fn unwritable_log_file_is_skipped() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("missing").join("run.log");
        assert!(create_file_logger(&missing, LevelFilter::Info, build_config()).is_none());
    }
}
