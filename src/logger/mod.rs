//! Structured logging system for universe-prep
//!
//! This module provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via `--debug <tag>` flags
//! - Dual output: colored console + daily log file
//! - A `log` crate bridge so HTTP library records land in the same stream
//!
//! ## Usage
//!
//! ```rust,no_run
//! use universe_prep::logger::{self, LogTag};
//!
//! logger::error(LogTag::Risk, "TokenSniffer replied HTTP 500");
//! logger::warning(LogTag::Universe, "Pair skipped: below risk threshold");
//! logger::info(LogTag::Export, "Wrote price CSV");
//! logger::debug(LogTag::Liquidity, "Raw samples: ..."); // Only with --debug liquidity
//! logger::verbose(LogTag::Api, "Response body: ..."); // Only with --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup, before any pipeline runs:
//! ```rust,no_run
//! use universe_prep::logger::{self, LoggerConfig};
//! logger::init(LoggerConfig::default());
//! ```

mod bridge;
mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Installs the configuration, opens the log file (when a log directory is
/// configured) and registers the `log` crate bridge. Calling it twice only
/// replaces the configuration.
pub fn init(config: LoggerConfig) {
    let log_dir = config.log_dir.clone();
    set_logger_config(config);

    if let Some(dir) = log_dir {
        if let Err(e) = file::init_file_logging(&dir) {
            eprintln!("Failed to initialize file logging in {}: {}", dir.display(), e);
        }
    }

    bridge::install();
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues)
///
/// Soft skips of the pipelines (pairs dropped by the risk gate, notebooks
/// skipped by pragma) are reported at this level.
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics)
///
/// Debug logs are ONLY shown when `--debug <tag>` names the tag.
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing, `--verbose` only)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
///
/// Call this before process exit so the file log is complete.
pub fn flush() {
    file::flush_file_logging();
}
