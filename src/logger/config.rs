/// Runtime logger configuration
///
/// Built once from the command line and swapped in by `logger::init`.
use std::collections::HashSet;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::levels::LogLevel;
use super::tags::LogTag;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Highest level that reaches the console
    pub min_level: LogLevel,
    /// Tags with debug output enabled (`--debug <tag>`)
    pub debug_tags: HashSet<String>,
    /// Directory for daily log files, None disables file logging
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            log_dir: None,
        }
    }
}

impl LoggerConfig {
    /// Build from CLI flags
    ///
    /// `--verbose` wins over `--quiet`. Debug tag names are matched
    /// case-insensitively against `LogTag::to_debug_key`.
    pub fn from_flags(debug_tags: &[String], verbose: bool, quiet: bool) -> Self {
        let min_level = if verbose {
            LogLevel::Verbose
        } else if !debug_tags.is_empty() {
            LogLevel::Debug
        } else if quiet {
            LogLevel::Warning
        } else {
            LogLevel::Info
        };

        Self {
            min_level,
            debug_tags: debug_tags.iter().map(|t| t.to_lowercase()).collect(),
            ..Default::default()
        }
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Get a copy of the active configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

/// Replace the active configuration
pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub(super) fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = LOGGER_CONFIG.read();
    config.min_level == LogLevel::Verbose
        || config.debug_tags.contains("all")
        || config.debug_tags.contains(&tag.to_debug_key())
}

pub(super) fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    let config = LOGGER_CONFIG.read();
    config.min_level == LogLevel::Verbose
        || config.debug_tags.contains(&format!("{}-verbose", tag.to_debug_key()))
}
