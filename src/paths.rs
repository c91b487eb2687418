//! Centralized path resolution for universe-prep
//!
//! Every file and directory the pipelines touch is resolved here. Config
//! fields that name a path win when non-empty, otherwise the path lives under
//! the base directory.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.cache/universe-prep/
//! ├── datasets/            (downloaded Trading Strategy datasets)
//! ├── binance/             (per-symbol candle cache)
//! ├── prefiltered/         (CSV and Parquet outputs)
//! ├── logs/
//! │   └── universe-prep_*.log
//! └── tokensniffer.sqlite  (risk score cache)
//! ```
//!
//! `UNIVERSE_PREP_HOME` overrides the base directory.

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

use crate::config::Config;

const APP_DIR: &str = "universe-prep";
const HOME_ENV: &str = "UNIVERSE_PREP_HOME";

static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(resolve_base_directory);

/// Platform cache directory, falling back to the home directory
fn resolve_base_directory() -> PathBuf {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(dir) = dirs::cache_dir() {
        return dir.join(APP_DIR);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".cache").join(APP_DIR);
    }

    PathBuf::from(APP_DIR)
}

fn configured_or(configured: &str, default: PathBuf) -> PathBuf {
    if configured.trim().is_empty() {
        default
    } else {
        PathBuf::from(configured)
    }
}

pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

pub fn get_dataset_directory(config: &Config) -> PathBuf {
    configured_or(&config.market_data.cache_dir, BASE_DIRECTORY.join("datasets"))
}

pub fn get_output_directory(config: &Config) -> PathBuf {
    configured_or(&config.output.directory, BASE_DIRECTORY.join("prefiltered"))
}

pub fn get_risk_cache_path(config: &Config) -> PathBuf {
    configured_or(&config.risk.cache_path, BASE_DIRECTORY.join("tokensniffer.sqlite"))
}

pub fn get_binance_cache_directory(config: &Config) -> PathBuf {
    configured_or(&config.binance.cache_dir, BASE_DIRECTORY.join("binance"))
}

/// Create a directory tree if it is missing
pub fn ensure_directory(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}
