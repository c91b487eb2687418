/// Configuration utilities - loading and validation
///
/// The configuration is loaded once in `main` and handed to the pipelines
/// by reference; there is no global instance.
use std::path::Path;

use chrono::NaiveDate;

use super::schemas::Config;
use crate::errors::{PipelineError, PipelineResult};
use crate::logger::{self, LogTag};

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "universe-prep.toml";

/// Load configuration from a specific file path
///
/// A missing file yields the defaults with a warning. A file that exists but
/// fails to parse or validate is an error.
pub fn load_config_from_path(path: &Path) -> PipelineResult<Config> {
    let config = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = parse_config(&contents)?;
        logger::info(
            LogTag::Config,
            &format!("Loaded configuration from {}", path.display()),
        );
        config
    } else {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path.display()),
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Parse a TOML document into a `Config`
pub fn parse_config(contents: &str) -> PipelineResult<Config> {
    Ok(toml::from_str::<Config>(contents)?)
}

/// Parse a `YYYY-MM-DD` date into unix seconds at midnight UTC
pub fn parse_date_to_unix(value: &str) -> PipelineResult<i64> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| PipelineError::config(format!("Invalid date '{}': {}", value, e)))?;
    Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or(0))
}

/// Ten years, far beyond any indexer delay
const MAX_LAG_DAYS: i64 = 3650;

impl Config {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> PipelineResult<()> {
        let u = &self.universe;
        if u.exchange_slugs.is_empty() {
            return Err(PipelineError::config("universe.exchange_slugs must not be empty"));
        }
        if u.max_pairs == 0 {
            return Err(PipelineError::config("universe.max_pairs must be positive"));
        }
        if u.liquidity_samples == 0 {
            return Err(PipelineError::config("universe.liquidity_samples must be positive"));
        }
        if u.min_liquidity_usd < 0.0 || u.broken_liquidity_ceiling_usd <= 0.0 {
            return Err(PipelineError::config(
                "universe liquidity thresholds must be non-negative with a positive ceiling",
            ));
        }
        for (name, lag) in [
            ("today_lag_days", u.today_lag_days),
            ("comparison_lag_days", u.comparison_lag_days),
        ] {
            if !(0..=MAX_LAG_DAYS).contains(&lag) {
                return Err(PipelineError::config(format!(
                    "universe.{} must be within 0-{}, got {}",
                    name, MAX_LAG_DAYS, lag
                )));
            }
        }
        for date in [&u.start_date, &u.end_date].into_iter().flatten() {
            parse_date_to_unix(date)?;
        }

        let r = &self.risk;
        if !(0.0..=100.0).contains(&r.threshold) {
            return Err(PipelineError::config(format!(
                "risk.threshold must be within 0-100, got {}",
                r.threshold
            )));
        }
        if r.max_checked_pairs == 0 {
            return Err(PipelineError::config("risk.max_checked_pairs must be positive"));
        }

        let w = &self.wrangle;
        if w.low_tolerance <= 0.0 || w.low_tolerance >= 1.0 || w.high_tolerance <= 1.0 {
            return Err(PipelineError::config(
                "wrangle tolerances must satisfy 0 < low_tolerance < 1 < high_tolerance",
            ));
        }

        let level = self.output.parquet_compression_level;
        if !self.output.parquet_compression.level_in_range(level) {
            return Err(PipelineError::config(format!(
                "output.parquet_compression_level {} is out of range for {:?}",
                level, self.output.parquet_compression
            )));
        }
        if self.output.file_name.trim().is_empty() || self.prefilter.name.trim().is_empty() {
            return Err(PipelineError::config("output file names must not be empty"));
        }

        if self.binance.download_concurrency == 0 {
            return Err(PipelineError::config("binance.download_concurrency must be positive"));
        }
        parse_date_to_unix(&self.binance.start_date)?;

        if self.notebooks.timeout_secs == 0 {
            return Err(PipelineError::config("notebooks.timeout_secs must be positive"));
        }

        Ok(())
    }
}
