/// Command-line arguments for universe-prep
///
/// Global flags control configuration and logging; each subcommand runs one
/// pipeline. Subcommand flags override the matching config values.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE_PATH};
use crate::export::CsvLayout;
use crate::liquidity::{DedupKey, RankingMetric};
use crate::market::TimeBucket;

#[derive(Debug, Parser)]
#[command(name = "universe-prep", version, about = "Trading universe data preparation")]
pub struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_PATH)]
    pub config: PathBuf,

    /// Enable debug logs for a tag (repeatable, `all` for every tag)
    #[arg(long = "debug", global = true, value_name = "TAG")]
    pub debug: Vec<String>,

    /// Show every log level for every tag
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Only warnings and errors on the console
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank, risk-gate and export the top liquid pairs to CSV
    Export(ExportArgs),
    /// Write liquidity and candles of pairs above a peak liquidity to Parquet
    Prefilter(PrefilterArgs),
    /// Download Binance spot candles into a Parquet cache and combine them
    Binance(BinanceArgs),
    /// Execute notebooks as a test suite
    Notebooks(NotebooksArgs),
}

fn parse_bucket(value: &str) -> Result<TimeBucket, String> {
    TimeBucket::from_str(value).ok_or_else(|| format!("unknown time bucket '{}'", value))
}

fn parse_layout(value: &str) -> Result<CsvLayout, String> {
    match value {
        "simple" => Ok(CsvLayout::Simple),
        "detailed" => Ok(CsvLayout::Detailed),
        "aggregate" => Ok(CsvLayout::Aggregate),
        other => Err(format!("unknown layout '{}'", other)),
    }
}

fn parse_metric(value: &str) -> Result<RankingMetric, String> {
    match value {
        "historical_max" => Ok(RankingMetric::HistoricalMax),
        "at_date" => Ok(RankingMetric::AtDate),
        other => Err(format!("unknown ranking metric '{}'", other)),
    }
}

fn parse_dedup(value: &str) -> Result<DedupKey, String> {
    match value {
        "base_address" => Ok(DedupKey::BaseAddress),
        "base_symbol" => Ok(DedupKey::BaseSymbol),
        "simple_ticker" => Ok(DedupKey::SimpleTicker),
        other => Err(format!("unknown dedup key '{}'", other)),
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ExportArgs {
    /// Number of pairs to export
    #[arg(long)]
    pub top: Option<usize>,

    /// Minimum ranking liquidity in USD
    #[arg(long)]
    pub min_liquidity: Option<f64>,

    /// Exchange slug, repeatable, replaces the configured set
    #[arg(long = "exchange", value_name = "SLUG")]
    pub exchanges: Vec<String>,

    /// simple, detailed or aggregate
    #[arg(long, value_parser = parse_layout)]
    pub layout: Option<CsvLayout>,

    /// historical_max or at_date
    #[arg(long, value_parser = parse_metric)]
    pub metric: Option<RankingMetric>,

    /// base_address, base_symbol or simple_ticker
    #[arg(long, value_parser = parse_dedup)]
    pub dedup: Option<DedupKey>,

    /// Skip the TokenSniffer risk gate
    #[arg(long)]
    pub no_risk: bool,

    /// Also write the liquidity CSV of the selected pairs
    #[arg(long)]
    pub liquidity_csv: bool,

    /// Output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct PrefilterArgs {
    /// Keep pairs whose liquidity high ever exceeded this USD value
    #[arg(long)]
    pub min_liquidity: Option<f64>,

    /// Exchange slug, repeatable, replaces the configured set
    #[arg(long = "exchange", value_name = "SLUG")]
    pub exchanges: Vec<String>,

    /// Candle time bucket
    #[arg(long, value_parser = parse_bucket)]
    pub bucket: Option<TimeBucket>,

    /// Name embedded in the output file names
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct BinanceArgs {
    #[arg(long, value_parser = parse_bucket)]
    pub bucket: Option<TimeBucket>,

    /// First day to download, YYYY-MM-DD
    #[arg(long)]
    pub start: Option<String>,

    /// Only symbols quoted in this asset, repeatable
    #[arg(long = "quote", value_name = "ASSET")]
    pub quote_assets: Vec<String>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct NotebooksArgs {
    /// Glob pattern, `**` allowed
    #[arg(long)]
    pub pattern: Option<String>,

    /// Per-notebook timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl ExportArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(top) = self.top {
            config.universe.max_pairs = top;
        }
        if let Some(min) = self.min_liquidity {
            config.universe.min_liquidity_usd = min;
        }
        if !self.exchanges.is_empty() {
            config.universe.exchange_slugs = self.exchanges.clone();
        }
        if let Some(layout) = self.layout {
            config.output.layout = layout;
        }
        if let Some(metric) = self.metric {
            config.universe.ranking_metric = metric;
        }
        if let Some(dedup) = self.dedup {
            config.universe.dedup_key = dedup;
        }
        if self.no_risk {
            config.risk.enabled = false;
        }
        if self.liquidity_csv {
            config.output.write_liquidity_csv = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.display().to_string();
        }
    }
}

impl PrefilterArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(min) = self.min_liquidity {
            config.prefilter.min_liquidity_usd = min;
        }
        if !self.exchanges.is_empty() {
            config.universe.exchange_slugs = self.exchanges.clone();
        }
        if let Some(bucket) = self.bucket {
            config.universe.time_bucket = bucket;
        }
        if let Some(name) = &self.name {
            config.prefilter.name = name.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.display().to_string();
        }
    }
}

impl BinanceArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(bucket) = self.bucket {
            config.binance.time_bucket = bucket;
        }
        if let Some(start) = &self.start {
            config.binance.start_date = start.clone();
        }
        if !self.quote_assets.is_empty() {
            config.binance.quote_assets = self.quote_assets.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.display().to_string();
        }
    }
}

impl NotebooksArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(pattern) = &self.pattern {
            config.notebooks.pattern = pattern.clone();
        }
        if let Some(timeout) = self.timeout {
            config.notebooks.timeout_secs = timeout;
        }
    }
}

impl Command {
    /// Override config values with subcommand flags
    pub fn apply(&self, config: &mut Config) {
        match self {
            Command::Export(args) => args.apply(config),
            Command::Prefilter(args) => args.apply(config),
            Command::Binance(args) => args.apply(config),
            Command::Notebooks(args) => args.apply(config),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Export(_) => "export",
            Command::Prefilter(_) => "prefilter",
            Command::Binance(_) => "binance",
            Command::Notebooks(_) => "notebooks",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "universe-prep",
            "export",
            "--top",
            "50",
            "--exchange",
            "uniswap-v3",
            "--layout",
            "aggregate",
            "--debug",
            "risk",
            "--debug",
            "liquidity",
        ])
        .unwrap();
        assert_eq!(cli.debug, vec!["risk", "liquidity"]);
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE_PATH));

        let mut config = Config::default();
        cli.command.apply(&mut config);
        assert_eq!(config.universe.max_pairs, 50);
        assert_eq!(config.universe.exchange_slugs, vec!["uniswap-v3"]);
        assert_eq!(config.output.layout, CsvLayout::Aggregate);
        assert!(config.risk.enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Cli::try_parse_from(["universe-prep", "prefilter", "--bucket", "2d"]).is_err());
        assert!(Cli::try_parse_from(["universe-prep", "--verbose", "--quiet", "notebooks"]).is_err());
    }

    #[test]
    fn test_notebook_overrides() {
        let cli = Cli::try_parse_from([
            "universe-prep",
            "notebooks",
            "--pattern",
            "notebooks/single-backtest/*.ipynb",
            "--timeout",
            "60",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.command.apply(&mut config);
        assert_eq!(config.notebooks.pattern, "notebooks/single-backtest/*.ipynb");
        assert_eq!(config.notebooks.timeout_secs, 60);
    }
}
