use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use universe_prep::{
    apis::{BinanceClient, TradingStrategyClient},
    arguments::{Cli, Command},
    config::{self, Config},
    logger::{self, LogTag, LoggerConfig},
    notebooks::{run_notebooks, JupyterExecutor},
    paths,
    pipeline::{build_risk_scorer, run_binance_download, run_export, run_prefilter},
};

/// Main entry point for universe-prep
///
/// Loads the configuration, applies the subcommand overrides and runs one
/// pipeline. Exit code 1 on any error, and for the notebook runner when a
/// notebook failed.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let log_dir = paths::get_logs_directory();
    let mut logger_config = LoggerConfig::from_flags(&cli.debug, cli.verbose, cli.quiet);
    if paths::ensure_directory(&log_dir).is_ok() {
        logger_config = logger_config.with_log_dir(log_dir);
    }
    logger::init(logger_config);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            logger::error(LogTag::System, &format!("{:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = config::load_config_from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    cli.command.apply(&mut config);
    config.validate().context("invalid option")?;

    logger::info(
        LogTag::System,
        &format!("universe-prep {} {}", env!("CARGO_PKG_VERSION"), cli.command.name()),
    );

    let now = chrono::Utc::now().timestamp();
    match &cli.command {
        Command::Export(_) => {
            let scorer = build_risk_scorer(&config)?;
            let market = trading_strategy_client(&config)?;
            let output_dir = output_directory(&config)?;
            let report = run_export(&config, &market, scorer.as_deref(), &output_dir, now)
                .await
                .context("export failed")?;
            logger::info(
                LogTag::Export,
                &format!(
                    "Exported {} pairs, {} candle rows to {}",
                    report.selected.len(),
                    report.candle_rows,
                    report.price_path.display()
                ),
            );
            Ok(0)
        }
        Command::Prefilter(_) => {
            let market = trading_strategy_client(&config)?;
            let output_dir = output_directory(&config)?;
            let report = run_prefilter(&config, &market, &output_dir)
                .await
                .context("prefilter failed")?;
            logger::info(
                LogTag::Export,
                &format!(
                    "Kept {} of {} pairs: {} and {}",
                    report.pairs_kept,
                    report.pairs_considered,
                    report.liquidity_path.display(),
                    report.price_path.display()
                ),
            );
            Ok(0)
        }
        Command::Binance(_) => {
            let client = BinanceClient::new(&config.binance)?;
            let cache_dir = paths::get_binance_cache_directory(&config);
            paths::ensure_directory(&cache_dir)
                .with_context(|| format!("creating {}", cache_dir.display()))?;
            let output_dir = output_directory(&config)?;
            let report = run_binance_download(&config, &client, &cache_dir, &output_dir, now)
                .await
                .context("binance download failed")?;
            if !report.failed.is_empty() {
                logger::warning(
                    LogTag::Binance,
                    &format!("Failed symbols: {}", report.failed.join(", ")),
                );
            }
            Ok(0)
        }
        Command::Notebooks(_) => {
            let executor = JupyterExecutor::new(&config.notebooks);
            let report = run_notebooks(&config.notebooks, &executor).await?;
            Ok(report.exit_code())
        }
    }
}

fn trading_strategy_client(config: &Config) -> Result<TradingStrategyClient> {
    let dataset_dir = paths::get_dataset_directory(config);
    paths::ensure_directory(&dataset_dir)
        .with_context(|| format!("creating {}", dataset_dir.display()))?;
    let api_key = TradingStrategyClient::api_key_from_env(&config.market_data);
    if api_key.is_none() {
        logger::debug(
            LogTag::MarketData,
            &format!("{} not set, requesting datasets anonymously", config.market_data.api_key_env),
        );
    }
    Ok(TradingStrategyClient::new(&config.market_data, dataset_dir, api_key)?)
}

fn output_directory(config: &Config) -> Result<PathBuf> {
    let dir = paths::get_output_directory(config);
    paths::ensure_directory(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}
