//! Batch pipelines behind the CLI subcommands
//!
//! - `export`: ranked, risk-gated top-N pairs to CSV
//! - `prefilter`: peak-liquidity filter to Parquet
//! - `binance`: Binance spot candles to a per-symbol Parquet cache
//!
//! Pipelines take their configuration and data sources as arguments; the
//! binary wires the production clients in.

pub mod binance;
pub mod export;
pub mod prefilter;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::apis::TokenSnifferClient;
use crate::config::{Config, RiskConfig, UniverseConfig};
use crate::errors::{PipelineError, PipelineResult};
use crate::logger::{self, LogTag};
use crate::market::{
    filter_pairs_default, resolve_exchange_ids, LiquiditySample, MarketDataSource, PairFilter,
    PairId, PairUniverse,
};
use crate::paths;
use crate::risk::{CachedRiskScorer, RiskCache};
use crate::timeseries::{forward_fill_liquidity, group_by_pair};

pub use binance::{combine_cached_klines, run_binance_download, BinanceReport};
pub use export::{run_export, ExportReport};
pub use prefilter::{run_prefilter, PrefilterReport};

/// Build the cached TokenSniffer scorer
///
/// None when the gate is disabled, or when the API key is missing and the
/// gate is not required. A missing key with `required` set fails before
/// any network traffic.
pub fn build_risk_scorer(config: &Config) -> PipelineResult<Option<Arc<CachedRiskScorer>>> {
    let risk: &RiskConfig = &config.risk;
    if !risk.enabled {
        logger::info(LogTag::Risk, "Risk gate disabled in config");
        return Ok(None);
    }

    let Some(api_key) = TokenSnifferClient::api_key_from_env(risk) else {
        if risk.required {
            return Err(PipelineError::MissingEnv {
                name: risk.api_key_env.clone(),
                hint: "the risk gate is required, set the key or disable risk.required".to_string(),
            });
        }
        logger::warning(
            LogTag::Risk,
            &format!("{} not set, risk gate skipped", risk.api_key_env),
        );
        return Ok(None);
    };

    let client = TokenSnifferClient::new(risk, api_key)?;
    let cache_path = paths::get_risk_cache_path(config);
    let cache = RiskCache::open(&cache_path)?;
    logger::debug(
        LogTag::Cache,
        &format!("Risk cache at {}", cache_path.display()),
    );

    Ok(Some(Arc::new(CachedRiskScorer::new(
        Arc::new(client),
        cache,
        risk.cache_max_age_days,
    ))))
}

/// Pairs of the configured chain and exchanges that pass the default filter
pub async fn load_candidate_universe(
    config: &UniverseConfig,
    market: &dyn MarketDataSource,
) -> PipelineResult<PairUniverse> {
    logger::info(
        LogTag::MarketData,
        &format!("Loading exchange and pair universe from {}", market.name()),
    );
    let exchanges = market.fetch_exchanges().await?;
    let exchange_ids = resolve_exchange_ids(&exchanges, config.chain_id, &config.exchange_slugs)?;
    logger::info(
        LogTag::Universe,
        &format!(
            "Exchanges {:?} resolved to ids {:?}",
            config.exchange_slugs, exchange_ids
        ),
    );

    let pairs = market.fetch_pairs().await?;
    let filter = PairFilter::from_config(config, exchange_ids);
    Ok(PairUniverse::new(filter_pairs_default(pairs, &filter)))
}

/// Liquidity of `pair_ids` grouped per pair and forward-filled
pub async fn load_liquidity(
    config: &UniverseConfig,
    market: &dyn MarketDataSource,
    pair_ids: &HashSet<PairId>,
) -> PipelineResult<BTreeMap<PairId, Vec<LiquiditySample>>> {
    let samples = market
        .fetch_liquidity(config.liquidity_time_bucket, pair_ids)
        .await?;
    let before = samples.len();

    let grouped: BTreeMap<PairId, Vec<LiquiditySample>> = group_by_pair(&samples)
        .into_iter()
        .map(|(pair_id, series)| {
            (
                pair_id,
                forward_fill_liquidity(&series, config.liquidity_time_bucket),
            )
        })
        .collect();

    let after: usize = grouped.values().map(|s| s.len()).sum();
    logger::info(
        LogTag::Liquidity,
        &format!(
            "Forward-filled liquidity of {} pairs to {}: {} -> {} samples",
            grouped.len(),
            config.liquidity_time_bucket,
            before,
            after
        ),
    );
    Ok(grouped)
}
