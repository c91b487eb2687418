/// Peak-liquidity prefilter to Parquet
///
/// Keeps every pair of the configured chain and exchanges whose liquidity
/// `high` ever exceeded the threshold, then writes raw liquidity and candles
/// of those pairs to two Parquet files.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::errors::PipelineResult;
use crate::export::write_parquet;
use crate::logger::{self, LogTag};
use crate::market::frames::{candles_to_frame, liquidity_to_frame};
use crate::market::{resolve_exchange_ids, LiquiditySample, MarketDataSource, PairId};
use crate::timeseries::group_by_pair;
use crate::utils::format_usd;

#[derive(Debug, Clone)]
pub struct PrefilterReport {
    pub pairs_considered: usize,
    pub pairs_kept: usize,
    pub liquidity_rows: usize,
    pub candle_rows: usize,
    pub liquidity_path: PathBuf,
    pub price_path: PathBuf,
}

/// Pairs whose liquidity high exceeded `min_usd` at least once
pub fn pairs_above_peak(samples: &[LiquiditySample], min_usd: f64) -> HashSet<PairId> {
    group_by_pair(samples)
        .into_iter()
        .filter(|(_, series)| series.iter().any(|s| s.high > min_usd))
        .map(|(pair_id, _)| pair_id)
        .collect()
}

pub async fn run_prefilter(
    config: &Config,
    market: &dyn MarketDataSource,
    output_dir: &Path,
) -> PipelineResult<PrefilterReport> {
    let universe = &config.universe;
    let prefilter = &config.prefilter;
    let output = &config.output;

    let exchanges = market.fetch_exchanges().await?;
    let exchange_ids = resolve_exchange_ids(&exchanges, universe.chain_id, &universe.exchange_slugs)?;
    let chain_pair_ids: HashSet<PairId> = market
        .fetch_pairs()
        .await?
        .into_iter()
        .filter(|p| p.chain_id == universe.chain_id && exchange_ids.contains(&p.exchange_id))
        .map(|p| p.pair_id)
        .collect();
    logger::info(
        LogTag::Universe,
        &format!(
            "We have data for {} trading pairs on {}",
            chain_pair_ids.len(),
            prefilter.name
        ),
    );

    let liquidity = market
        .fetch_liquidity(universe.liquidity_time_bucket, &chain_pair_ids)
        .await?;
    let kept = pairs_above_peak(&liquidity, prefilter.min_liquidity_usd);
    logger::info(
        LogTag::Liquidity,
        &format!(
            "After filtering for {} USD min liquidity we have {} pairs",
            format_usd(prefilter.min_liquidity_usd),
            kept.len()
        ),
    );

    let liquidity: Vec<LiquiditySample> = liquidity
        .into_iter()
        .filter(|s| kept.contains(&s.pair_id))
        .collect();
    let liquidity_path = output_dir.join(format!(
        "liquidity-{}-{}.parquet",
        prefilter.name, universe.liquidity_time_bucket
    ));
    let mut df = liquidity_to_frame(&liquidity)?;
    let bytes = write_parquet(
        &mut df,
        &liquidity_path,
        output.parquet_compression,
        output.parquet_compression_level,
    )?;
    logger::info(
        LogTag::Export,
        &format!("Wrote {}, {} bytes", liquidity_path.display(), bytes),
    );

    let candles = market.fetch_candles(universe.time_bucket, &kept).await?;
    let price_path = output_dir.join(format!(
        "price-{}-{}.parquet",
        prefilter.name, universe.time_bucket
    ));
    let mut df = candles_to_frame(&candles)?;
    let bytes = write_parquet(
        &mut df,
        &price_path,
        output.parquet_compression,
        output.parquet_compression_level,
    )?;
    logger::info(
        LogTag::Export,
        &format!("Wrote {}, {} bytes", price_path.display(), bytes),
    );

    Ok(PrefilterReport {
        pairs_considered: chain_pair_ids.len(),
        pairs_kept: kept.len(),
        liquidity_rows: liquidity.len(),
        candle_rows: candles.len(),
        liquidity_path,
        price_path,
    })
}
