/// Top-N liquid pairs to CSV
///
/// pairs -> liquidity -> rank/dedup -> risk gate -> candles -> CSV
///
/// The aggregate layout ranks base tokens the same way, then exports every
/// pool of each selected base token above the liquidity floor so the pools
/// can be merged into one series.
use comfy_table::{presets::UTF8_FULL, Table};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::aggregate::aggregate_ohlcv_across_pairs;
use crate::config::{parse_date_to_unix, Config};
use crate::errors::{PipelineError, PipelineResult};
use crate::export::{write_aggregate_csv, write_candles_csv, write_liquidity_csv, CsvLayout};
use crate::liquidity::{
    base_token_pools, build_liquidity_summary, rank_pairs, LiquidityParams, LiquiditySummary, RankedPair,
    RankingPolicy,
};
use crate::logger::{self, LogTag};
use crate::market::{Candle, LiquiditySample, MarketDataSource, PairId, PairUniverse};
use crate::risk::{apply_risk_gate, CachedRiskScorer, RiskGateOutcome};
use crate::timeseries::{clip_range, fix_dex_price_data, flatten, group_by_pair};
use crate::utils::format_usd;

use super::{load_candidate_universe, load_liquidity};

#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Pairs left after the default pair filter
    pub candidates: usize,
    /// Pairs left after ranking and dedup
    pub ranked: usize,
    /// None when the risk gate did not run
    pub risk: Option<RiskGateOutcome>,
    /// Final selection, most liquid first
    pub selected: Vec<RankedPair>,
    /// Pools written out, equal to `selected` except for the aggregate
    /// layout where every deep pool of a selected base token is included
    pub exported: Vec<RankedPair>,
    pub historical_liquidity_total: f64,
    pub today_liquidity_total: f64,
    pub candle_rows: usize,
    pub price_path: PathBuf,
    pub liquidity_path: Option<PathBuf>,
}

/// Top `rows` of the selection as a table
pub fn render_summary_table(
    selected: &[RankedPair],
    universe: &PairUniverse,
    summary: &LiquiditySummary,
    rows: usize,
) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header([
        "#",
        "Ticker",
        "Historical USD",
        "Today USD",
        "Pair id",
    ]);

    for (idx, ranked) in selected.iter().take(rows).enumerate() {
        let ticker = universe
            .get(ranked.pair_id)
            .map(|p| p.ticker())
            .unwrap_or_else(|| ranked.pair_id.to_string());
        table.add_row([
            (idx + 1).to_string(),
            ticker,
            format_usd(ranked.liquidity),
            format_usd(summary.today(ranked.pair_id)),
            ranked.pair_id.to_string(),
        ]);
    }
    table
}

/// Fail when `require_exchange` is set and no selected pair trades there
fn check_required_exchange(
    required: Option<&str>,
    selected: &[RankedPair],
    universe: &PairUniverse,
) -> PipelineResult<()> {
    let Some(slug) = required else {
        return Ok(());
    };
    let found = selected
        .iter()
        .filter_map(|r| universe.get(r.pair_id))
        .any(|p| p.exchange_slug == slug);
    if !found {
        return Err(PipelineError::validation(format!(
            "Top liquid pairs did not contain a single {} pair",
            slug
        )));
    }
    Ok(())
}

/// Candle date range from the universe config
fn candle_range(config: &Config) -> PipelineResult<(Option<i64>, Option<i64>)> {
    let start = config
        .universe
        .start_date
        .as_deref()
        .map(parse_date_to_unix)
        .transpose()?;
    let end = config
        .universe
        .end_date
        .as_deref()
        .map(parse_date_to_unix)
        .transpose()?;
    Ok((start, end))
}

pub async fn run_export(
    config: &Config,
    market: &dyn MarketDataSource,
    scorer: Option<&CachedRiskScorer>,
    output_dir: &Path,
    now: i64,
) -> PipelineResult<ExportReport> {
    let universe_config = &config.universe;

    // Candidates and their liquidity
    let universe = load_candidate_universe(universe_config, market).await?;
    let pair_ids = universe.pair_ids();
    let liquidity = load_liquidity(universe_config, market, &pair_ids).await?;
    let params = LiquidityParams::from_config(universe_config, now);
    let summary = build_liquidity_summary(&liquidity, &pair_ids, &params);

    // Rank deep enough that the risk gate can still fill the quota
    let policy = RankingPolicy::from_config(universe_config);
    let rank_limit = if scorer.is_some() {
        config.risk.max_checked_pairs.max(universe_config.max_pairs)
    } else {
        universe_config.max_pairs
    };
    let ranked = rank_pairs(&summary, &universe, &policy, rank_limit);
    logger::info(
        LogTag::Universe,
        &format!(
            "After prefilter, we have {} pairs left above {} USD",
            ranked.len(),
            format_usd(policy.min_liquidity_usd)
        ),
    );

    let (mut selected, risk) = match scorer {
        Some(scorer) => {
            let outcome = apply_risk_gate(&ranked, &universe, scorer, &config.risk).await?;
            logger::info(
                LogTag::Risk,
                &format!(
                    "We skip {} pairs in the risk filter, cache: {}",
                    outcome.skipped(),
                    scorer.get_diagnostics()
                ),
            );
            (outcome.accepted.clone(), Some(outcome))
        }
        None => (ranked.clone(), None),
    };
    selected.truncate(universe_config.max_pairs);

    check_required_exchange(
        universe_config.require_exchange.as_deref(),
        &selected,
        &universe,
    )?;

    let table = render_summary_table(&selected, &universe, &summary, config.output.summary_rows);
    logger::info(
        LogTag::Universe,
        &format!(
            "Top liquid {} pairs (historically):\n{}",
            config.output.summary_rows.min(selected.len()),
            table
        ),
    );

    // Risk was checked once per base token, the other pools follow it
    let exported = match config.output.layout {
        CsvLayout::Aggregate => {
            let pools = base_token_pools(&summary, &universe, &policy, &selected);
            logger::info(
                LogTag::Aggregate,
                &format!(
                    "{} base tokens expand to {} pools for aggregation",
                    selected.len(),
                    pools.len()
                ),
            );
            pools
        }
        _ => selected.clone(),
    };

    let selected_ids: HashSet<PairId> = exported.iter().map(|r| r.pair_id).collect();
    let (historical_total, today_total) = summary.totals(selected_ids.iter());
    logger::info(
        LogTag::Universe,
        &format!(
            "Historical tradeable liquidity for {} pairs is {} USD, today {} USD",
            selected_ids.len(),
            format_usd(historical_total),
            format_usd(today_total)
        ),
    );

    let selected_universe = universe.limit_to(&selected_ids);
    let selected_liquidity: BTreeMap<PairId, Vec<LiquiditySample>> = liquidity
        .into_iter()
        .filter(|(id, _)| selected_ids.contains(id))
        .collect();

    std::fs::create_dir_all(output_dir)?;
    let file_name = &config.output.file_name;

    let liquidity_path = if config.output.write_liquidity_csv {
        let path = output_dir.join(format!("liquidity-{}.csv", file_name));
        let rows: Vec<LiquiditySample> = selected_liquidity.values().flatten().copied().collect();
        write_liquidity_csv(&path, &rows)?;
        Some(path)
    } else {
        None
    };

    // Candles of the selection only
    let (start, end) = candle_range(config)?;
    let candles = market
        .fetch_candles(universe_config.time_bucket, &selected_ids)
        .await?;
    let candles = clip_range(candles, start, end);

    let grouped: BTreeMap<PairId, Vec<Candle>> = if config.wrangle.enabled {
        let (grouped, stats) =
            fix_dex_price_data(&candles, universe_config.time_bucket, &config.wrangle);
        logger::debug(LogTag::Wrangle, &format!("Wrangle stats: {:?}", stats));
        grouped
    } else {
        group_by_pair(&candles)
    };

    let price_path = output_dir.join(format!("price-{}.csv", file_name));
    let candle_rows = match config.output.layout {
        CsvLayout::Aggregate => {
            let aggregated =
                aggregate_ohlcv_across_pairs(&selected_universe, &grouped, &selected_liquidity);
            write_aggregate_csv(&price_path, &aggregated)?
        }
        layout => write_candles_csv(&price_path, layout, &flatten(grouped), &selected_universe)?,
    };

    logger::info(
        LogTag::Export,
        &format!(
            "Export done: {} pairs, {} rows in {}",
            selected.len(),
            candle_rows,
            price_path.display()
        ),
    );

    Ok(ExportReport {
        candidates: universe.len(),
        ranked: ranked.len(),
        risk,
        selected,
        exported,
        historical_liquidity_total: historical_total,
        today_liquidity_total: today_total,
        candle_rows,
        price_path,
        liquidity_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::memory::{candle, liq, test_exchange, test_pair, InMemoryMarketData};
    use crate::risk::fake::FakeScorer;
    use crate::risk::RiskCache;
    use std::sync::Arc;

    const DAY: i64 = 86_400;
    const NOW: i64 = 60 * DAY;

    /// A and C share base X with 10M and 5M, B sits below the 4M floor
    fn market() -> InMemoryMarketData {
        let mut a = test_pair(1, 1, "uniswap-v2", "X", "WETH");
        let mut c = test_pair(3, 2, "uniswap-v3", "X", "USDC");
        a.base_token_address = "0xbase".to_string();
        c.base_token_address = "0xbase".to_string();
        let pairs = vec![
            a,
            test_pair(2, 1, "uniswap-v2", "B", "WETH"),
            c,
            test_pair(4, 1, "uniswap-v2", "D", "WETH"),
            test_pair(5, 2, "uniswap-v3", "E", "USDC"),
        ];

        let depth = [(1, 10e6), (2, 1e6), (3, 5e6), (4, 8e6), (5, 6e6)];
        let mut liquidity = Vec::new();
        let mut candles = Vec::new();
        for (pair_id, usd) in depth {
            for day in 0..12 {
                liquidity.push(liq(pair_id, day * DAY, usd));
                candles.push(candle(pair_id, day * DAY, 1.0 + pair_id as f64, 100.0));
            }
        }

        InMemoryMarketData {
            exchanges: vec![test_exchange(1, "uniswap-v2"), test_exchange(2, "uniswap-v3")],
            pairs,
            liquidity,
            candles,
        }
    }

    fn config(max_pairs: usize) -> Config {
        let mut config = Config::default();
        config.universe.exchange_slugs = vec!["uniswap-v2".to_string(), "uniswap-v3".to_string()];
        config.universe.max_pairs = max_pairs;
        config.output.layout = CsvLayout::Simple;
        config
    }

    fn selected_ids(report: &ExportReport) -> Vec<PairId> {
        report.selected.iter().map(|r| r.pair_id).collect()
    }

    #[tokio::test]
    async fn test_top_two_by_base_token() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_export(&config(2), &market(), None, dir.path(), NOW)
            .await
            .unwrap();

        assert_eq!(selected_ids(&report), vec![1, 4]);
        assert_eq!(report.candidates, 5);
        assert_eq!(report.historical_liquidity_total, 18e6);
        assert_eq!(report.candle_rows, 24);
        assert!(report.risk.is_none());

        let mut reader = csv::Reader::from_path(&report.price_path).unwrap();
        let pair_ids: HashSet<String> = reader
            .records()
            .map(|r| r.unwrap()[8].to_string())
            .collect();
        assert_eq!(pair_ids, ["1", "4"].iter().map(|s| s.to_string()).collect());
    }

    #[tokio::test]
    async fn test_ranking_invariants_hold_for_full_selection() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_export(&config(100), &market(), None, dir.path(), NOW)
            .await
            .unwrap();

        assert_eq!(selected_ids(&report), vec![1, 4, 5]);
        let keys: HashSet<&str> = report.selected.iter().map(|r| r.dedup_key.as_str()).collect();
        assert_eq!(keys.len(), report.selected.len());
        assert!(report.selected.iter().all(|r| r.liquidity >= 4e6));
    }

    #[tokio::test]
    async fn test_risk_gate_and_liquidity_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(2);
        config.risk.allow_list.clear();
        config.output.write_liquidity_csv = true;

        let fake = FakeScorer::default()
            .with("0xbase", Ok((90.0, false)))
            .with("0xd", Ok((5.0, false)))
            .with("0xe", Ok((80.0, false)));
        let scorer = CachedRiskScorer::new(Arc::new(fake), RiskCache::open_in_memory().unwrap(), 0);

        let report = run_export(&config, &market(), Some(&scorer), dir.path(), NOW)
            .await
            .unwrap();

        assert_eq!(selected_ids(&report), vec![1, 5]);
        let outcome = report.risk.as_ref().unwrap();
        assert_eq!(outcome.rejected, vec![(4, 5.0)]);
        assert_eq!(scorer.get_diagnostics().fetched, 3);

        let liquidity_path = report.liquidity_path.unwrap();
        assert!(liquidity_path.ends_with("liquidity-uniswap-v2-v3-ethereum-top-100.csv"));
        let rows = csv::Reader::from_path(&liquidity_path).unwrap().records().count();
        assert!(rows >= 24);
    }

    #[tokio::test]
    async fn test_required_exchange_missing_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(2);
        config.universe.require_exchange = Some("uniswap-v3".to_string());

        let err = run_export(&config, &market(), None, dir.path(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_aggregate_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(2);
        config.output.layout = CsvLayout::Aggregate;

        let report = run_export(&config, &market(), None, dir.path(), NOW)
            .await
            .unwrap();
        // One series per selected base token, 12 days each
        assert_eq!(report.candle_rows, 24);
        assert_eq!(selected_ids(&report), vec![1, 4]);
        let exported: Vec<PairId> = report.exported.iter().map(|r| r.pair_id).collect();
        assert_eq!(exported, vec![1, 3, 4]);

        let mut reader = csv::Reader::from_path(&report.price_path).unwrap();
        let mut members: BTreeMap<String, HashSet<String>> = BTreeMap::new();
        for record in reader.records() {
            let record = record.unwrap();
            members
                .entry(record[0].to_string())
                .or_default()
                .insert(record[9].to_string());
        }
        assert_eq!(members["X"], HashSet::from(["1 3".to_string()]));
        assert_eq!(members["D"], HashSet::from(["4".to_string()]));
    }

    #[tokio::test]
    async fn test_aggregate_layout_gates_risk_per_base_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(2);
        config.output.layout = CsvLayout::Aggregate;
        config.risk.allow_list.clear();

        let fake = FakeScorer::default()
            .with("0xbase", Ok((90.0, false)))
            .with("0xd", Ok((80.0, false)));
        let scorer = CachedRiskScorer::new(Arc::new(fake), RiskCache::open_in_memory().unwrap(), 0);

        let report = run_export(&config, &market(), Some(&scorer), dir.path(), NOW)
            .await
            .unwrap();

        // One lookup per base token X, D and E. Pool 3 rides on pool 1
        let diagnostics = scorer.get_diagnostics();
        assert_eq!(diagnostics.cache_misses, 3);
        assert_eq!(diagnostics.fetched, 2);
        assert_eq!(diagnostics.not_found, 1);
        let exported: Vec<PairId> = report.exported.iter().map(|r| r.pair_id).collect();
        assert_eq!(exported, vec![1, 3, 4]);
    }
}
