// Cross-pair aggregation: one synthetic series per base token

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::logger::{self, LogTag};
use crate::market::{Candle, LiquiditySample, PairId, PairUniverse, TradingPair};

/// One OHLCV + liquidity row of a base token built from several pools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCandle {
    /// `"{chain_id}-{base_address}"`
    pub aggregate_id: String,
    pub base: String,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub liquidity: f64,
    /// Contributing pools, ascending
    pub pair_ids: Vec<PairId>,
}

pub fn aggregate_id(pair: &TradingPair) -> String {
    format!("{}-{}", pair.chain_id, pair.base_token_address.to_lowercase())
}

/// Latest liquidity close at or before `timestamp`, 0 when none
fn liquidity_as_of(series: Option<&Vec<LiquiditySample>>, timestamp: i64) -> f64 {
    let Some(series) = series else {
        return 0.0;
    };
    let idx = series.partition_point(|s| s.timestamp <= timestamp);
    if idx == 0 {
        0.0
    } else {
        series[idx - 1].close
    }
}

/// Combine the pools at one timestamp
///
/// Prices are weighted by volume, by liquidity when there was no volume,
/// and averaged when both are zero.
fn aggregate_bucket(members: &[(PairId, Candle, f64)]) -> Option<(f64, f64, f64, f64, f64, f64)> {
    if members.is_empty() {
        return None;
    }

    let volume: f64 = members.iter().map(|(_, c, _)| c.volume).sum();
    let liquidity: f64 = members.iter().map(|(_, _, l)| *l).sum();

    let weights: Vec<f64> = if volume > 0.0 {
        members.iter().map(|(_, c, _)| c.volume).collect()
    } else if liquidity > 0.0 {
        members.iter().map(|(_, _, l)| *l).collect()
    } else {
        vec![1.0; members.len()]
    };
    let total_weight: f64 = weights.iter().sum();

    let weighted = |price: fn(&Candle) -> f64| -> f64 {
        members
            .iter()
            .zip(&weights)
            .map(|((_, c, _), w)| price(c) * w)
            .sum::<f64>()
            / total_weight
    };

    Some((
        weighted(|c| c.open),
        weighted(|c| c.high),
        weighted(|c| c.low),
        weighted(|c| c.close),
        volume,
        liquidity,
    ))
}

/// Build one series per base token from per-pair candles and liquidity
///
/// Candles should already be forward-filled to the bucket frequency so pools
/// line up inside their lifetime. Output is ordered by aggregate id, then
/// timestamp.
pub fn aggregate_ohlcv_across_pairs(
    universe: &PairUniverse,
    candles: &BTreeMap<PairId, Vec<Candle>>,
    liquidity: &BTreeMap<PairId, Vec<LiquiditySample>>,
) -> Vec<AggregatedCandle> {
    let mut groups: BTreeMap<String, Vec<&TradingPair>> = BTreeMap::new();
    for pair_id in candles.keys() {
        if let Some(pair) = universe.get(*pair_id) {
            groups.entry(aggregate_id(pair)).or_default().push(pair);
        }
    }

    let mut output = Vec::new();
    for (id, mut members) in groups {
        members.sort_by_key(|p| p.pair_id);
        let base = members[0].base_token_symbol.clone();

        // Timestamp -> contributing (pair, candle, liquidity)
        let mut buckets: BTreeMap<i64, Vec<(PairId, Candle, f64)>> = BTreeMap::new();
        for pair in &members {
            let Some(series) = candles.get(&pair.pair_id) else {
                continue;
            };
            let pair_liquidity = liquidity.get(&pair.pair_id);
            for candle in series {
                buckets.entry(candle.timestamp).or_default().push((
                    pair.pair_id,
                    *candle,
                    liquidity_as_of(pair_liquidity, candle.timestamp),
                ));
            }
        }

        for (timestamp, bucket) in buckets {
            let Some((open, high, low, close, volume, liq)) = aggregate_bucket(&bucket) else {
                continue;
            };
            let mut pair_ids: Vec<PairId> = bucket.iter().map(|(id, _, _)| *id).collect();
            pair_ids.sort_unstable();

            output.push(AggregatedCandle {
                aggregate_id: id.clone(),
                base: base.clone(),
                timestamp,
                open,
                high,
                low,
                close,
                volume,
                liquidity: liq,
                pair_ids,
            });
        }
    }

    let series_count: HashMap<&str, usize> = output.iter().fold(HashMap::new(), |mut acc, c| {
        *acc.entry(c.aggregate_id.as_str()).or_default() += 1;
        acc
    });
    logger::info(
        LogTag::Aggregate,
        &format!(
            "Aggregated {} pairs into {} base token series, {} rows",
            candles.len(),
            series_count.len(),
            output.len()
        ),
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::memory::{candle, liq, test_pair};

    fn universe() -> PairUniverse {
        PairUniverse::new(vec![
            test_pair(1, 1, "uniswap-v2", "X", "WETH"),
            test_pair(2, 2, "uniswap-v3", "X", "USDC"),
            test_pair(3, 1, "uniswap-v2", "Y", "WETH"),
        ])
    }

    #[test]
    fn test_volume_weighted_prices_and_sums() {
        let mut candles = BTreeMap::new();
        candles.insert(1, vec![candle(1, 100, 10.0, 3.0)]);
        candles.insert(2, vec![candle(2, 100, 20.0, 1.0)]);
        let mut liquidity = BTreeMap::new();
        liquidity.insert(1, vec![liq(1, 50, 1_000.0)]);
        liquidity.insert(2, vec![liq(2, 100, 500.0), liq(2, 200, 9_999.0)]);

        let rows = aggregate_ohlcv_across_pairs(&universe(), &candles, &liquidity);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.aggregate_id, "1-0xx");
        assert_eq!(row.base, "X");
        assert_eq!(row.close, 12.5);
        assert_eq!(row.volume, 4.0);
        assert_eq!(row.liquidity, 1_500.0);
        assert_eq!(row.pair_ids, vec![1, 2]);
    }

    #[test]
    fn test_zero_volume_falls_back_to_liquidity_then_mean() {
        let mut candles = BTreeMap::new();
        candles.insert(1, vec![candle(1, 100, 10.0, 0.0), candle(1, 200, 10.0, 0.0)]);
        candles.insert(2, vec![candle(2, 100, 40.0, 0.0), candle(2, 200, 40.0, 0.0)]);
        let mut liquidity = BTreeMap::new();
        liquidity.insert(1, vec![liq(1, 100, 300.0)]);
        liquidity.insert(2, vec![liq(2, 150, 100.0)]);

        let rows = aggregate_ohlcv_across_pairs(&universe(), &candles, &liquidity);
        // t=100: only pair 1 has liquidity
        assert_eq!(rows[0].close, 10.0);
        // t=200: 300 vs 100
        assert_eq!(rows[1].close, 17.5);

        let rows = aggregate_ohlcv_across_pairs(&universe(), &candles, &BTreeMap::new());
        assert_eq!(rows[0].close, 25.0);
        assert_eq!(rows[0].liquidity, 0.0);
    }

    #[test]
    fn test_pools_contribute_only_where_they_have_candles() {
        let mut candles = BTreeMap::new();
        candles.insert(1, vec![candle(1, 100, 10.0, 1.0), candle(1, 200, 11.0, 1.0)]);
        candles.insert(2, vec![candle(2, 200, 13.0, 1.0)]);
        candles.insert(3, vec![candle(3, 100, 1.0, 1.0)]);

        let rows = aggregate_ohlcv_across_pairs(&universe(), &candles, &BTreeMap::new());
        let x: Vec<&AggregatedCandle> = rows.iter().filter(|r| r.base == "X").collect();
        assert_eq!(x.len(), 2);
        assert_eq!(x[0].pair_ids, vec![1]);
        assert_eq!(x[1].pair_ids, vec![1, 2]);
        assert_eq!(x[1].close, 12.0);
        assert_eq!(rows.iter().filter(|r| r.base == "Y").count(), 1);
    }
}
