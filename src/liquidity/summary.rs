/// Per-pair liquidity figures
///
/// "Historical" is a realistic max: the smallest of the top `k` daily
/// closes, so a single bad sample cannot make a pair look deep. "Today" is
/// sampled a few weeks back because liquidity indexers lag.
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::UniverseConfig;
use crate::logger::{self, LogTag};
use crate::market::{floor_week, LiquiditySample, PairId};

const DAY_SECS: i64 = 86_400;

/// Thresholds of the summary computation
#[derive(Debug, Clone, Copy)]
pub struct LiquidityParams {
    pub samples: usize,
    pub broken_ceiling_usd: f64,
    pub today_lag_days: i64,
    pub comparison_lag_days: i64,
    /// Reference "now" in unix seconds
    pub now: i64,
}

impl LiquidityParams {
    pub fn from_config(config: &UniverseConfig, now: i64) -> Self {
        Self {
            samples: config.liquidity_samples,
            broken_ceiling_usd: config.broken_liquidity_ceiling_usd,
            today_lag_days: config.today_lag_days,
            comparison_lag_days: config.comparison_lag_days,
            now,
        }
    }

    pub fn today_timestamp(&self) -> i64 {
        floor_week(self.now.saturating_sub(self.today_lag_days.saturating_mul(DAY_SECS)))
    }

    pub fn comparison_timestamp(&self) -> i64 {
        floor_week(self.now.saturating_sub(self.comparison_lag_days.saturating_mul(DAY_SECS)))
    }
}

fn top_k_min(series: &[LiquiditySample], samples: usize) -> Option<f64> {
    let mut closes: Vec<f64> = series
        .iter()
        .map(|s| s.close)
        .filter(|v| v.is_finite())
        .collect();
    if closes.is_empty() || samples == 0 {
        return None;
    }
    closes.sort_by(|a, b| b.total_cmp(a));
    closes.truncate(samples);
    closes.last().copied()
}

/// Smallest of the `samples` largest closes, 0 when above `broken_ceiling`
///
/// An empty series is 0. Fewer than `samples` rows use all of them.
pub fn realistic_max_liquidity(
    series: &[LiquiditySample],
    samples: usize,
    broken_ceiling: f64,
) -> f64 {
    match top_k_min(series, samples) {
        Some(value) if value > broken_ceiling => 0.0,
        Some(value) => value,
        None => 0.0,
    }
}

/// Close at exactly `timestamp`, 0 when there is no sample
pub fn liquidity_at(series: &[LiquiditySample], timestamp: i64) -> f64 {
    series
        .iter()
        .find(|s| s.timestamp == timestamp)
        .map(|s| s.close)
        .unwrap_or(0.0)
}

/// Close at `floor_week(now - lag_days)`
pub fn liquidity_today(series: &[LiquiditySample], now: i64, lag_days: i64) -> f64 {
    liquidity_at(series, floor_week(now - lag_days * DAY_SECS))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairLiquidity {
    pub historical: f64,
    pub today: f64,
    /// At the comparison date of the `at_date` ranking
    pub at_comparison: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LiquiditySummary {
    pub by_pair: HashMap<PairId, PairLiquidity>,
    /// Pairs with data whose realistic max was above the ceiling
    pub broken_pairs: HashSet<PairId>,
}

impl LiquiditySummary {
    pub fn get(&self, pair_id: PairId) -> PairLiquidity {
        self.by_pair.get(&pair_id).copied().unwrap_or_default()
    }

    pub fn historical(&self, pair_id: PairId) -> f64 {
        self.get(pair_id).historical
    }

    pub fn today(&self, pair_id: PairId) -> f64 {
        self.get(pair_id).today
    }

    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }

    /// Sum of historical and today liquidity over `pair_ids`
    pub fn totals<'a>(&self, pair_ids: impl IntoIterator<Item = &'a PairId>) -> (f64, f64) {
        pair_ids.into_iter().fold((0.0, 0.0), |(h, t), id| {
            let liq = self.get(*id);
            (h + liq.historical, t + liq.today)
        })
    }
}

/// Historical and today liquidity for every requested pair
///
/// A pair without rows gets zeros, never an error.
pub fn build_liquidity_summary(
    series_by_pair: &BTreeMap<PairId, Vec<LiquiditySample>>,
    pair_ids: &HashSet<PairId>,
    params: &LiquidityParams,
) -> LiquiditySummary {
    let today_ts = params.today_timestamp();
    let comparison_ts = params.comparison_timestamp();
    let mut summary = LiquiditySummary::default();

    for pair_id in pair_ids {
        let series = series_by_pair
            .get(pair_id)
            .map(|s| s.as_slice())
            .unwrap_or(&[]);

        if top_k_min(series, params.samples).map_or(false, |v| v > params.broken_ceiling_usd) {
            summary.broken_pairs.insert(*pair_id);
        }

        summary.by_pair.insert(
            *pair_id,
            PairLiquidity {
                historical: realistic_max_liquidity(
                    series,
                    params.samples,
                    params.broken_ceiling_usd,
                ),
                today: liquidity_at(series, today_ts),
                at_comparison: liquidity_at(series, comparison_ts),
            },
        );
    }

    let with_data = pair_ids
        .iter()
        .filter(|id| series_by_pair.get(id).map_or(false, |s| !s.is_empty()))
        .count();
    logger::info(
        LogTag::Liquidity,
        &format!(
            "Liquidity summary for {} pairs, {} with data, {} broken (above {:.0} USD)",
            pair_ids.len(),
            with_data,
            summary.broken_pairs.len(),
            params.broken_ceiling_usd
        ),
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::memory::liq;

    const DAY: i64 = 86_400;

    fn series(values: &[f64]) -> Vec<LiquiditySample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| liq(1, i as i64 * DAY, *v))
            .collect()
    }

    #[test]
    fn test_realistic_max_takes_min_of_top_k() {
        let s = series(&[1.0, 50.0, 40.0, 30.0, 1000.0, 2.0]);
        assert_eq!(realistic_max_liquidity(&s, 3, 1e8), 40.0);
    }

    #[test]
    fn test_realistic_max_short_series_and_empty() {
        let s = series(&[5.0, 7.0]);
        assert_eq!(realistic_max_liquidity(&s, 10, 1e8), 5.0);
        assert_eq!(realistic_max_liquidity(&[], 10, 1e8), 0.0);
    }

    #[test]
    fn test_realistic_max_above_ceiling_is_zero() {
        let s = series(&[2e8, 3e8, 4e8]);
        assert_eq!(realistic_max_liquidity(&s, 3, 1e8), 0.0);
    }

    #[test]
    fn test_liquidity_today_uses_lagged_week() {
        // Monday 2024-05-13 00:00 UTC
        let monday = 1_715_558_400;
        let s = vec![liq(1, monday - 7 * DAY, 10.0), liq(1, monday, 20.0)];

        // 21 days after a Thursday lands back in the week of `monday`
        let now = monday + 3 * DAY + 21 * DAY;
        assert_eq!(liquidity_today(&s, now, 21), 20.0);
        assert_eq!(liquidity_today(&s, now, 28), 10.0);
        assert_eq!(liquidity_at(&s, monday + DAY), 0.0);
    }

    #[test]
    fn test_summary_zero_for_missing_pair() {
        let mut by_pair = BTreeMap::new();
        by_pair.insert(1, series(&[10.0, 20.0]));
        by_pair.insert(3, series(&[5e8; 12]));

        let params = LiquidityParams {
            samples: 10,
            broken_ceiling_usd: 1e8,
            today_lag_days: 21,
            comparison_lag_days: 7,
            now: 100 * DAY,
        };
        let summary = build_liquidity_summary(&by_pair, &HashSet::from([1, 2, 3]), &params);

        assert_eq!(summary.len(), 3);
        assert_eq!(summary.historical(1), 10.0);
        assert_eq!(summary.get(2), PairLiquidity::default());
        assert_eq!(summary.historical(3), 0.0);
        assert!(summary.broken_pairs.contains(&3));
        assert_eq!(summary.totals(&[1, 2]).0, 10.0);
    }
}
