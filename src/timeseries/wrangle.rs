/// DEX price clean-up
///
/// Raw DEX candles contain extraction artifacts: zero or negative prices
/// from broken pools and single-trade wicks that print far away from the
/// body. Those are removed before the data reaches any research notebook.
use std::collections::BTreeMap;

use crate::config::WrangleConfig;
use crate::logger::{self, LogTag};
use crate::market::{Candle, PairId, TimeBucket};

use super::forward_fill::forward_fill_candles;
use super::group_by_pair;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrangleStats {
    pub input_rows: usize,
    pub dropped_non_positive: usize,
    pub fixed_wicks: usize,
    pub filled_rows: usize,
}

fn is_valid_price(c: &Candle) -> bool {
    [c.open, c.high, c.low, c.close]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
}

/// Clamp wicks too far from the close back to the candle body
///
/// Returns true when the candle was modified.
fn fix_wick(c: &mut Candle, low_tolerance: f64, high_tolerance: f64) -> bool {
    let body_low = c.open.min(c.close);
    let body_high = c.open.max(c.close);
    let mut fixed = false;

    if c.low < c.close * low_tolerance {
        c.low = body_low;
        fixed = true;
    }
    if c.high > c.close * high_tolerance {
        c.high = body_high;
        fixed = true;
    }
    fixed
}

/// Clean all pairs of a candle table
///
/// Per pair: drop candles with non-positive prices, repair bad wicks and
/// optionally forward-fill missing buckets. Output is grouped per pair in
/// ascending time.
pub fn fix_dex_price_data(
    candles: &[Candle],
    bucket: TimeBucket,
    config: &WrangleConfig,
) -> (BTreeMap<PairId, Vec<Candle>>, WrangleStats) {
    let mut stats = WrangleStats {
        input_rows: candles.len(),
        ..Default::default()
    };

    let mut result = BTreeMap::new();
    for (pair_id, series) in group_by_pair(candles) {
        let mut cleaned: Vec<Candle> = Vec::with_capacity(series.len());
        for mut candle in series {
            if !is_valid_price(&candle) {
                stats.dropped_non_positive += 1;
                continue;
            }
            if fix_wick(&mut candle, config.low_tolerance, config.high_tolerance) {
                stats.fixed_wicks += 1;
            }
            cleaned.push(candle);
        }

        if config.forward_fill {
            let before = cleaned.len();
            cleaned = forward_fill_candles(&cleaned, bucket);
            stats.filled_rows += cleaned.len() - before;
        }

        if !cleaned.is_empty() {
            result.insert(pair_id, cleaned);
        }
    }

    logger::info(
        LogTag::Wrangle,
        &format!(
            "Wrangled {} candles of {} pairs: dropped {} non-positive, fixed {} wicks, forward-filled {}",
            stats.input_rows,
            result.len(),
            stats.dropped_non_positive,
            stats.fixed_wicks,
            stats.filled_rows
        ),
    );

    (result, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::memory::candle;

    const DAY: i64 = 86_400;

    #[test]
    fn test_drops_non_positive_prices() {
        let mut broken = candle(1, DAY, 1.0, 1.0);
        broken.low = 0.0;
        let candles = vec![candle(1, 0, 1.0, 1.0), broken, candle(1, 2 * DAY, 1.0, 1.0)];

        let config = WrangleConfig {
            forward_fill: false,
            ..Default::default()
        };
        let (out, stats) = fix_dex_price_data(&candles, TimeBucket::D1, &config);
        assert_eq!(out[&1].len(), 2);
        assert_eq!(stats.dropped_non_positive, 1);
    }

    #[test]
    fn test_fixes_bad_wicks() {
        let mut spiky = candle(1, 0, 10.0, 1.0);
        spiky.open = 9.0;
        spiky.high = 1000.0;
        spiky.low = 0.001;

        let (out, stats) = fix_dex_price_data(&[spiky], TimeBucket::D1, &WrangleConfig::default());
        let fixed = out[&1][0];
        assert_eq!(fixed.high, 10.0);
        assert_eq!(fixed.low, 9.0);
        assert_eq!(stats.fixed_wicks, 1);
    }

    #[test]
    fn test_forward_fills_after_dropping() {
        let mut broken = candle(1, DAY, 1.0, 1.0);
        broken.close = -1.0;
        let candles = vec![candle(1, 0, 5.0, 1.0), broken, candle(1, 2 * DAY, 6.0, 1.0)];

        let (out, stats) = fix_dex_price_data(&candles, TimeBucket::D1, &WrangleConfig::default());
        let series = &out[&1];
        assert_eq!(series.len(), 3);
        assert_eq!(series[1].close, 5.0);
        assert_eq!(series[1].volume, 0.0);
        assert_eq!(stats.filled_rows, 1);
    }
}
