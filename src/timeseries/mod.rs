//! Per-pair time series helpers
//!
//! Market data arrives as flat tables covering many pairs. These helpers
//! split them into per-pair series ordered by timestamp, fill missing
//! buckets and clean up DEX price artifacts.

pub mod forward_fill;
pub mod wrangle;

use std::collections::BTreeMap;

use crate::market::{Candle, LiquiditySample, PairId};

pub use forward_fill::{forward_fill_candles, forward_fill_liquidity};
pub use wrangle::{fix_dex_price_data, WrangleStats};

/// A row that belongs to one pair at one timestamp
pub trait PairRow: Copy {
    fn pair_id(&self) -> PairId;
    fn timestamp(&self) -> i64;
}

impl PairRow for Candle {
    fn pair_id(&self) -> PairId {
        self.pair_id
    }
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl PairRow for LiquiditySample {
    fn pair_id(&self) -> PairId {
        self.pair_id
    }
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Split rows into ascending per-pair series
///
/// Duplicate timestamps within a pair keep the last row seen.
pub fn group_by_pair<T: PairRow>(rows: &[T]) -> BTreeMap<PairId, Vec<T>> {
    let mut grouped: BTreeMap<PairId, BTreeMap<i64, T>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.pair_id())
            .or_default()
            .insert(row.timestamp(), *row);
    }
    grouped
        .into_iter()
        .map(|(pair_id, series)| (pair_id, series.into_values().collect()))
        .collect()
}

/// Flatten per-pair series back into one table ordered by pair then time
pub fn flatten<T: PairRow>(grouped: BTreeMap<PairId, Vec<T>>) -> Vec<T> {
    grouped.into_values().flatten().collect()
}

/// Keep rows with `start <= timestamp < end`, open ended when None
pub fn clip_range<T: PairRow>(rows: Vec<T>, start: Option<i64>, end: Option<i64>) -> Vec<T> {
    rows.into_iter()
        .filter(|r| start.map_or(true, |s| r.timestamp() >= s))
        .filter(|r| end.map_or(true, |e| r.timestamp() < e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::memory::candle;

    #[test]
    fn test_group_by_pair_sorts_and_dedups() {
        let rows = vec![
            candle(2, 200, 1.0, 0.0),
            candle(1, 300, 1.0, 0.0),
            candle(1, 100, 1.0, 0.0),
            candle(1, 300, 2.0, 0.0),
        ];
        let grouped = group_by_pair(&rows);
        assert_eq!(grouped.len(), 2);

        let first: Vec<(i64, f64)> = grouped[&1].iter().map(|c| (c.timestamp, c.close)).collect();
        assert_eq!(first, vec![(100, 1.0), (300, 2.0)]);

        let flat = flatten(grouped);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[2].pair_id, 2);
    }

    #[test]
    fn test_clip_range() {
        let rows = vec![candle(1, 100, 1.0, 0.0), candle(1, 200, 1.0, 0.0), candle(1, 300, 1.0, 0.0)];
        let clipped = clip_range(rows, Some(200), Some(300));
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped[0].timestamp, 200);
    }
}
