/// Forward-fill of missing buckets
///
/// DEX pairs only produce a candle when a trade happens and liquidity is
/// only sampled when it changes. Gaps are filled with the previous close,
/// candles with zero volume.
use crate::market::{Candle, LiquiditySample, TimeBucket};

/// Fill gaps of one ascending candle series
pub fn forward_fill_candles(series: &[Candle], bucket: TimeBucket) -> Vec<Candle> {
    if series.len() < 2 {
        return series.to_vec();
    }

    let step = bucket.to_seconds();
    let mut result = Vec::with_capacity(series.len());

    for (i, current) in series.iter().enumerate() {
        result.push(*current);

        if let Some(next) = series.get(i + 1) {
            let mut ts = current.timestamp + step;
            while ts < next.timestamp {
                result.push(Candle {
                    pair_id: current.pair_id,
                    timestamp: ts,
                    open: current.close,
                    high: current.close,
                    low: current.close,
                    close: current.close,
                    volume: 0.0,
                });
                ts += step;
            }
        }
    }

    result
}

/// Fill gaps of one ascending liquidity series
pub fn forward_fill_liquidity(series: &[LiquiditySample], bucket: TimeBucket) -> Vec<LiquiditySample> {
    if series.len() < 2 {
        return series.to_vec();
    }

    let step = bucket.to_seconds();
    let mut result = Vec::with_capacity(series.len());

    for (i, current) in series.iter().enumerate() {
        result.push(*current);

        if let Some(next) = series.get(i + 1) {
            let mut ts = current.timestamp + step;
            while ts < next.timestamp {
                result.push(LiquiditySample {
                    pair_id: current.pair_id,
                    timestamp: ts,
                    open: current.close,
                    high: current.close,
                    low: current.close,
                    close: current.close,
                });
                ts += step;
            }
        }
    }

    result
}
