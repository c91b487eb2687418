/// Conversions between market data rows and polars DataFrames
///
/// Datasets on disk store `timestamp` as a millisecond Datetime. Readers
/// also accept other Datetime units, Date and plain integer seconds.
use polars::prelude::*;

use crate::errors::{PipelineError, PipelineResult};

use super::types::{Candle, LiquiditySample, TradingPair};

fn timestamp_column(values: &[i64]) -> PolarsResult<Column> {
    let millis: Vec<i64> = values.iter().map(|ts| ts * 1000).collect();
    Column::new("timestamp".into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}

pub fn candles_to_frame(candles: &[Candle]) -> PipelineResult<DataFrame> {
    let ts: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
    Ok(DataFrame::new(vec![
        Column::new("pair_id".into(), candles.iter().map(|c| c.pair_id).collect::<Vec<u64>>()),
        timestamp_column(&ts)?,
        Column::new("open".into(), candles.iter().map(|c| c.open).collect::<Vec<f64>>()),
        Column::new("high".into(), candles.iter().map(|c| c.high).collect::<Vec<f64>>()),
        Column::new("low".into(), candles.iter().map(|c| c.low).collect::<Vec<f64>>()),
        Column::new("close".into(), candles.iter().map(|c| c.close).collect::<Vec<f64>>()),
        Column::new("volume".into(), candles.iter().map(|c| c.volume).collect::<Vec<f64>>()),
    ])?)
}

pub fn liquidity_to_frame(samples: &[LiquiditySample]) -> PipelineResult<DataFrame> {
    let ts: Vec<i64> = samples.iter().map(|s| s.timestamp).collect();
    Ok(DataFrame::new(vec![
        Column::new("pair_id".into(), samples.iter().map(|s| s.pair_id).collect::<Vec<u64>>()),
        timestamp_column(&ts)?,
        Column::new("open".into(), samples.iter().map(|s| s.open).collect::<Vec<f64>>()),
        Column::new("high".into(), samples.iter().map(|s| s.high).collect::<Vec<f64>>()),
        Column::new("low".into(), samples.iter().map(|s| s.low).collect::<Vec<f64>>()),
        Column::new("close".into(), samples.iter().map(|s| s.close).collect::<Vec<f64>>()),
    ])?)
}

fn f64_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn u64_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<u64>> {
    let column = df.column(name)?.cast(&DataType::UInt64)?;
    column
        .as_materialized_series()
        .u64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| PipelineError::market_data(format!("Null in column {}", name))))
        .collect()
}

/// Unix seconds from a Datetime, Date or integer column
fn timestamp_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<i64>> {
    let column = df.column(name)?;
    let divisor_or_multiplier: (i64, i64) = match column.dtype() {
        DataType::Datetime(TimeUnit::Nanoseconds, _) => (1_000_000_000, 1),
        DataType::Datetime(TimeUnit::Microseconds, _) => (1_000_000, 1),
        DataType::Datetime(TimeUnit::Milliseconds, _) => (1_000, 1),
        DataType::Date => (1, 86_400),
        _ => (1, 1),
    };
    let (divisor, multiplier) = divisor_or_multiplier;

    let raw = column.cast(&DataType::Int64)?;
    raw.as_materialized_series()
        .i64()?
        .into_iter()
        .map(|v| {
            v.map(|x| x.div_euclid(divisor) * multiplier)
                .ok_or_else(|| PipelineError::market_data(format!("Null in column {}", name)))
        })
        .collect()
}

fn str_values(df: &DataFrame, name: &str) -> PipelineResult<Option<Vec<String>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let column = column.cast(&DataType::String)?;
    Ok(Some(
        column
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect(),
    ))
}

fn required_str_values(df: &DataFrame, name: &str) -> PipelineResult<Vec<String>> {
    str_values(df, name)?
        .ok_or_else(|| PipelineError::market_data(format!("Pair dataset lacks column {}", name)))
}

pub fn frame_to_candles(df: &DataFrame) -> PipelineResult<Vec<Candle>> {
    let pair_ids = u64_values(df, "pair_id")?;
    let timestamps = timestamp_values(df, "timestamp")?;
    let open = f64_values(df, "open")?;
    let high = f64_values(df, "high")?;
    let low = f64_values(df, "low")?;
    let close = f64_values(df, "close")?;
    let volume = f64_values(df, "volume")?;

    Ok((0..df.height())
        .map(|i| Candle {
            pair_id: pair_ids[i],
            timestamp: timestamps[i],
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: if volume[i].is_nan() { 0.0 } else { volume[i] },
        })
        .collect())
}

pub fn frame_to_liquidity(df: &DataFrame) -> PipelineResult<Vec<LiquiditySample>> {
    let pair_ids = u64_values(df, "pair_id")?;
    let timestamps = timestamp_values(df, "timestamp")?;
    let open = f64_values(df, "open")?;
    let high = f64_values(df, "high")?;
    let low = f64_values(df, "low")?;
    let close = f64_values(df, "close")?;

    Ok((0..df.height())
        .map(|i| LiquiditySample {
            pair_id: pair_ids[i],
            timestamp: timestamps[i],
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
        })
        .collect())
}

/// Pair universe rows
///
/// Base and quote addresses come from explicit columns when present,
/// otherwise from `token0`/`token1` matched against the base symbol.
pub fn frame_to_pairs(df: &DataFrame) -> PipelineResult<Vec<TradingPair>> {
    let pair_ids = u64_values(df, "pair_id")?;
    let chain_ids = u64_values(df, "chain_id")?;
    let exchange_ids = u64_values(df, "exchange_id")?;
    let exchange_slugs = required_str_values(df, "exchange_slug")?;
    let pair_slugs = required_str_values(df, "pair_slug")?;
    let base_symbols = required_str_values(df, "base_token_symbol")?;
    let quote_symbols = required_str_values(df, "quote_token_symbol")?;

    let fees: Vec<u32> = if df.column("fee").is_ok() {
        f64_values(df, "fee")?
            .into_iter()
            .map(|f| if f.is_finite() { f as u32 } else { 0 })
            .collect()
    } else {
        vec![0; df.height()]
    };

    let (base_addresses, quote_addresses) = match (
        str_values(df, "base_token_address")?,
        str_values(df, "quote_token_address")?,
    ) {
        (Some(base), Some(quote)) => (base, quote),
        _ => {
            let token0 = required_str_values(df, "token0_address")?;
            let token1 = required_str_values(df, "token1_address")?;
            let token0_symbols = required_str_values(df, "token0_symbol")?;
            let mut base = Vec::with_capacity(df.height());
            let mut quote = Vec::with_capacity(df.height());
            for i in 0..df.height() {
                if token0_symbols[i] == base_symbols[i] {
                    base.push(token0[i].clone());
                    quote.push(token1[i].clone());
                } else {
                    base.push(token1[i].clone());
                    quote.push(token0[i].clone());
                }
            }
            (base, quote)
        }
    };

    Ok((0..df.height())
        .map(|i| TradingPair {
            pair_id: pair_ids[i],
            chain_id: chain_ids[i],
            exchange_id: exchange_ids[i],
            exchange_slug: exchange_slugs[i].clone(),
            pair_slug: pair_slugs[i].clone(),
            base_token_symbol: base_symbols[i].clone(),
            quote_token_symbol: quote_symbols[i].clone(),
            base_token_address: base_addresses[i].to_lowercase(),
            quote_token_address: quote_addresses[i].to_lowercase(),
            fee: fees[i],
        })
        .collect())
}
