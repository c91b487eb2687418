/// CSV writers with fixed column orders
use std::path::Path;

use crate::aggregate::AggregatedCandle;
use crate::errors::{PipelineError, PipelineResult};
use crate::logger::{self, LogTag};
use crate::market::{format_timestamp, Candle, LiquiditySample, PairUniverse};

use super::CsvLayout;

pub const SIMPLE_COLUMNS: &[&str] = &[
    "ticker", "timestamp", "open", "high", "low", "close", "volume", "link", "pair_id",
];

pub const DETAILED_COLUMNS: &[&str] = &[
    "ticker", "timestamp", "open", "high", "low", "close", "volume", "base", "quote", "fee",
    "link", "pair_id",
];

pub const AGGREGATE_COLUMNS: &[&str] = &[
    "base",
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "liquidity",
    "aggregate_id",
    "pair_ids",
];

pub const LIQUIDITY_COLUMNS: &[&str] = &["pair_id", "timestamp", "open", "high", "low", "close"];

fn open_writer(path: &Path) -> PipelineResult<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(csv::Writer::from_path(path)?)
}

/// Per-pair candles in the simple or detailed layout; returns rows written
///
/// Candles of pairs missing from `universe` are skipped.
pub fn write_candles_csv(
    path: &Path,
    layout: CsvLayout,
    candles: &[Candle],
    universe: &PairUniverse,
) -> PipelineResult<usize> {
    if layout == CsvLayout::Aggregate {
        return Err(PipelineError::validation(
            "Aggregate layout needs aggregated candles",
        ));
    }

    let mut writer = open_writer(path)?;
    writer.write_record(layout.columns())?;

    let mut rows = 0;
    for candle in candles {
        let Some(pair) = universe.get(candle.pair_id) else {
            continue;
        };
        let mut record = vec![
            pair.ticker(),
            format_timestamp(candle.timestamp),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
        ];
        if layout == CsvLayout::Detailed {
            record.push(pair.base_token_symbol.clone());
            record.push(pair.quote_token_symbol.clone());
            record.push(pair.fee.to_string());
        }
        record.push(pair.link());
        record.push(pair.pair_id.to_string());

        writer.write_record(&record)?;
        rows += 1;
    }
    writer.flush()?;

    logger::info(
        LogTag::Export,
        &format!("Wrote {} candle rows ({}) to {}", rows, layout, path.display()),
    );
    Ok(rows)
}

/// Aggregated series, `pair_ids` space separated
pub fn write_aggregate_csv(path: &Path, candles: &[AggregatedCandle]) -> PipelineResult<usize> {
    let mut writer = open_writer(path)?;
    writer.write_record(AGGREGATE_COLUMNS)?;

    for candle in candles {
        let pair_ids: Vec<String> = candle.pair_ids.iter().map(|id| id.to_string()).collect();
        writer.write_record(&[
            candle.base.clone(),
            format_timestamp(candle.timestamp),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
            candle.liquidity.to_string(),
            candle.aggregate_id.clone(),
            pair_ids.join(" "),
        ])?;
    }
    writer.flush()?;

    logger::info(
        LogTag::Export,
        &format!("Wrote {} aggregated rows to {}", candles.len(), path.display()),
    );
    Ok(candles.len())
}

pub fn write_liquidity_csv(path: &Path, samples: &[LiquiditySample]) -> PipelineResult<usize> {
    let mut writer = open_writer(path)?;
    writer.write_record(LIQUIDITY_COLUMNS)?;

    for sample in samples {
        writer.write_record(&[
            sample.pair_id.to_string(),
            format_timestamp(sample.timestamp),
            sample.open.to_string(),
            sample.high.to_string(),
            sample.low.to_string(),
            sample.close.to_string(),
        ])?;
    }
    writer.flush()?;

    logger::info(
        LogTag::Export,
        &format!("Wrote {} liquidity rows to {}", samples.len(), path.display()),
    );
    Ok(samples.len())
}
