//! Output writers
//!
//! CSV with fixed column orders for the research notebooks, Parquet for the
//! bulk datasets.

pub mod csv;
pub mod parquet;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use self::csv::{
    write_aggregate_csv, write_candles_csv, write_liquidity_csv, AGGREGATE_COLUMNS,
    DETAILED_COLUMNS, LIQUIDITY_COLUMNS, SIMPLE_COLUMNS,
};
pub use self::parquet::{read_parquet, write_parquet};

/// Column layout of the candle CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvLayout {
    /// ticker,timestamp,open,high,low,close,volume,link,pair_id
    Simple,
    /// ticker,timestamp,open,high,low,close,volume,base,quote,fee,link,pair_id
    Detailed,
    /// One synthetic series per base token
    Aggregate,
}

impl CsvLayout {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            CsvLayout::Simple => SIMPLE_COLUMNS,
            CsvLayout::Detailed => DETAILED_COLUMNS,
            CsvLayout::Aggregate => AGGREGATE_COLUMNS,
        }
    }
}

impl fmt::Display for CsvLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CsvLayout::Simple => "simple",
            CsvLayout::Detailed => "detailed",
            CsvLayout::Aggregate => "aggregate",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParquetCodec {
    Zstd,
    Snappy,
    Uncompressed,
}

impl ParquetCodec {
    /// Only zstd takes a level, 1 to 22
    pub fn level_in_range(&self, level: i32) -> bool {
        match self {
            ParquetCodec::Zstd => (1..=22).contains(&level),
            ParquetCodec::Snappy | ParquetCodec::Uncompressed => true,
        }
    }
}

impl fmt::Display for ParquetCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParquetCodec::Zstd => "zstd",
            ParquetCodec::Snappy => "snappy",
            ParquetCodec::Uncompressed => "uncompressed",
        };
        write!(f, "{}", name)
    }
}
