//! Market data access
//!
//! Pipelines read exchanges, pairs, liquidity and candles through the
//! `MarketDataSource` trait. `apis::tradingstrategy::TradingStrategyClient`
//! is the production implementation; tests use the in-memory source.

pub mod frames;
pub mod types;
pub mod universe;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::errors::PipelineResult;

pub use types::{
    floor_week, format_timestamp, Candle, ChainId, Exchange, LiquiditySample, PairId, TimeBucket,
    TradingPair,
};
pub use universe::{filter_pairs_default, resolve_exchange_ids, PairFilter, PairUniverse};

/// Source of the reference and time series tables
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    async fn fetch_exchanges(&self) -> PipelineResult<Vec<Exchange>>;

    async fn fetch_pairs(&self) -> PipelineResult<Vec<TradingPair>>;

    /// Liquidity samples of the given pairs; pairs without data are absent
    async fn fetch_liquidity(
        &self,
        bucket: TimeBucket,
        pair_ids: &HashSet<PairId>,
    ) -> PipelineResult<Vec<LiquiditySample>>;

    /// Candles of the given pairs; pairs without data are absent
    async fn fetch_candles(
        &self,
        bucket: TimeBucket,
        pair_ids: &HashSet<PairId>,
    ) -> PipelineResult<Vec<Candle>>;
}
