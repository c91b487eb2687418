/// In-memory market data source for tests
use async_trait::async_trait;
use std::collections::HashSet;

use crate::errors::PipelineResult;

use super::types::{Candle, Exchange, LiquiditySample, PairId, TimeBucket, TradingPair};
use super::MarketDataSource;

#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    pub exchanges: Vec<Exchange>,
    pub pairs: Vec<TradingPair>,
    pub liquidity: Vec<LiquiditySample>,
    pub candles: Vec<Candle>,
}

#[async_trait]
impl MarketDataSource for InMemoryMarketData {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_exchanges(&self) -> PipelineResult<Vec<Exchange>> {
        Ok(self.exchanges.clone())
    }

    async fn fetch_pairs(&self) -> PipelineResult<Vec<TradingPair>> {
        Ok(self.pairs.clone())
    }

    async fn fetch_liquidity(
        &self,
        _bucket: TimeBucket,
        pair_ids: &HashSet<PairId>,
    ) -> PipelineResult<Vec<LiquiditySample>> {
        Ok(self
            .liquidity
            .iter()
            .filter(|s| pair_ids.contains(&s.pair_id))
            .copied()
            .collect())
    }

    async fn fetch_candles(
        &self,
        _bucket: TimeBucket,
        pair_ids: &HashSet<PairId>,
    ) -> PipelineResult<Vec<Candle>> {
        Ok(self
            .candles
            .iter()
            .filter(|c| pair_ids.contains(&c.pair_id))
            .copied()
            .collect())
    }
}

/// Build a pair on chain 1 with addresses derived from the symbols
pub fn test_pair(
    pair_id: PairId,
    exchange_id: u64,
    exchange_slug: &str,
    base: &str,
    quote: &str,
) -> TradingPair {
    TradingPair {
        pair_id,
        chain_id: 1,
        exchange_id,
        exchange_slug: exchange_slug.to_string(),
        pair_slug: format!("{}-{}", base, quote).to_lowercase(),
        base_token_symbol: base.to_string(),
        quote_token_symbol: quote.to_string(),
        base_token_address: format!("0x{}", base.to_lowercase()),
        quote_token_address: format!("0x{}", quote.to_lowercase()),
        fee: 30,
    }
}

pub fn test_exchange(exchange_id: u64, slug: &str) -> Exchange {
    Exchange {
        exchange_id,
        chain_id: 1,
        exchange_slug: slug.to_string(),
        name: slug.to_string(),
    }
}

/// Constant liquidity sample
pub fn liq(pair_id: PairId, timestamp: i64, close: f64) -> LiquiditySample {
    LiquiditySample {
        pair_id,
        timestamp,
        open: close,
        high: close,
        low: close,
        close,
    }
}

/// Flat candle at `price`
pub fn candle(pair_id: PairId, timestamp: i64, price: f64, volume: f64) -> Candle {
    Candle {
        pair_id,
        timestamp,
        open: price,
        high: price,
        low: price,
        close: price,
        volume,
    }
}
