//! Liquidity-based pair selection
//!
//! `summary` turns liquidity time series into per-pair figures,
//! `ranking` orders candidates by those figures and keeps the most liquid
//! pool per base token.

pub mod ranking;
pub mod summary;

use serde::{Deserialize, Serialize};

pub use ranking::{base_token_pools, dedup_key_of, rank_pairs, RankedPair, RankingPolicy};
pub use summary::{
    build_liquidity_summary, liquidity_at, liquidity_today, realistic_max_liquidity,
    LiquidityParams, LiquiditySummary, PairLiquidity,
};

/// Figure pairs are ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    /// Realistic historical max, not biased towards pairs that survived
    HistoricalMax,
    /// Liquidity at the comparison date
    AtDate,
}

/// Attribute under which only the most liquid pool survives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    BaseAddress,
    BaseSymbol,
    /// `BASE-QUOTE`
    SimpleTicker,
}
