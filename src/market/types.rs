/// Market data types: pairs, exchanges, candles and liquidity samples
///
/// Timestamps are unix seconds (UTC) at the start of the bucket.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PairId = u64;

const WEEK_SECS: i64 = 7 * 86_400;
/// 1970-01-01 was a Thursday, the first Monday is four days later
const FIRST_MONDAY: i64 = 4 * 86_400;

/// Candle interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeBucket {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "7d")]
    D7,
}

impl TimeBucket {
    pub fn to_seconds(&self) -> i64 {
        match self {
            TimeBucket::M1 => 60,
            TimeBucket::M5 => 300,
            TimeBucket::M15 => 900,
            TimeBucket::H1 => 3_600,
            TimeBucket::H4 => 14_400,
            TimeBucket::D1 => 86_400,
            TimeBucket::D7 => WEEK_SECS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeBucket::M1 => "1m",
            TimeBucket::M5 => "5m",
            TimeBucket::M15 => "15m",
            TimeBucket::H1 => "1h",
            TimeBucket::H4 => "4h",
            TimeBucket::D1 => "1d",
            TimeBucket::D7 => "7d",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<TimeBucket> {
        match s {
            "1m" => Some(TimeBucket::M1),
            "5m" => Some(TimeBucket::M5),
            "15m" => Some(TimeBucket::M15),
            "1h" => Some(TimeBucket::H1),
            "4h" => Some(TimeBucket::H4),
            "1d" => Some(TimeBucket::D1),
            "7d" => Some(TimeBucket::D7),
            _ => None,
        }
    }

    /// Binance kline interval name
    pub fn to_binance_interval(&self) -> &'static str {
        match self {
            TimeBucket::D7 => "1w",
            other => other.as_str(),
        }
    }

    /// Start of the bucket containing `ts`
    pub fn floor(&self, ts: i64) -> i64 {
        if *self == TimeBucket::D7 {
            return floor_week(ts);
        }
        let secs = self.to_seconds();
        ts.div_euclid(secs) * secs
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Floor a timestamp to Monday 00:00 UTC of its week
pub fn floor_week(ts: i64) -> i64 {
    (ts - FIRST_MONDAY).div_euclid(WEEK_SECS) * WEEK_SECS + FIRST_MONDAY
}

/// Human readable UTC timestamp for logs and CSV output
pub fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// EVM chain id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Slug used in Trading Strategy URLs and TokenSniffer paths
    pub fn slug(&self) -> String {
        match self.0 {
            1 => "ethereum".to_string(),
            56 => "binance".to_string(),
            137 => "polygon".to_string(),
            42161 => "arbitrum".to_string(),
            43114 => "avalanche".to_string(),
            8453 => "base".to_string(),
            other => format!("chain-{}", other),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub exchange_id: u64,
    pub chain_id: u64,
    pub exchange_slug: String,
    pub name: String,
}

/// Reference data of one trading pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPair {
    pub pair_id: PairId,
    pub chain_id: u64,
    pub exchange_id: u64,
    pub exchange_slug: String,
    pub pair_slug: String,
    pub base_token_symbol: String,
    pub quote_token_symbol: String,
    pub base_token_address: String,
    pub quote_token_address: String,
    /// Pool fee in basis points
    pub fee: u32,
}

impl TradingPair {
    /// `BASE-QUOTE-exchange-FEEbps`
    pub fn ticker(&self) -> String {
        format!(
            "{}-{}-{}-{}bps",
            self.base_token_symbol, self.quote_token_symbol, self.exchange_slug, self.fee
        )
    }

    /// `BASE-QUOTE`
    pub fn simple_ticker(&self) -> String {
        format!("{}-{}", self.base_token_symbol, self.quote_token_symbol)
    }

    /// Trading Strategy explorer page of the pair
    pub fn link(&self) -> String {
        format!(
            "https://tradingstrategy.ai/trading-view/{}/{}/{}",
            ChainId(self.chain_id).slug(),
            self.exchange_slug,
            self.pair_slug
        )
    }
}

/// USD pool depth of a pair over one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquiditySample {
    pub pair_id: PairId,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub pair_id: PairId,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn weekday_of(ts: i64) -> u32 {
        DateTime::<Utc>::from_timestamp(ts, 0)
            .unwrap()
            .weekday()
            .num_days_from_monday()
    }

    fn pair() -> TradingPair {
        TradingPair {
            pair_id: 1,
            chain_id: 1,
            exchange_id: 3,
            exchange_slug: "uniswap-v3".to_string(),
            pair_slug: "eth-usdc-fee-5".to_string(),
            base_token_symbol: "WETH".to_string(),
            quote_token_symbol: "USDC".to_string(),
            base_token_address: "0xc02a".to_string(),
            quote_token_address: "0xa0b8".to_string(),
            fee: 5,
        }
    }

    #[test]
    fn test_tickers_and_link() {
        let p = pair();
        assert_eq!(p.ticker(), "WETH-USDC-uniswap-v3-5bps");
        assert_eq!(p.simple_ticker(), "WETH-USDC");
        assert_eq!(
            p.link(),
            "https://tradingstrategy.ai/trading-view/ethereum/uniswap-v3/eth-usdc-fee-5"
        );
    }

    #[test]
    fn test_floor_week_lands_on_monday() {
        // 2024-05-16 13:00 UTC, a Thursday
        let ts = 1_715_864_400;
        let floored = floor_week(ts);
        assert_eq!(weekday_of(floored), 0);
        assert_eq!(floored % 86_400, 0);
        assert!(ts - floored < WEEK_SECS);
        assert_eq!(floor_week(floored), floored);
    }

    #[test]
    fn test_bucket_floor_and_parse() {
        assert_eq!(TimeBucket::H1.floor(7_205), 7_200);
        assert_eq!(TimeBucket::from_str("4h"), Some(TimeBucket::H4));
        assert_eq!(TimeBucket::from_str("2d"), None);
        assert_eq!(TimeBucket::D7.to_binance_interval(), "1w");
        assert_eq!(format_timestamp(86_400), "1970-01-02 00:00:00");
    }
}
