/// Binance spot REST response types
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApiError;

/// `GET /api/v3/exchangeInfo` reply, symbols only
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoReply {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default = "default_true")]
    pub is_spot_trading_allowed: bool,
}

fn default_true() -> bool {
    true
}

impl SymbolInfo {
    pub fn is_trading_spot(&self) -> bool {
        self.status == "TRADING" && self.is_spot_trading_allowed
    }
}

/// One candle of one symbol, timestamp in unix seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinanceKline {
    pub symbol: String,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub trades: u64,
}

fn number_at(row: &[Value], index: usize) -> Option<f64> {
    match row.get(index)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

impl BinanceKline {
    /// Parse a `GET /api/v3/klines` row:
    /// `[open_time, open, high, low, close, volume, close_time, quote_volume, trades, ...]`
    pub fn from_row(symbol: &str, row: &[Value]) -> Result<Self, ApiError> {
        let parse = || -> Option<Self> {
            Some(Self {
                symbol: symbol.to_string(),
                timestamp: row.first()?.as_i64()? / 1000,
                open: number_at(row, 1)?,
                high: number_at(row, 2)?,
                low: number_at(row, 3)?,
                close: number_at(row, 4)?,
                volume: number_at(row, 5)?,
                quote_volume: number_at(row, 7)?,
                trades: row.get(8)?.as_u64()?,
            })
        };
        parse().ok_or_else(|| {
            ApiError::InvalidResponse(format!("Malformed kline row for {}: {:?}", symbol, row))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exchange_info() {
        let json = r#"{"timezone": "UTC", "symbols": [
            {"symbol": "ETHBTC", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "BTC",
             "isSpotTradingAllowed": true},
            {"symbol": "LUNAUSDT", "status": "BREAK", "baseAsset": "LUNA", "quoteAsset": "USDT"},
            {"symbol": "XUSDT", "status": "TRADING", "baseAsset": "X", "quoteAsset": "USDT",
             "isSpotTradingAllowed": false}
        ]}"#;
        let reply: ExchangeInfoReply = serde_json::from_str(json).unwrap();
        let trading: Vec<&str> = reply
            .symbols
            .iter()
            .filter(|s| s.is_trading_spot())
            .map(|s| s.symbol.as_str())
            .collect();
        assert_eq!(trading, vec!["ETHBTC"]);
    }

    #[test]
    fn test_parse_kline_row() {
        let row: Vec<Value> = serde_json::from_str(
            r#"[1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100",
                "148976.11427815", 1499644799999, "2434.19055334", 308, "1756.87402397",
                "28.46694368", "0"]"#,
        )
        .unwrap();
        let kline = BinanceKline::from_row("ETHBTC", &row).unwrap();
        assert_eq!(kline.timestamp, 1_499_040_000);
        assert_eq!(kline.close, 0.015771);
        assert_eq!(kline.trades, 308);

        assert!(BinanceKline::from_row("ETHBTC", &row[..4]).is_err());
    }
}
