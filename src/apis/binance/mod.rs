/// Binance spot market data client
///
/// API Documentation: https://developers.binance.com/docs/binance-spot-api-docs/rest-api
///
/// Endpoints implemented:
/// 1. /api/v3/exchangeInfo - Symbol list with trading status
/// 2. /api/v3/klines - Candles, at most 1000 per request
pub mod types;

pub use self::types::{BinanceKline, ExchangeInfoReply, SymbolInfo};

use serde_json::Value;
use std::time::Duration;

use crate::apis::client::{parse_json, HttpClient, RateLimiter};
use crate::config::BinanceConfig;
use crate::errors::{ApiError, PipelineError, PipelineResult};
use crate::logger::{self, LogTag};
use crate::market::TimeBucket;

/// Binance caps klines per request
pub const KLINES_LIMIT: usize = 1000;

pub struct BinanceClient {
    http_client: HttpClient,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl BinanceClient {
    pub fn new(config: &BinanceConfig) -> PipelineResult<Self> {
        let http_client = HttpClient::new(config.request_timeout_secs)
            .map_err(|e| PipelineError::api("Binance", e))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(
                config.download_concurrency,
                Duration::from_millis(config.min_request_interval_ms),
            ),
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Symbols currently trading on spot, optionally limited to quote assets
    pub async fn fetch_spot_symbols(&self, quote_assets: &[String]) -> Result<Vec<SymbolInfo>, ApiError> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let _guard = self.rate_limiter.acquire().await?;

        let response = self.http_client.client().get(&url).send().await?;
        let reply: ExchangeInfoReply = parse_json(response, "binance.exchangeInfo").await?;

        let mut symbols: Vec<SymbolInfo> = reply
            .symbols
            .into_iter()
            .filter(|s| s.is_trading_spot())
            .filter(|s| quote_assets.is_empty() || quote_assets.iter().any(|q| q == &s.quote_asset))
            .collect();
        symbols.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        logger::debug(
            LogTag::Binance,
            &format!("exchangeInfo returned {} spot symbols", symbols.len()),
        );
        Ok(symbols)
    }

    /// One page of klines starting at `start_ms`
    pub async fn fetch_klines_page(
        &self,
        symbol: &str,
        bucket: TimeBucket,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<BinanceKline>, ApiError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let _guard = self.rate_limiter.acquire().await?;

        let response = self
            .http_client
            .client()
            .get(&url)
            .query(&[
                ("symbol", symbol.to_string()),
                ("interval", bucket.to_binance_interval().to_string()),
                ("startTime", start_ms.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", KLINES_LIMIT.to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<Vec<Value>> = parse_json(response, "binance.klines").await?;
        rows.iter()
            .map(|row| BinanceKline::from_row(symbol, row))
            .collect()
    }

    /// All klines of `symbol` in `[start, end)`, unix seconds
    pub async fn fetch_klines(
        &self,
        symbol: &str,
        bucket: TimeBucket,
        start: i64,
        end: i64,
    ) -> Result<Vec<BinanceKline>, ApiError> {
        let end_ms = end * 1000 - 1;
        let mut cursor_ms = start * 1000;
        let mut klines: Vec<BinanceKline> = Vec::new();

        while cursor_ms <= end_ms {
            let page = self.fetch_klines_page(symbol, bucket, cursor_ms, end_ms).await?;
            let Some(last) = page.last() else {
                break;
            };
            let next_ms = (last.timestamp + bucket.to_seconds()) * 1000;
            let full_page = page.len() >= KLINES_LIMIT;
            klines.extend(page);

            if !full_page || next_ms <= cursor_ms {
                break;
            }
            cursor_ms = next_ms;
        }

        logger::verbose(
            LogTag::Binance,
            &format!("{}: {} klines of {}", symbol, klines.len(), bucket),
        );
        Ok(klines)
    }
}
