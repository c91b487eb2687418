/// Trading Strategy dataset client
///
/// Downloads the public datasets into a local cache directory and decodes
/// them from there. A cached file is reused until it is older than
/// `cache_max_age_hours`.
///
/// Endpoints implemented:
/// 1. /exchange-universe - Exchanges as JSON
/// 2. /pair-universe - Pair reference data as Parquet
/// 3. /candles-all?bucket= - OHLCV of every pair as Parquet
/// 4. /liquidity-all?bucket= - Liquidity of every pair as Parquet
pub mod types;

pub use self::types::{ExchangeEntry, ExchangeUniverseReply};

use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::apis::client::{check_status, HttpClient, RateLimiter};
use crate::config::MarketDataConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::export::read_parquet;
use crate::logger::{self, LogTag};
use crate::market::frames::{frame_to_candles, frame_to_liquidity, frame_to_pairs};
use crate::market::{
    Candle, Exchange, LiquiditySample, MarketDataSource, PairId, TimeBucket, TradingPair,
};

const SOURCE_NAME: &str = "Trading Strategy";

pub struct TradingStrategyClient {
    http_client: HttpClient,
    rate_limiter: RateLimiter,
    base_url: String,
    api_key: Option<String>,
    dataset_dir: PathBuf,
    max_age: Duration,
}

impl TradingStrategyClient {
    pub fn new(
        config: &MarketDataConfig,
        dataset_dir: PathBuf,
        api_key: Option<String>,
    ) -> PipelineResult<Self> {
        let http_client = HttpClient::new(config.request_timeout_secs)
            .map_err(|e| PipelineError::api(SOURCE_NAME, e))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(1, Duration::ZERO),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            dataset_dir,
            max_age: Duration::from_secs(config.cache_max_age_hours * 3600),
        })
    }

    pub fn api_key_from_env(config: &MarketDataConfig) -> Option<String> {
        std::env::var(&config.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Path of a dataset file, downloading it when missing or stale
    pub async fn ensure_dataset(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        file_name: &str,
    ) -> PipelineResult<PathBuf> {
        let path = self.dataset_dir.join(file_name);
        if is_fresh(&path, self.max_age) {
            logger::debug(
                LogTag::Cache,
                &format!("Using cached dataset {}", path.display()),
            );
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.dataset_dir).await?;
        let url = format!("{}/{}", self.base_url, endpoint);
        logger::info(
            LogTag::MarketData,
            &format!("Downloading {} to {}", url, path.display()),
        );

        let _guard = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| PipelineError::api(SOURCE_NAME, e))?;

        let mut request = self.http_client.client().get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::api(SOURCE_NAME, e.into()))?;
        let response = check_status(response, endpoint)
            .await
            .map_err(|e| PipelineError::api(SOURCE_NAME, e))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::api(SOURCE_NAME, e.into()))?;

        let tmp_path = path.with_extension("download");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        logger::info(
            LogTag::MarketData,
            &format!("Saved {} ({} bytes)", file_name, bytes.len()),
        );
        Ok(path)
    }

    async fn load_frame(&self, path: PathBuf) -> PipelineResult<DataFrame> {
        tokio::task::spawn_blocking(move || read_parquet(&path))
            .await
            .map_err(|e| PipelineError::market_data(format!("Parquet reader task failed: {}", e)))?
    }
}

/// Whether `path` exists and was modified within `max_age`
fn is_fresh(path: &Path, max_age: Duration) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    metadata
        .modified()
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age <= max_age)
        .unwrap_or(false)
}

#[async_trait]
impl MarketDataSource for TradingStrategyClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_exchanges(&self) -> PipelineResult<Vec<Exchange>> {
        let path = self
            .ensure_dataset("exchange-universe", &[], "exchange-universe.json")
            .await?;
        let contents = tokio::fs::read_to_string(&path).await?;
        let reply: ExchangeUniverseReply = serde_json::from_str(&contents)?;
        let exchanges = reply.into_exchanges();

        logger::debug(
            LogTag::MarketData,
            &format!("Exchange universe has {} exchanges", exchanges.len()),
        );
        Ok(exchanges)
    }

    async fn fetch_pairs(&self) -> PipelineResult<Vec<TradingPair>> {
        let path = self
            .ensure_dataset("pair-universe", &[], "pair-universe.parquet")
            .await?;
        let df = self.load_frame(path).await?;
        let pairs = frame_to_pairs(&df)?;

        logger::debug(
            LogTag::MarketData,
            &format!("Pair universe has {} pairs", pairs.len()),
        );
        Ok(pairs)
    }

    async fn fetch_liquidity(
        &self,
        bucket: TimeBucket,
        pair_ids: &HashSet<PairId>,
    ) -> PipelineResult<Vec<LiquiditySample>> {
        let file_name = format!("liquidity-samples-{}.parquet", bucket);
        let path = self
            .ensure_dataset("liquidity-all", &[("bucket", bucket.as_str())], &file_name)
            .await?;
        let df = self.load_frame(path).await?;

        let mut samples = frame_to_liquidity(&df)?;
        samples.retain(|s| pair_ids.contains(&s.pair_id));
        logger::debug(
            LogTag::MarketData,
            &format!(
                "Loaded {} liquidity samples for {} pairs",
                samples.len(),
                pair_ids.len()
            ),
        );
        Ok(samples)
    }

    async fn fetch_candles(
        &self,
        bucket: TimeBucket,
        pair_ids: &HashSet<PairId>,
    ) -> PipelineResult<Vec<Candle>> {
        let file_name = format!("candles-{}.parquet", bucket);
        let path = self
            .ensure_dataset("candles-all", &[("bucket", bucket.as_str())], &file_name)
            .await?;
        let df = self.load_frame(path).await?;

        let mut candles = frame_to_candles(&df)?;
        candles.retain(|c| pair_ids.contains(&c.pair_id));
        logger::debug(
            LogTag::MarketData,
            &format!("Loaded {} candles for {} pairs", candles.len(), pair_ids.len()),
        );
        Ok(candles)
    }
}
