/// TokenSniffer API client for token risk scores
///
/// API Documentation: https://tokensniffer.readme.io/
///
/// Endpoints implemented:
/// 1. /api/v2/tokens/{chain_id}/{address} - Token audit with score
pub mod types;

pub use self::types::TokenSnifferReply;

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use crate::apis::client::{check_status, HttpClient, RateLimiter};
use crate::config::RiskConfig;
use crate::errors::{ApiError, PipelineError, PipelineResult};
use crate::logger::{self, LogTag};
use crate::risk::{RiskAssessment, RiskScorer};

pub struct TokenSnifferClient {
    http_client: HttpClient,
    rate_limiter: RateLimiter,
    base_url: String,
    api_key: String,
}

impl TokenSnifferClient {
    pub fn new(config: &RiskConfig, api_key: String) -> PipelineResult<Self> {
        let http_client = HttpClient::new(config.request_timeout_secs)
            .map_err(|e| PipelineError::api("TokenSniffer", e))?;
        let rate_limiter =
            RateLimiter::new(1, Duration::from_millis(config.min_request_interval_ms));

        Ok(Self {
            http_client,
            rate_limiter,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Read the API key from the configured environment variable
    ///
    /// None when unset or empty.
    pub fn api_key_from_env(config: &RiskConfig) -> Option<String> {
        std::env::var(&config.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Raw token report
    pub async fn fetch_token_info(
        &self,
        chain_id: u64,
        address: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/tokens/{}/{}", self.base_url, chain_id, address);

        let _guard = self.rate_limiter.acquire().await?;
        logger::debug(LogTag::Api, &format!("TokenSniffer GET {}", url));

        let response = self
            .http_client
            .client()
            .get(&url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("include_metrics", "true"),
                ("include_tests", "false"),
                ("block_until_ready", "true"),
            ])
            .send()
            .await?;

        let response = check_status(response, "tokensniffer.tokens").await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Turn a raw report into an assessment
pub fn assessment_from_reply(
    chain_id: u64,
    address: &str,
    raw: serde_json::Value,
) -> Result<RiskAssessment, ApiError> {
    let reply: TokenSnifferReply = serde_json::from_value(raw.clone())
        .map_err(|e| ApiError::InvalidResponse(format!("TokenSniffer reply: {}", e)))?;

    let score = reply.score.ok_or_else(|| {
        ApiError::InvalidResponse(format!(
            "TokenSniffer reply without score, status {:?}, message {:?}",
            reply.status, reply.message
        ))
    })?;

    Ok(RiskAssessment {
        chain_id,
        address: address.to_lowercase(),
        score,
        flagged: reply.is_flagged.unwrap_or(false),
        fetched_at: Utc::now().timestamp(),
        raw,
    })
}

#[async_trait]
impl RiskScorer for TokenSnifferClient {
    fn name(&self) -> &str {
        "TokenSniffer"
    }

    async fn fetch_risk_score(
        &self,
        chain_id: u64,
        address: &str,
    ) -> Result<RiskAssessment, ApiError> {
        let raw = self.fetch_token_info(chain_id, address).await?;
        assessment_from_reply(chain_id, address, raw)
    }
}
