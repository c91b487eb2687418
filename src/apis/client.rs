/// Base HTTP client with rate limiting
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::errors::ApiError;
use crate::logger::{self, LogTag};

const USER_AGENT: &str = concat!("universe-prep/", env!("CARGO_PKG_VERSION"));

/// Rate limiter for API clients
///
/// Bounds requests in flight and keeps a minimum spacing between request
/// starts.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    last_request: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            last_request: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    /// Wait until we can make a request (respects rate limits)
    pub async fn acquire(&self) -> Result<RateLimitGuard, ApiError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ApiError::RateLimitExceeded)?;

        if !self.min_interval.is_zero() {
            let mut last = self.last_request.lock().await;
            if let Some(last_time) = *last {
                let elapsed = last_time.elapsed();
                if elapsed < self.min_interval {
                    tokio::time::sleep(self.min_interval - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        Ok(RateLimitGuard { _permit: permit })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// RAII guard returned by [`RateLimiter::acquire`]
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
}

/// HTTP client wrapper with timeout
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Map a non-success status to `ApiError`, reading the body for context
pub async fn check_status(response: Response, endpoint: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    logger::debug(
        LogTag::Api,
        &format!("{} HTTP {}: {}", endpoint, status, truncate(&body, 300)),
    );

    match status {
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(ApiError::RateLimitExceeded),
        _ => Err(ApiError::InvalidResponse(format!(
            "HTTP {}: {}",
            status,
            truncate(&body, 300)
        ))),
    }
}

/// Decode a successful JSON response
pub async fn parse_json<T: DeserializeOwned>(
    response: Response,
    endpoint: &str,
) -> Result<T, ApiError> {
    let response = check_status(response, endpoint).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("{} parse error: {}", endpoint, e)))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_spacing() {
        let limiter = RateLimiter::new(1, Duration::from_millis(40));
        let start = Instant::now();
        for _ in 0..3 {
            let _guard = limiter.acquire().await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[test]
    fn test_zero_concurrency_still_admits_one() {
        let limiter = RateLimiter::new(0, Duration::ZERO);
        assert!(limiter.min_interval().is_zero());
        assert_eq!(limiter.semaphore.available_permits(), 1);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
