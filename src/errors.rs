/// Structured error handling for universe-prep
///
/// `PipelineError` is the error type of every pipeline stage. HTTP clients
/// report `ApiError` so callers can tell a soft "not found" apart from a
/// transport failure before wrapping it.
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// MAIN ERROR TYPE
// =============================================================================

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable {name}: {hint}")]
    MissingEnv { name: String, hint: String },

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("API error from {source_name}: {error}")]
    Api {
        source_name: String,
        error: ApiError,
    },

    #[error("Could not assess risk of {ticker}, address {address}: {error}")]
    Risk {
        ticker: String,
        address: String,
        error: ApiError,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Notebook error: {0}")]
    Notebook(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] polars::error::PolarsError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Wrap an API failure with the name of the service that produced it
    pub fn api(source_name: impl Into<String>, error: ApiError) -> Self {
        PipelineError::Api {
            source_name: source_name.into(),
            error,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        PipelineError::Config(message.into())
    }

    pub fn market_data(message: impl Into<String>) -> Self {
        PipelineError::MarketData(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }
}

// =============================================================================
// API ERROR TYPES
// =============================================================================

/// API error types shared by all HTTP clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApiError {
    NetworkError(String),
    RateLimitExceeded,
    InvalidResponse(String),
    NotFound,
    Timeout,
    Disabled,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ApiError::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            ApiError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::Timeout => write!(f, "Request timeout"),
            ApiError::Disabled => write!(f, "API disabled"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_error_names_pair() {
        let err = PipelineError::Risk {
            ticker: "OLAS-WETH-uniswap-v2-30bps".to_string(),
            address: "0x0001a500a6b18995b03f44bb040a5ffc28e45cb0".to_string(),
            error: ApiError::InvalidResponse("HTTP 500".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("OLAS-WETH-uniswap-v2-30bps"));
        assert!(msg.contains("0x0001a500"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn test_not_found_detection() {
        assert!(ApiError::NotFound.is_not_found());
        assert!(!ApiError::Timeout.is_not_found());
    }
}
