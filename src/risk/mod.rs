//! Token risk scoring
//!
//! - `cache`: SQLite-backed cache in front of any `RiskScorer`
//! - `gate`: the filtering pass that drops risky pairs from a ranking
//!
//! `apis::tokensniffer::TokenSnifferClient` is the production scorer.

pub mod cache;
pub mod gate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

pub use cache::{CacheDiagnostics, CachedRiskScorer, RiskCache};
pub use gate::{apply_risk_gate, RiskGateOutcome};

/// Externally computed risk score of one token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub chain_id: u64,
    /// Lowercase token address
    pub address: String,
    /// 0 (scam) to 100 (safe)
    pub score: f64,
    /// Scorer marked the token as a known scam or honeypot
    pub flagged: bool,
    /// Unix seconds
    pub fetched_at: i64,
    /// Full scorer reply, kept for later inspection
    pub raw: serde_json::Value,
}

impl RiskAssessment {
    /// Cache key `"{chain_id}-{address}"`
    pub fn cache_key(chain_id: u64, address: &str) -> String {
        format!("{}-{}", chain_id, address.to_lowercase())
    }

    /// Pass when the score reaches the threshold and, with
    /// `reject_flagged`, the token is not flagged
    pub fn passes(&self, threshold: f64, reject_flagged: bool) -> bool {
        self.score >= threshold && !(reject_flagged && self.flagged)
    }
}

/// Source of risk assessments
#[async_trait]
pub trait RiskScorer: Send + Sync {
    fn name(&self) -> &str;

    /// `ApiError::NotFound` when the scorer has no data for the token
    async fn fetch_risk_score(&self, chain_id: u64, address: &str) -> Result<RiskAssessment, ApiError>;
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Scripted scorer counting its calls
    #[derive(Default)]
    pub struct FakeScorer {
        pub replies: HashMap<String, Result<(f64, bool), ApiError>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeScorer {
        pub fn with(mut self, address: &str, reply: Result<(f64, bool), ApiError>) -> Self {
            self.replies.insert(address.to_lowercase(), reply);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl RiskScorer for FakeScorer {
        fn name(&self) -> &str {
            "fake"
        }

        async fn fetch_risk_score(
            &self,
            chain_id: u64,
            address: &str,
        ) -> Result<RiskAssessment, ApiError> {
            let address = address.to_lowercase();
            self.calls.lock().push(address.clone());
            match self.replies.get(&address) {
                Some(Ok((score, flagged))) => Ok(RiskAssessment {
                    chain_id,
                    address,
                    score: *score,
                    flagged: *flagged,
                    fetched_at: chrono::Utc::now().timestamp(),
                    raw: serde_json::json!({ "score": score, "is_flagged": flagged }),
                }),
                Some(Err(e)) => Err(e.clone()),
                None => Err(ApiError::NotFound),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_lowercases() {
        assert_eq!(RiskAssessment::cache_key(1, "0xABcd"), "1-0xabcd");
    }

    #[test]
    fn test_passes() {
        let assessment = RiskAssessment {
            chain_id: 1,
            address: "0x1".to_string(),
            score: 24.0,
            flagged: true,
            fetched_at: 0,
            raw: serde_json::Value::Null,
        };
        assert!(assessment.passes(24.0, false));
        assert!(!assessment.passes(24.0, true));
        assert!(!assessment.passes(25.0, false));
    }
}
