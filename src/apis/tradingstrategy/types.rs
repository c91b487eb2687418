/// Trading Strategy dataset server response types
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::market::Exchange;

/// `GET /exchange-universe` reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeUniverseReply {
    /// Keyed by exchange id as a string
    pub exchanges: HashMap<String, ExchangeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeEntry {
    pub chain_id: u64,
    #[serde(default)]
    pub chain_slug: Option<String>,
    pub exchange_id: u64,
    pub exchange_slug: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pair_count: Option<u64>,
}

impl ExchangeUniverseReply {
    /// Exchanges sorted by id
    pub fn into_exchanges(self) -> Vec<Exchange> {
        let mut exchanges: Vec<Exchange> = self
            .exchanges
            .into_values()
            .map(|entry| Exchange {
                exchange_id: entry.exchange_id,
                chain_id: entry.chain_id,
                name: entry.name.unwrap_or_else(|| entry.exchange_slug.clone()),
                exchange_slug: entry.exchange_slug,
            })
            .collect();
        exchanges.sort_by_key(|e| e.exchange_id);
        exchanges
    }
}
