/// Pair universe: lookup by id and the default candidate prefilter
use std::collections::{HashMap, HashSet};

use crate::config::UniverseConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::logger::{self, LogTag};

use super::types::{Exchange, PairId, TradingPair};

/// Pairs indexed by id
#[derive(Debug, Clone, Default)]
pub struct PairUniverse {
    pairs: HashMap<PairId, TradingPair>,
}

impl PairUniverse {
    pub fn new(pairs: Vec<TradingPair>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|p| (p.pair_id, p)).collect(),
        }
    }

    pub fn get(&self, pair_id: PairId) -> Option<&TradingPair> {
        self.pairs.get(&pair_id)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pair_ids(&self) -> HashSet<PairId> {
        self.pairs.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradingPair> {
        self.pairs.values()
    }

    /// Restrict to the given ids
    pub fn limit_to(&self, pair_ids: &HashSet<PairId>) -> PairUniverse {
        PairUniverse {
            pairs: self
                .pairs
                .iter()
                .filter(|(id, _)| pair_ids.contains(id))
                .map(|(id, p)| (*id, p.clone()))
                .collect(),
        }
    }
}

/// Resolve exchange slugs on a chain to their ids
///
/// Every slug must exist; an unknown slug means a typo in the config and
/// would silently empty the universe.
pub fn resolve_exchange_ids(
    exchanges: &[Exchange],
    chain_id: u64,
    slugs: &[String],
) -> PipelineResult<HashSet<u64>> {
    let mut ids = HashSet::new();
    for slug in slugs {
        let exchange = exchanges
            .iter()
            .find(|e| e.chain_id == chain_id && e.exchange_slug == *slug)
            .ok_or_else(|| {
                PipelineError::market_data(format!(
                    "Exchange '{}' not found on chain {}",
                    slug, chain_id
                ))
            })?;
        ids.insert(exchange.exchange_id);
    }
    Ok(ids)
}

/// Criteria of the default candidate prefilter
#[derive(Debug, Clone)]
pub struct PairFilter {
    pub chain_id: u64,
    pub exchange_ids: HashSet<u64>,
    pub allowed_quote_tokens: HashSet<String>,
    pub stablecoins: HashSet<String>,
    pub untradeable_base_tokens: HashSet<String>,
}

impl PairFilter {
    pub fn from_config(config: &UniverseConfig, exchange_ids: HashSet<u64>) -> Self {
        let upper = |items: &[String]| items.iter().map(|s| s.to_uppercase()).collect();
        Self {
            chain_id: config.chain_id,
            exchange_ids,
            allowed_quote_tokens: upper(&config.allowed_quote_tokens),
            stablecoins: upper(&config.stablecoins),
            untradeable_base_tokens: upper(&config.untradeable_base_tokens),
        }
    }

    fn accepts(&self, pair: &TradingPair) -> bool {
        let base = pair.base_token_symbol.to_uppercase();
        let quote = pair.quote_token_symbol.to_uppercase();

        pair.chain_id == self.chain_id
            && self.exchange_ids.contains(&pair.exchange_id)
            && self.allowed_quote_tokens.contains(&quote)
            // Stable-stable pairs carry no price signal
            && !(self.stablecoins.contains(&base) && self.stablecoins.contains(&quote))
            && !self.untradeable_base_tokens.contains(&base)
    }
}

/// Keep the pairs a strategy could trade
///
/// Pairs must be on the chain and exchanges, quoted in an allowed token, not
/// stablecoin-vs-stablecoin and not based on a known untradeable (rebasing)
/// token.
pub fn filter_pairs_default(pairs: Vec<TradingPair>, filter: &PairFilter) -> Vec<TradingPair> {
    let before = pairs.len();
    let kept: Vec<TradingPair> = pairs.into_iter().filter(|p| filter.accepts(p)).collect();
    logger::info(
        LogTag::Universe,
        &format!(
            "Pair prefilter kept {} of {} pairs (chain {}, {} exchanges)",
            kept.len(),
            before,
            filter.chain_id,
            filter.exchange_ids.len()
        ),
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(id: PairId, exchange_id: u64, base: &str, quote: &str) -> TradingPair {
        TradingPair {
            pair_id: id,
            chain_id: 1,
            exchange_id,
            exchange_slug: "uniswap-v2".to_string(),
            pair_slug: format!("{}-{}", base, quote).to_lowercase(),
            base_token_symbol: base.to_string(),
            quote_token_symbol: quote.to_string(),
            base_token_address: format!("0x{}", base.to_lowercase()),
            quote_token_address: format!("0x{}", quote.to_lowercase()),
            fee: 30,
        }
    }

    fn filter() -> PairFilter {
        PairFilter::from_config(&UniverseConfig::default(), HashSet::from([1, 2]))
    }

    #[test]
    fn test_filter_pairs_default() {
        let mut other_chain = pair(7, 1, "LINK", "WETH");
        other_chain.chain_id = 137;

        let pairs = vec![
            pair(1, 1, "LINK", "WETH"),
            pair(2, 2, "UNI", "usdc"),
            pair(3, 9, "AAVE", "WETH"),  // exchange not selected
            pair(4, 1, "PEPE", "SHIB"),  // quote not allowed
            pair(5, 1, "USDT", "USDC"),  // stable-stable
            pair(6, 1, "OHM", "DAI"),    // rebasing
            other_chain,
        ];

        let ids: Vec<PairId> = filter_pairs_default(pairs, &filter())
            .iter()
            .map(|p| p.pair_id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_resolve_exchange_ids() {
        let exchanges = vec![
            Exchange {
                exchange_id: 1,
                chain_id: 1,
                exchange_slug: "uniswap-v2".to_string(),
                name: "Uniswap v2".to_string(),
            },
            Exchange {
                exchange_id: 2,
                chain_id: 1,
                exchange_slug: "uniswap-v3".to_string(),
                name: "Uniswap v3".to_string(),
            },
        ];

        let ids = resolve_exchange_ids(&exchanges, 1, &["uniswap-v3".to_string()]).unwrap();
        assert_eq!(ids, HashSet::from([2]));
        assert!(resolve_exchange_ids(&exchanges, 1, &["sushi".to_string()]).is_err());
        assert!(resolve_exchange_ids(&exchanges, 56, &["uniswap-v2".to_string()]).is_err());
    }

    #[test]
    fn test_limit_to() {
        let universe = PairUniverse::new(vec![pair(1, 1, "A", "WETH"), pair(2, 1, "B", "WETH")]);
        let limited = universe.limit_to(&HashSet::from([2, 99]));
        assert_eq!(limited.len(), 1);
        assert!(limited.get(2).is_some());
    }
}
