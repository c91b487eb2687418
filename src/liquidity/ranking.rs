/// Liquidity ranking with deduplication by base token
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::config::UniverseConfig;
use crate::logger::{self, LogTag};
use crate::market::{PairId, PairUniverse, TradingPair};

use super::summary::LiquiditySummary;
use super::{DedupKey, RankingMetric};

#[derive(Debug, Clone, Copy)]
pub struct RankingPolicy {
    pub metric: RankingMetric,
    pub dedup_key: DedupKey,
    pub min_liquidity_usd: f64,
}

impl RankingPolicy {
    pub fn from_config(config: &UniverseConfig) -> Self {
        Self {
            metric: config.ranking_metric,
            dedup_key: config.dedup_key,
            min_liquidity_usd: config.min_liquidity_usd,
        }
    }
}

/// An accepted pair with the liquidity it was ranked by
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPair {
    pub pair_id: PairId,
    pub liquidity: f64,
    /// Value of the dedup key the pair claimed
    pub dedup_key: String,
}

/// Key under which only the most liquid pool survives
pub fn dedup_key_of(pair: &TradingPair, key: DedupKey) -> String {
    match key {
        DedupKey::BaseAddress => pair.base_token_address.to_lowercase(),
        DedupKey::BaseSymbol => pair.base_token_symbol.clone(),
        DedupKey::SimpleTicker => pair.simple_ticker(),
    }
}

fn metric_value(summary: &LiquiditySummary, pair_id: PairId, metric: RankingMetric) -> f64 {
    let liq = summary.get(pair_id);
    match metric {
        RankingMetric::HistoricalMax => liq.historical,
        RankingMetric::AtDate => liq.at_comparison,
    }
}

/// Most liquid pairs first, one per dedup key
///
/// Candidates are sorted by the ranking metric descending with ties broken
/// by ascending pair id. Pairs below `min_liquidity_usd` are skipped, the
/// first pair per dedup key wins, and the walk stops after `limit` accepted
/// pairs.
pub fn rank_pairs(
    summary: &LiquiditySummary,
    universe: &PairUniverse,
    policy: &RankingPolicy,
    limit: usize,
) -> Vec<RankedPair> {
    let mut candidates: Vec<(PairId, f64)> = summary
        .by_pair
        .keys()
        .map(|id| (*id, metric_value(summary, *id, policy.metric)))
        .collect();
    candidates.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });

    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut accepted = Vec::new();
    let mut below_threshold = 0usize;
    let mut duplicates = 0usize;

    for (pair_id, liquidity) in candidates {
        if accepted.len() >= limit {
            break;
        }

        if liquidity < policy.min_liquidity_usd {
            below_threshold += 1;
            continue;
        }

        let Some(pair) = universe.get(pair_id) else {
            logger::debug(
                LogTag::Liquidity,
                &format!("Pair {} has liquidity but no metadata, ignored", pair_id),
            );
            continue;
        };

        let key = dedup_key_of(pair, policy.dedup_key);
        if !seen_keys.insert(key.clone()) {
            // Already represented by a deeper pool
            duplicates += 1;
            continue;
        }

        accepted.push(RankedPair {
            pair_id,
            liquidity,
            dedup_key: key,
        });
    }

    logger::info(
        LogTag::Liquidity,
        &format!(
            "Ranked {} pairs by {:?}: accepted {}, below {:.0} USD {}, duplicate {:?} {}",
            summary.len(),
            policy.metric,
            accepted.len(),
            policy.min_liquidity_usd,
            below_threshold,
            policy.dedup_key,
            duplicates
        ),
    );

    accepted
}

/// Every pool of the selected base tokens that clears the liquidity floor
///
/// `selected` picks the base tokens, one entry each. The result lists the
/// pools of each base token in `selected` order, deepest pool first, and is
/// keyed by base address whatever dedup key chose the base tokens.
pub fn base_token_pools(
    summary: &LiquiditySummary,
    universe: &PairUniverse,
    policy: &RankingPolicy,
    selected: &[RankedPair],
) -> Vec<RankedPair> {
    let mut pools = Vec::new();
    let mut seen_bases: HashSet<String> = HashSet::new();

    for ranked in selected {
        let Some(pair) = universe.get(ranked.pair_id) else {
            continue;
        };
        let base = dedup_key_of(pair, DedupKey::BaseAddress);
        if !seen_bases.insert(base.clone()) {
            continue;
        }

        let mut members: Vec<RankedPair> = universe
            .iter()
            .filter(|p| dedup_key_of(p, DedupKey::BaseAddress) == base)
            .map(|p| RankedPair {
                pair_id: p.pair_id,
                liquidity: metric_value(summary, p.pair_id, policy.metric),
                dedup_key: base.clone(),
            })
            .filter(|r| r.pair_id == ranked.pair_id || r.liquidity >= policy.min_liquidity_usd)
            .collect();
        members.sort_by(|a, b| match b.liquidity.total_cmp(&a.liquidity) {
            Ordering::Equal => a.pair_id.cmp(&b.pair_id),
            other => other,
        });
        pools.extend(members);
    }

    pools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liquidity::PairLiquidity;
    use crate::market::memory::test_pair;
    use std::collections::HashMap;

    fn summary(values: &[(PairId, f64)]) -> LiquiditySummary {
        LiquiditySummary {
            by_pair: values
                .iter()
                .map(|(id, v)| {
                    (
                        *id,
                        PairLiquidity {
                            historical: *v,
                            today: *v / 2.0,
                            at_comparison: 100.0 - *v,
                        },
                    )
                })
                .collect::<HashMap<_, _>>(),
            broken_pairs: HashSet::new(),
        }
    }

    fn policy(dedup_key: DedupKey, min: f64) -> RankingPolicy {
        RankingPolicy {
            metric: RankingMetric::HistoricalMax,
            dedup_key,
            min_liquidity_usd: min,
        }
    }

    fn universe() -> PairUniverse {
        PairUniverse::new(vec![
            test_pair(1, 1, "uniswap-v2", "X", "WETH"),
            test_pair(2, 1, "uniswap-v2", "Y", "WETH"),
            test_pair(3, 2, "uniswap-v3", "X", "USDC"),
            test_pair(4, 2, "uniswap-v3", "Z", "WETH"),
            test_pair(5, 2, "uniswap-v3", "Y", "WETH"),
        ])
    }

    #[test]
    fn test_one_pair_per_base_and_threshold() {
        let s = summary(&[(1, 10.0), (2, 2.0), (3, 5.0), (4, 7.0), (5, 6.0)]);
        let ranked = rank_pairs(&s, &universe(), &policy(DedupKey::BaseAddress, 3.0), 10);

        let ids: Vec<PairId> = ranked.iter().map(|r| r.pair_id).collect();
        assert_eq!(ids, vec![1, 4, 5]);
        assert!(ranked.iter().all(|r| r.liquidity >= 3.0));

        let keys: HashSet<&String> = ranked.iter().map(|r| &r.dedup_key).collect();
        assert_eq!(keys.len(), ranked.len());
    }

    #[test]
    fn test_limit_and_tie_break() {
        let s = summary(&[(1, 5.0), (2, 5.0), (4, 5.0)]);
        let ranked = rank_pairs(&s, &universe(), &policy(DedupKey::BaseSymbol, 0.0), 2);
        let ids: Vec<PairId> = ranked.iter().map(|r| r.pair_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_simple_ticker_dedup_keeps_different_quotes() {
        let s = summary(&[(1, 10.0), (3, 5.0)]);
        let ranked = rank_pairs(&s, &universe(), &policy(DedupKey::SimpleTicker, 0.0), 10);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_zero_liquidity_excluded_with_positive_threshold() {
        let s = summary(&[(1, 0.0), (2, 4.0)]);
        let ranked = rank_pairs(&s, &universe(), &policy(DedupKey::BaseAddress, 1.0), 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].pair_id, 2);
    }

    #[test]
    fn test_base_token_pools_collects_every_deep_pool() {
        let s = summary(&[(1, 10.0), (2, 2.0), (3, 5.0), (4, 7.0), (5, 6.0)]);
        let universe = universe();
        let policy = policy(DedupKey::BaseAddress, 3.0);
        let ranked = rank_pairs(&s, &universe, &policy, 2);
        assert_eq!(ranked.iter().map(|r| r.pair_id).collect::<Vec<_>>(), vec![1, 4]);

        let pools = base_token_pools(&s, &universe, &policy, &ranked);
        let ids: Vec<PairId> = pools.iter().map(|r| r.pair_id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(pools[0].dedup_key, pools[1].dedup_key);
    }

    #[test]
    fn test_base_token_pools_skips_shallow_siblings() {
        let s = summary(&[(1, 10.0), (2, 2.0), (5, 6.0)]);
        let universe = universe();
        let policy = policy(DedupKey::BaseAddress, 3.0);
        let ranked = rank_pairs(&s, &universe, &policy, 10);

        let pools = base_token_pools(&s, &universe, &policy, &ranked);
        // Y-WETH on uniswap-v2 is below the floor
        let ids: Vec<PairId> = pools.iter().map(|r| r.pair_id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_at_date_metric() {
        let s = summary(&[(1, 10.0), (4, 60.0)]);
        let policy = RankingPolicy {
            metric: RankingMetric::AtDate,
            dedup_key: DedupKey::BaseAddress,
            min_liquidity_usd: 0.0,
        };
        let ranked = rank_pairs(&s, &universe(), &policy, 10);
        // at_comparison is 100 - historical
        assert_eq!(ranked[0].pair_id, 1);
        assert_eq!(ranked[0].liquidity, 90.0);
    }
}
