/// Risk filtering pass over a liquidity ranking
///
/// Not-found tokens are a soft skip. Any other scorer failure aborts the run
/// with the pair ticker and address in the error.
use std::collections::HashSet;

use crate::config::RiskConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::liquidity::RankedPair;
use crate::logger::{self, LogTag};
use crate::market::{PairId, PairUniverse};
use crate::utils::format_usd;

use super::{RiskAssessment, RiskScorer};

#[derive(Debug, Clone, Default)]
pub struct RiskGateOutcome {
    /// Survivors in ranking order
    pub accepted: Vec<RankedPair>,
    /// Scorer had no data for the token
    pub not_found: Vec<PairId>,
    /// Pair id and score of tokens below the threshold or flagged
    pub rejected: Vec<(PairId, f64)>,
    /// Trusted base tokens that skipped the lookup
    pub allow_listed: Vec<PairId>,
    /// Candidates dropped by the `max_checked_pairs` cap
    pub over_cap: usize,
}

impl RiskGateOutcome {
    pub fn skipped(&self) -> usize {
        self.not_found.len() + self.rejected.len()
    }
}

/// Drop pairs whose base token fails the risk threshold
///
/// Candidates beyond `max_checked_pairs` are not checked and not kept.
/// Base tokens listed in `trusted_tokens` by chain and address skip the
/// lookup when `allow_list_bypass` is set. Symbol allow-list membership is
/// only reported in the rejection warning.
pub async fn apply_risk_gate(
    candidates: &[RankedPair],
    universe: &PairUniverse,
    scorer: &dyn RiskScorer,
    config: &RiskConfig,
) -> PipelineResult<RiskGateOutcome> {
    let allow_list: HashSet<&str> = config.allow_list.iter().map(|s| s.as_str()).collect();
    let trusted: HashSet<String> = config.trusted_tokens.iter().map(|k| k.to_lowercase()).collect();
    let mut outcome = RiskGateOutcome {
        over_cap: candidates.len().saturating_sub(config.max_checked_pairs),
        ..Default::default()
    };

    logger::info(
        LogTag::Risk,
        &format!(
            "Checking {} pairs with {}, threshold {}, max checked {}",
            candidates.len().min(config.max_checked_pairs),
            scorer.name(),
            config.threshold,
            config.max_checked_pairs
        ),
    );

    for candidate in candidates.iter().take(config.max_checked_pairs) {
        let Some(pair) = universe.get(candidate.pair_id) else {
            continue;
        };
        let ticker = pair.ticker();
        let address = &pair.base_token_address;
        let allow_listed = allow_list.contains(pair.base_token_symbol.as_str());
        let is_trusted = trusted.contains(&RiskAssessment::cache_key(pair.chain_id, address));

        if is_trusted && config.allow_list_bypass {
            logger::debug(
                LogTag::Risk,
                &format!("{} is a trusted token, lookup skipped", ticker),
            );
            outcome.allow_listed.push(candidate.pair_id);
            outcome.accepted.push(candidate.clone());
            continue;
        }

        let assessment = match scorer.fetch_risk_score(pair.chain_id, address).await {
            Ok(assessment) => assessment,
            Err(e) if e.is_not_found() => {
                logger::warning(
                    LogTag::Risk,
                    &format!(
                        "{} has no data for {}, address {}, skipped, liquidity is {} USD",
                        scorer.name(),
                        ticker,
                        address,
                        format_usd(candidate.liquidity)
                    ),
                );
                outcome.not_found.push(candidate.pair_id);
                continue;
            }
            Err(e) => {
                return Err(PipelineError::Risk {
                    ticker,
                    address: address.clone(),
                    error: e,
                });
            }
        };

        if !assessment.passes(config.threshold, config.reject_flagged) {
            logger::warning(
                LogTag::Risk,
                &format!(
                    "Skipping pair {}, address {} as the risk score {} (flagged {}, allow-listed {}) is below our risk threshold, liquidity is {} USD",
                    ticker,
                    address,
                    assessment.score,
                    assessment.flagged,
                    allow_listed,
                    format_usd(candidate.liquidity)
                ),
            );
            outcome.rejected.push((candidate.pair_id, assessment.score));
            continue;
        }

        outcome.accepted.push(candidate.clone());
    }

    logger::info(
        LogTag::Risk,
        &format!(
            "Risk gate kept {} pairs: {} allow-listed, {} not found, {} rejected, {} over the cap",
            outcome.accepted.len(),
            outcome.allow_listed.len(),
            outcome.not_found.len(),
            outcome.rejected.len(),
            outcome.over_cap
        ),
    );

    Ok(outcome)
}
