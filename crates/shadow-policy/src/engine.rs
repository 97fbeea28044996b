use std::fmt;

use serde::{Deserialize, Serialize};
use shadow_types::SealMode;
use tracing::debug;

use crate::config::PolicyThresholds;
use crate::error::PolicyError;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Account and request attributes that influence policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionFlags {
    /// The payer asked for amount privacy.
    pub privacy: bool,
    /// The payer account is a honeypot trap.
    pub honeypot: bool,
    /// The account may seal amounts up to the small-amount limit on the
    /// simple path.
    pub small_amount_bypass: bool,
}

/// Why a payment was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    HighRisk,
    Honeypot,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::HighRisk => f.write_str("high risk"),
            BlockReason::Honeypot => f.write_str("honeypot"),
        }
    }
}

/// Outcome of policy evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    Block(BlockReason),
    Seal(SealMode),
}

impl PolicyDecision {
    pub fn is_blocked(&self) -> bool {
        matches!(self, PolicyDecision::Block(_))
    }

    pub fn seal_mode(&self) -> Option<SealMode> {
        match self {
            PolicyDecision::Seal(mode) => Some(*mode),
            PolicyDecision::Block(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// PolicyEngine
// ---------------------------------------------------------------------------

/// Stateless mapping from risk and amount to a sealing decision.
#[derive(Clone, Debug)]
pub struct PolicyEngine {
    thresholds: PolicyThresholds,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self {
            thresholds: PolicyThresholds::default(),
        }
    }
}

impl PolicyEngine {
    pub fn new(thresholds: PolicyThresholds) -> Result<Self, PolicyError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &PolicyThresholds {
        &self.thresholds
    }

    /// Decide how to handle a payment.
    ///
    /// Scores outside `[0, 1]` are clamped, and NaN is treated as maximal
    /// risk.
    pub fn decide(&self, risk_score: f64, amount: u64, flags: &TransactionFlags) -> PolicyDecision {
        let score = clamp_score(risk_score);
        let t = &self.thresholds;

        let decision = if flags.honeypot {
            PolicyDecision::Block(BlockReason::Honeypot)
        } else if score > t.high {
            PolicyDecision::Block(BlockReason::HighRisk)
        } else if flags.privacy || t.privacy_marker_amount == Some(amount) {
            PolicyDecision::Seal(SealMode::ZeroKnowledge)
        } else if score > t.medium || amount > t.large_amount {
            PolicyDecision::Seal(SealMode::MultiSignature)
        } else if score > t.low {
            PolicyDecision::Seal(SealMode::TimestampAuthority)
        } else if flags.small_amount_bypass && amount <= t.small_amount_limit {
            PolicyDecision::Seal(SealMode::Simple)
        } else {
            PolicyDecision::Seal(SealMode::Merkle)
        };

        debug!(score, amount, ?decision, "policy decision");
        decision
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        1.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine() -> PolicyEngine {
        PolicyEngine::default()
    }

    fn none() -> TransactionFlags {
        TransactionFlags::default()
    }

    #[test]
    fn high_risk_blocks() {
        assert_eq!(
            engine().decide(0.9, 50, &none()),
            PolicyDecision::Block(BlockReason::HighRisk)
        );
    }

    #[test]
    fn low_medium_risk_uses_timestamp_authority() {
        assert_eq!(
            engine().decide(0.3, 50, &none()),
            PolicyDecision::Seal(SealMode::TimestampAuthority)
        );
    }

    #[test]
    fn low_risk_batches_with_merkle() {
        assert_eq!(
            engine().decide(0.1, 50, &none()),
            PolicyDecision::Seal(SealMode::Merkle)
        );
    }

    #[test]
    fn medium_high_risk_requires_multisig() {
        assert_eq!(
            engine().decide(0.6, 50, &none()),
            PolicyDecision::Seal(SealMode::MultiSignature)
        );
    }

    #[test]
    fn large_amount_requires_multisig() {
        assert_eq!(
            engine().decide(0.0, 1_000_001, &none()),
            PolicyDecision::Seal(SealMode::MultiSignature)
        );
        assert_eq!(
            engine().decide(0.0, 1_000_000, &none()),
            PolicyDecision::Seal(SealMode::Merkle)
        );
    }

    #[test]
    fn privacy_marker_amount_uses_commitment() {
        assert_eq!(
            engine().decide(0.7, 77_700, &none()),
            PolicyDecision::Seal(SealMode::ZeroKnowledge)
        );
    }

    #[test]
    fn privacy_flag_uses_commitment() {
        let flags = TransactionFlags {
            privacy: true,
            ..none()
        };
        assert_eq!(
            engine().decide(0.1, 5_000_000, &flags),
            PolicyDecision::Seal(SealMode::ZeroKnowledge)
        );
    }

    #[test]
    fn block_outranks_privacy() {
        let flags = TransactionFlags {
            privacy: true,
            ..none()
        };
        assert!(engine().decide(0.95, 77_700, &flags).is_blocked());
    }

    #[test]
    fn honeypot_blocks_regardless_of_score() {
        let flags = TransactionFlags {
            honeypot: true,
            ..none()
        };
        assert_eq!(
            engine().decide(0.0, 10, &flags),
            PolicyDecision::Block(BlockReason::Honeypot)
        );
    }

    #[test]
    fn bypass_only_applies_to_low_risk() {
        let flags = TransactionFlags {
            small_amount_bypass: true,
            ..none()
        };
        assert_eq!(
            engine().decide(0.1, 50, &flags),
            PolicyDecision::Seal(SealMode::Simple)
        );
        assert_eq!(
            engine().decide(0.3, 50, &flags),
            PolicyDecision::Seal(SealMode::TimestampAuthority)
        );
    }

    #[test]
    fn bypass_stops_at_small_amount_limit() {
        let flags = TransactionFlags {
            small_amount_bypass: true,
            ..none()
        };
        assert_eq!(
            engine().decide(0.1, 10_000, &flags),
            PolicyDecision::Seal(SealMode::Simple)
        );
        assert_eq!(
            engine().decide(0.1, 10_001, &flags),
            PolicyDecision::Seal(SealMode::Merkle)
        );
        assert_eq!(
            engine().decide(0.1, 999_999, &flags),
            PolicyDecision::Seal(SealMode::Merkle)
        );
    }

    #[test]
    fn boundaries_are_exclusive() {
        let e = engine();
        assert_eq!(e.decide(0.8, 50, &none()).seal_mode(), Some(SealMode::MultiSignature));
        assert_eq!(e.decide(0.5, 50, &none()).seal_mode(), Some(SealMode::TimestampAuthority));
        assert_eq!(e.decide(0.2, 50, &none()).seal_mode(), Some(SealMode::Merkle));
    }

    #[test]
    fn nan_is_maximal_risk() {
        assert!(engine().decide(f64::NAN, 50, &none()).is_blocked());
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert!(engine().decide(7.5, 50, &none()).is_blocked());
        assert_eq!(
            engine().decide(-3.0, 50, &none()),
            PolicyDecision::Seal(SealMode::Merkle)
        );
    }

    #[test]
    fn custom_thresholds_are_validated() {
        let bad = PolicyThresholds {
            high: 0.4,
            ..Default::default()
        };
        assert!(PolicyEngine::new(bad).is_err());
    }

    proptest! {
        #[test]
        fn decisions_are_deterministic(score in any::<f64>(), amount in any::<u64>(),
                                       privacy in any::<bool>(), honeypot in any::<bool>()) {
            let flags = TransactionFlags { privacy, honeypot, small_amount_bypass: false };
            let e = engine();
            prop_assert_eq!(e.decide(score, amount, &flags), e.decide(score, amount, &flags));
        }

        #[test]
        fn scores_above_high_always_block(score in 0.8000001f64..=1.0, amount in any::<u64>()) {
            prop_assert!(engine().decide(score, amount, &none()).is_blocked());
        }
    }
}
