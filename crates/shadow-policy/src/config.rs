use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Cutoffs used by the policy engine.
///
/// Amounts are in minor currency units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyThresholds {
    /// Scores above this are sealed at least by timestamp authority.
    pub low: f64,
    /// Scores above this require multi-signature sealing.
    pub medium: f64,
    /// Scores above this are blocked.
    pub high: f64,
    /// Amounts above this require multi-signature sealing.
    pub large_amount: u64,
    /// An amount that always routes to commitment sealing.
    pub privacy_marker_amount: Option<u64>,
    /// Bypass-flagged payments up to this amount may be simply sealed.
    pub small_amount_limit: u64,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            low: 0.2,
            medium: 0.5,
            high: 0.8,
            large_amount: 1_000_000,
            privacy_marker_amount: Some(77_700),
            small_amount_limit: 10_000,
        }
    }
}

impl PolicyThresholds {
    pub fn validate(&self) -> Result<(), PolicyError> {
        for (name, value) in [("low", self.low), ("medium", self.medium), ("high", self.high)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PolicyError::ThresholdOutOfRange { name, value });
            }
        }
        if !(self.low < self.medium && self.medium < self.high) {
            return Err(PolicyError::Unordered {
                low: self.low,
                medium: self.medium,
                high: self.high,
            });
        }
        if self.small_amount_limit > self.large_amount {
            return Err(PolicyError::SmallAmountLimit {
                limit: self.small_amount_limit,
                large_amount: self.large_amount,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PolicyThresholds::default().validate().is_ok());
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let t = PolicyThresholds {
            medium: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            t.validate(),
            Err(PolicyError::ThresholdOutOfRange { name: "medium", .. })
        ));
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let t = PolicyThresholds {
            low: 0.6,
            ..Default::default()
        };
        assert!(matches!(t.validate(), Err(PolicyError::Unordered { .. })));
    }

    #[test]
    fn small_amount_limit_cannot_exceed_large_amount() {
        let t = PolicyThresholds {
            small_amount_limit: 2_000_000,
            ..Default::default()
        };
        assert!(matches!(t.validate(), Err(PolicyError::SmallAmountLimit { .. })));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let t: PolicyThresholds = toml::from_str("high = 0.9").unwrap();
        assert_eq!(t.high, 0.9);
        assert_eq!(t.low, 0.2);
        assert_eq!(t.privacy_marker_amount, Some(77_700));
        assert_eq!(t.small_amount_limit, 10_000);
    }
}
