use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shadow_policy::TransactionFlags;

/// Per-account policy inputs.
///
/// Account records live outside the ledger; this is the subset of them
/// that feeds [`TransactionFlags`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Trap accounts. Their payments are silently queued and never sealed.
    pub honeypot: BTreeSet<String>,
    /// Accounts whose amounts are always sealed under a commitment.
    pub privacy: BTreeSet<String>,
    /// Accounts allowed to take the simple sealing path for small amounts.
    pub small_amount_bypass: BTreeSet<String>,
}

impl AccountsConfig {
    /// Flags for a payment from `account`, merged with any the request set.
    ///
    /// A request can only raise the assurance of its seal, so the bypass
    /// comes from the account list alone.
    pub fn flags_for(&self, account: &str, requested: TransactionFlags) -> TransactionFlags {
        TransactionFlags {
            privacy: requested.privacy || self.privacy.contains(account),
            honeypot: requested.honeypot || self.honeypot.contains(account),
            small_amount_bypass: self.small_amount_bypass.contains(account),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_account_and_request_flags() {
        let accounts = AccountsConfig {
            honeypot: ["TRAP-1".to_string()].into(),
            ..Default::default()
        };
        let trap = accounts.flags_for("TRAP-1", TransactionFlags::default());
        assert!(trap.honeypot);
        assert!(!trap.privacy);

        let requested = TransactionFlags {
            privacy: true,
            ..Default::default()
        };
        let normal = accounts.flags_for("ACC-1", requested);
        assert!(normal.privacy);
        assert!(!normal.honeypot);
    }

    #[test]
    fn bypass_comes_only_from_account_list() {
        let accounts = AccountsConfig {
            small_amount_bypass: ["KIOSK-1".to_string()].into(),
            ..Default::default()
        };
        let requested = TransactionFlags {
            small_amount_bypass: true,
            ..Default::default()
        };
        assert!(!accounts.flags_for("ACC-1", requested).small_amount_bypass);
        assert!(accounts.flags_for("KIOSK-1", TransactionFlags::default()).small_amount_bypass);
    }
}
