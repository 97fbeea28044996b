use chrono::{DateTime, Utc};
use serde_json::json;
use shadow_crypto::ContentHasher;
use shadow_types::{Digest, SealMode, TransactionEvent, TransactionId, WitnessToken};

use crate::error::{SealError, SealResult};
use crate::strategy::SealingStrategy;

/// Exclusive upper bound of the recorded range check, in minor units.
pub const RANGE_UPPER_BOUND: u64 = 100_000_000;

/// Secret values that open a commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentOpening {
    pub amount: u64,
    pub transaction_id: TransactionId,
    pub blinding: [u8; 32],
}

impl CommitmentOpening {
    pub fn commit(&self) -> Digest {
        ContentHasher::COMMITMENT.hash_parts(&[
            &self.amount.to_le_bytes(),
            self.transaction_id.as_str().as_bytes(),
            &self.blinding,
        ])
    }
}

/// Whether `opening` opens `commitment`.
pub fn verify_opening(commitment: &Digest, opening: &CommitmentOpening) -> bool {
    opening.commit() == *commitment
}

/// Hiding commitment over the amount.
///
/// The token is a hash commitment over `(amount, transaction id, blinding)`
/// with 256 random blinding bits. The amount never appears in the token or
/// its metadata. Openings are returned by [`CommitmentStrategy::commit_event`]
/// and are not retained by the ledger.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommitmentStrategy;

impl CommitmentStrategy {
    /// Commit to an event, returning the token and its opening.
    pub fn commit_event(&self, event: &TransactionEvent) -> (WitnessToken, CommitmentOpening) {
        let opening = CommitmentOpening {
            amount: event.amount,
            transaction_id: event.id.clone(),
            blinding: rand::random(),
        };
        let in_range = event.amount > 0 && event.amount < RANGE_UPPER_BOUND;
        let token = WitnessToken::new(event.id.clone(), opening.commit().to_hex(), self.mode())
            .with_meta("commitment_scheme", "blake3-hash-commitment")
            .with_meta("blinding_factor_bits", 256)
            .with_meta("amount_hidden", true)
            .with_meta(
                "range_check",
                json!({
                    "range": format!("0 < amount < {RANGE_UPPER_BOUND}"),
                    "valid": in_range,
                }),
            );
        (token, opening)
    }
}

impl SealingStrategy for CommitmentStrategy {
    fn mode(&self) -> SealMode {
        SealMode::ZeroKnowledge
    }

    fn process_transaction(
        &self,
        event: &TransactionEvent,
        _sealed_at: DateTime<Utc>,
    ) -> SealResult<WitnessToken> {
        Ok(self.commit_event(event).0)
    }

    fn verify_token(
        &self,
        _content_hash: &Digest,
        token: &WitnessToken,
        _root: &Digest,
    ) -> SealResult<()> {
        let invalid = |reason: &str| SealError::invalid_token(self.mode(), &token.transaction_id, reason);
        Digest::from_hex(&token.token).map_err(|_| invalid("commitment is not a 32-byte digest"))?;
        let has_range = token
            .metadata
            .get("range_check")
            .and_then(|v| v.get("valid"))
            .is_some_and(|v| v.is_boolean());
        if !has_range {
            return Err(invalid("missing range check"));
        }
        Ok(())
    }
}
