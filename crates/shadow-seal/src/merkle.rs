use chrono::{DateTime, Utc};
use shadow_types::{Digest, SealMode, TransactionEvent, WitnessToken};

use crate::error::{SealError, SealResult};
use crate::strategy::SealingStrategy;

/// Batch-integrity sealing.
///
/// Leaves are the transactions' content hashes and every token in the batch
/// carries the batch root.
#[derive(Clone, Copy, Debug, Default)]
pub struct MerkleStrategy;

impl SealingStrategy for MerkleStrategy {
    fn mode(&self) -> SealMode {
        SealMode::Merkle
    }

    fn process_transaction(
        &self,
        event: &TransactionEvent,
        _sealed_at: DateTime<Utc>,
    ) -> SealResult<WitnessToken> {
        Ok(
            WitnessToken::new(event.id.clone(), event.content_hash().to_hex(), self.mode())
                .with_meta("leaf", "content_hash"),
        )
    }

    fn leaf(&self, content_hash: &Digest, _token: &WitnessToken) -> Digest {
        *content_hash
    }

    fn finish_token(&self, mut token: WitnessToken, root: &Digest) -> WitnessToken {
        token.token = root.to_hex();
        token
    }

    fn verify_token(
        &self,
        _content_hash: &Digest,
        token: &WitnessToken,
        root: &Digest,
    ) -> SealResult<()> {
        if token.token != root.to_hex() {
            return Err(SealError::invalid_token(
                self.mode(),
                &token.transaction_id,
                "token does not match block root",
            ));
        }
        Ok(())
    }
}
