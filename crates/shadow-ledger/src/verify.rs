use serde::{Deserialize, Serialize};
use shadow_crypto::{verify_inclusion, HashChainVerifier};
use shadow_seal::{SealError, StrategySet};
use shadow_store::AuditStore;
use shadow_types::{AuditBlock, Digest, SealMode, TransactionId, TransactionWitness};
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};

/// Answer to "was this transaction sealed, and under what guarantee?"
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub transaction_id: TransactionId,
    pub found: bool,
    /// The transaction is buffered but not yet sealed.
    pub pending: bool,
    pub block_height: Option<u64>,
    pub merkle_root: Option<Digest>,
    pub proof_valid: bool,
    pub seal_mode: Option<SealMode>,
    pub strategy_name: Option<String>,
    /// Set when the batch holding this transaction failed to seal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seal_failure: Option<String>,
}

impl VerificationResult {
    pub fn not_found(transaction_id: TransactionId, pending: bool) -> Self {
        Self {
            transaction_id,
            found: false,
            pending,
            block_height: None,
            merkle_root: None,
            proof_valid: false,
            seal_mode: None,
            strategy_name: None,
            seal_failure: None,
        }
    }
}

/// Re-check a stored witness against its block and predecessor.
pub(crate) fn verify_witness(
    store: &dyn AuditStore,
    strategies: &StrategySet,
    witness: TransactionWitness,
) -> LedgerResult<VerificationResult> {
    let height = witness.block_height;
    let block = store
        .block(height)?
        .ok_or_else(|| LedgerError::integrity(height, "witness references a missing block"))?;

    check_evidence(strategies, &block, &witness)?;

    let prev = match height.checked_sub(1) {
        Some(h) if h >= AuditBlock::GENESIS_HEIGHT => Some(
            store
                .block(h)?
                .ok_or_else(|| LedgerError::integrity(height, "predecessor block is missing"))?,
        ),
        _ => None,
    };
    HashChainVerifier::check_link(prev.as_ref(), &block)
        .map_err(|e| LedgerError::integrity(height, e.to_string()))?;

    Ok(VerificationResult {
        transaction_id: witness.transaction_id,
        found: true,
        pending: false,
        block_height: Some(height),
        merkle_root: Some(block.merkle_root),
        proof_valid: true,
        seal_mode: Some(witness.seal_mode),
        strategy_name: Some(witness.token.strategy_name),
        seal_failure: None,
    })
}

/// Check one witness's inclusion proof and strategy token against `block`.
pub(crate) fn check_evidence(
    strategies: &StrategySet,
    block: &AuditBlock,
    witness: &TransactionWitness,
) -> LedgerResult<()> {
    let height = block.height;
    if witness.seal_mode != block.seal_mode {
        return Err(LedgerError::integrity(
            height,
            format!(
                "witness {} sealed as {} in a {} block",
                witness.transaction_id, witness.seal_mode, block.seal_mode
            ),
        ));
    }

    let strategy = strategies.get(witness.seal_mode);
    let leaf = strategy.leaf(&witness.transaction_hash, &witness.token);
    if !verify_inclusion(&leaf, &witness.proof, &block.merkle_root) {
        warn!(tx = %witness.transaction_id, height, "inclusion proof mismatch");
        return Err(LedgerError::integrity(
            height,
            format!("inclusion proof for {} does not reach the block root", witness.transaction_id),
        ));
    }

    strategy
        .verify_token(&witness.transaction_hash, &witness.token, &block.merkle_root)
        .map_err(|e| match e {
            SealError::InvalidToken { .. } => LedgerError::integrity(height, e.to_string()),
            other => LedgerError::StrategyUnavailable {
                mode: witness.seal_mode,
                source: other,
            },
        })
}
