use std::collections::HashSet;

use shadow_crypto::{ChainError, HashChainVerifier};
use shadow_types::{AuditBlock, TransactionId, TransactionWitness};

use crate::error::{StoreError, StoreResult};

/// Append-only store of audit blocks and their witnesses.
///
/// All implementations must satisfy these invariants:
/// - Blocks are never modified or removed once committed.
/// - `commit_block` is atomic: either the block and every witness become
///   visible, or nothing does.
/// - `commit_block` only accepts the block that directly extends the
///   current tip (height compare-and-swap plus root link).
/// - A transaction id has at most one witness across the whole store.
/// - All I/O errors are propagated, never silently ignored.
pub trait AuditStore: Send + Sync {
    /// Commit a block together with all of its witnesses.
    fn commit_block(&self, block: &AuditBlock, witnesses: &[TransactionWitness]) -> StoreResult<()>;

    /// The block with the greatest height, if any.
    fn latest_block(&self) -> StoreResult<Option<AuditBlock>>;

    /// The block at `height`. Returns `Ok(None)` if absent.
    fn block(&self, height: u64) -> StoreResult<Option<AuditBlock>>;

    /// Up to `n` blocks, newest first.
    fn recent_blocks(&self, n: usize) -> StoreResult<Vec<AuditBlock>>;

    /// Witness for a sealed transaction. Returns `Ok(None)` if unknown.
    fn witness(&self, transaction_id: &TransactionId) -> StoreResult<Option<TransactionWitness>>;

    /// Witnesses of the block at `height`, in leaf order.
    fn witnesses_for_block(&self, height: u64) -> StoreResult<Vec<TransactionWitness>>;

    /// Number of committed blocks.
    fn block_count(&self) -> StoreResult<u64>;

    /// Every block in ascending height order.
    ///
    /// Default implementation walks heights from genesis. Backends may
    /// override for a single pass.
    fn all_blocks(&self) -> StoreResult<Vec<AuditBlock>> {
        let count = self.block_count()?;
        let mut blocks = Vec::with_capacity(count as usize);
        for height in AuditBlock::GENESIS_HEIGHT..AuditBlock::GENESIS_HEIGHT + count {
            if let Some(block) = self.block(height)? {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }
}

/// Check that `block` and `witnesses` may be appended on top of `tip`.
///
/// `is_known` reports whether a transaction id already has a witness.
pub(crate) fn check_commit(
    tip: Option<&AuditBlock>,
    block: &AuditBlock,
    witnesses: &[TransactionWitness],
    is_known: impl Fn(&TransactionId) -> bool,
) -> StoreResult<()> {
    HashChainVerifier::check_link(tip, block).map_err(|e| match e {
        ChainError::HeightGap { expected, actual } => StoreError::HeightConflict { expected, actual },
        ChainError::BrokenLink { height, .. } => StoreError::BrokenLink { height },
        ChainError::HeightOverflow { .. } => StoreError::BrokenLink { height: block.height },
    })?;

    let mismatch = |reason: String| StoreError::WitnessMismatch {
        height: block.height,
        reason,
    };
    if witnesses.len() as u64 != block.transaction_count {
        return Err(mismatch(format!(
            "{} witnesses for {} transactions",
            witnesses.len(),
            block.transaction_count
        )));
    }

    let mut seen = HashSet::with_capacity(witnesses.len());
    for (index, witness) in witnesses.iter().enumerate() {
        if witness.block_height != block.height {
            return Err(mismatch(format!(
                "witness {} references block {}",
                witness.transaction_id, witness.block_height
            )));
        }
        if witness.leaf_index != index as u64 {
            return Err(mismatch(format!(
                "witness {} has leaf index {}, expected {index}",
                witness.transaction_id, witness.leaf_index
            )));
        }
        if !seen.insert(&witness.transaction_id) || is_known(&witness.transaction_id) {
            return Err(StoreError::DuplicateWitness(witness.transaction_id.clone()));
        }
    }
    Ok(())
}
