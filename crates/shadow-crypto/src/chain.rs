use shadow_types::{AuditBlock, Digest};

/// Hash-chain link checks over a sequence of audit blocks.
///
/// A well-formed chain starts at the genesis height with the null previous
/// hash, and every later block has height `prev.height + 1` and a previous
/// hash equal to `prev.merkle_root`.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify an ordered slice of blocks, stopping at the first defect.
    pub fn verify_chain(blocks: &[AuditBlock]) -> Result<(), ChainError> {
        let mut prev: Option<&AuditBlock> = None;
        for block in blocks {
            Self::check_link(prev, block)?;
            prev = Some(block);
        }
        Ok(())
    }

    /// Check that `block` correctly follows `prev` (or is a valid genesis).
    pub fn check_link(prev: Option<&AuditBlock>, block: &AuditBlock) -> Result<(), ChainError> {
        let (expected_height, expected_prev) = Self::next_link(prev)?;
        if block.height != expected_height {
            return Err(ChainError::HeightGap {
                expected: expected_height,
                actual: block.height,
            });
        }
        if block.previous_block_hash != expected_prev {
            return Err(ChainError::BrokenLink {
                height: block.height,
                expected: expected_prev,
                actual: block.previous_block_hash,
            });
        }
        Ok(())
    }

    /// Height and previous hash that the block after `prev` must carry.
    pub fn next_link(prev: Option<&AuditBlock>) -> Result<(u64, Digest), ChainError> {
        match prev {
            Some(p) => p
                .height
                .checked_add(1)
                .map(|height| (height, p.merkle_root))
                .ok_or(ChainError::HeightOverflow { height: p.height }),
            None => Ok((AuditBlock::GENESIS_HEIGHT, AuditBlock::GENESIS_PREVIOUS)),
        }
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("height gap: expected {expected}, found {actual}")]
    HeightGap { expected: u64, actual: u64 },

    #[error("broken link at height {height}: expected previous hash {expected}, found {actual}")]
    BrokenLink {
        height: u64,
        expected: Digest,
        actual: Digest,
    },

    #[error("no height follows block {height}")]
    HeightOverflow { height: u64 },
}
