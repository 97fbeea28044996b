use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::transaction::TransactionId;
use crate::witness::{SealMode, WitnessToken};

/// Position of a sibling hash in a Merkle proof step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// One step of a Merkle inclusion path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: Digest,
    pub side: Side,
}

/// One entry in the append-only block sequence.
///
/// Heights start at [`AuditBlock::GENESIS_HEIGHT`] and increase by one.
/// Each block's `previous_block_hash` is the `merkle_root` of the block below
/// it, or the null digest for the first block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBlock {
    pub height: u64,
    pub merkle_root: Digest,
    pub previous_block_hash: Digest,
    pub transaction_count: u64,
    pub timestamp: DateTime<Utc>,
    pub seal_mode: SealMode,
}

impl AuditBlock {
    /// Height of the first block.
    pub const GENESIS_HEIGHT: u64 = 1;

    /// Sentinel link value for the first block.
    pub const GENESIS_PREVIOUS: Digest = Digest::null();

    pub fn is_genesis(&self) -> bool {
        self.height == Self::GENESIS_HEIGHT
    }

    /// Whether `self` is the direct successor of `prev`.
    pub fn follows(&self, prev: &AuditBlock) -> bool {
        prev.height.checked_add(1) == Some(self.height) && self.previous_block_hash == prev.merkle_root
    }
}

/// Inclusion record for one sealed transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionWitness {
    pub transaction_id: TransactionId,
    pub transaction_hash: Digest,
    pub block_height: u64,
    pub leaf_index: u64,
    pub proof: Vec<ProofStep>,
    pub seal_mode: SealMode,
    pub token: WitnessToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn block(height: u64) -> AuditBlock {
        AuditBlock {
            height,
            merkle_root: Digest::derive("test", b"root"),
            previous_block_hash: AuditBlock::GENESIS_PREVIOUS,
            transaction_count: 3,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            seal_mode: SealMode::Merkle,
        }
    }

    #[test]
    fn genesis_links_to_null() {
        let b = block(1);
        assert!(b.is_genesis());
        assert!(b.previous_block_hash.is_null());
    }

    #[test]
    fn follows_requires_root_link() {
        let first = block(1);
        let mut second = block(2);
        assert!(!second.follows(&first));
        second.previous_block_hash = first.merkle_root;
        assert!(second.follows(&first));
        second.height = 3;
        assert!(!second.follows(&first));
    }

    #[test]
    fn nothing_follows_maximal_height() {
        let last = block(u64::MAX);
        let mut next = block(0);
        next.previous_block_hash = last.merkle_root;
        assert!(!next.follows(&last));
    }
}
