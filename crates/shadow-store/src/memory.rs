use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use shadow_types::{AuditBlock, TransactionId, TransactionWitness};

use crate::error::{StoreError, StoreResult};
use crate::traits::{check_commit, AuditStore};

#[derive(Default)]
struct MemoryState {
    /// Blocks in height order; index 0 holds the genesis block.
    blocks: Vec<AuditBlock>,
    witnesses: HashMap<TransactionId, TransactionWitness>,
    by_block: HashMap<u64, Vec<TransactionId>>,
}

impl MemoryState {
    fn index_of(height: u64) -> Option<usize> {
        height
            .checked_sub(AuditBlock::GENESIS_HEIGHT)
            .map(|i| i as usize)
    }
}

/// In-memory audit store.
///
/// Intended for tests and embedding. All state sits behind a single
/// `RwLock`, so a commit is visible to readers all at once.
pub struct InMemoryAuditStore {
    state: RwLock<MemoryState>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Number of witnesses held.
    pub fn witness_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.witnesses.len())
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryAuditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (blocks, witnesses) = self
            .state
            .read()
            .map(|s| (s.blocks.len(), s.witnesses.len()))
            .unwrap_or_default();
        f.debug_struct("InMemoryAuditStore")
            .field("blocks", &blocks)
            .field("witnesses", &witnesses)
            .finish()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn commit_block(&self, block: &AuditBlock, witnesses: &[TransactionWitness]) -> StoreResult<()> {
        let mut state = self.write()?;
        check_commit(state.blocks.last(), block, witnesses, |id| {
            state.witnesses.contains_key(id)
        })?;

        let ids = witnesses.iter().map(|w| w.transaction_id.clone()).collect();
        for witness in witnesses {
            state
                .witnesses
                .insert(witness.transaction_id.clone(), witness.clone());
        }
        state.by_block.insert(block.height, ids);
        state.blocks.push(block.clone());
        Ok(())
    }

    fn latest_block(&self) -> StoreResult<Option<AuditBlock>> {
        Ok(self.read()?.blocks.last().cloned())
    }

    fn block(&self, height: u64) -> StoreResult<Option<AuditBlock>> {
        let state = self.read()?;
        Ok(MemoryState::index_of(height).and_then(|i| state.blocks.get(i).cloned()))
    }

    fn recent_blocks(&self, n: usize) -> StoreResult<Vec<AuditBlock>> {
        Ok(self.read()?.blocks.iter().rev().take(n).cloned().collect())
    }

    fn witness(&self, transaction_id: &TransactionId) -> StoreResult<Option<TransactionWitness>> {
        Ok(self.read()?.witnesses.get(transaction_id).cloned())
    }

    fn witnesses_for_block(&self, height: u64) -> StoreResult<Vec<TransactionWitness>> {
        let state = self.read()?;
        let ids = match state.by_block.get(&height) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.witnesses.get(id).cloned())
            .collect())
    }

    fn block_count(&self) -> StoreResult<u64> {
        Ok(self.read()?.blocks.len() as u64)
    }

    fn all_blocks(&self) -> StoreResult<Vec<AuditBlock>> {
        Ok(self.read()?.blocks.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shadow_types::{Digest, SealMode, WitnessToken};

    /// Build block `height` on top of `prev` with `n` witnesses.
    pub(crate) fn commit_fixture(
        prev: Option<&AuditBlock>,
        height: u64,
        n: usize,
    ) -> (AuditBlock, Vec<TransactionWitness>) {
        let block = AuditBlock {
            height,
            merkle_root: Digest::derive("test-root", &height.to_le_bytes()),
            previous_block_hash: prev.map(|b| b.merkle_root).unwrap_or(AuditBlock::GENESIS_PREVIOUS),
            transaction_count: n as u64,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            seal_mode: SealMode::Simple,
        };
        let witnesses = (0..n)
            .map(|i| {
                let id = TransactionId::new(format!("tx-{height}-{i}"));
                TransactionWitness {
                    transaction_id: id.clone(),
                    transaction_hash: Digest::derive("test-tx", id.as_str().as_bytes()),
                    block_height: height,
                    leaf_index: i as u64,
                    proof: Vec::new(),
                    seal_mode: SealMode::Simple,
                    token: WitnessToken::new(id, "SIMPLE_0", SealMode::Simple),
                }
            })
            .collect();
        (block, witnesses)
    }

    #[test]
    fn commit_and_read_back() {
        let store = InMemoryAuditStore::new();
        let (b1, w1) = commit_fixture(None, 1, 3);
        store.commit_block(&b1, &w1).unwrap();

        assert_eq!(store.block_count().unwrap(), 1);
        assert_eq!(store.latest_block().unwrap(), Some(b1.clone()));
        assert_eq!(store.block(1).unwrap(), Some(b1));
        assert_eq!(store.block(0).unwrap(), None);
        assert_eq!(store.witnesses_for_block(1).unwrap(), w1);
        assert_eq!(
            store.witness(&"tx-1-2".into()).unwrap().unwrap().leaf_index,
            2
        );
        assert!(store.witness(&"nope".into()).unwrap().is_none());
    }

    #[test]
    fn recent_blocks_newest_first() {
        let store = InMemoryAuditStore::new();
        let mut prev: Option<AuditBlock> = None;
        for h in 1..=4 {
            let (b, w) = commit_fixture(prev.as_ref(), h, 1);
            store.commit_block(&b, &w).unwrap();
            prev = Some(b);
        }
        let heights: Vec<u64> = store.recent_blocks(3).unwrap().iter().map(|b| b.height).collect();
        assert_eq!(heights, [4, 3, 2]);
        assert_eq!(store.recent_blocks(10).unwrap().len(), 4);
    }

    #[test]
    fn rejects_stale_height() {
        let store = InMemoryAuditStore::new();
        let (b1, w1) = commit_fixture(None, 1, 1);
        store.commit_block(&b1, &w1).unwrap();
        let err = store.commit_block(&b1, &w1).unwrap_err();
        assert!(matches!(
            err,
            StoreError::HeightConflict {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(store.block_count().unwrap(), 1);
    }

    #[test]
    fn rejects_broken_link() {
        let store = InMemoryAuditStore::new();
        let (b1, w1) = commit_fixture(None, 1, 1);
        store.commit_block(&b1, &w1).unwrap();
        let (b2, w2) = commit_fixture(None, 2, 1);
        assert!(matches!(
            store.commit_block(&b2, &w2),
            Err(StoreError::BrokenLink { height: 2 })
        ));
    }

    #[test]
    fn rejects_duplicate_transaction() {
        let store = InMemoryAuditStore::new();
        let (b1, w1) = commit_fixture(None, 1, 2);
        store.commit_block(&b1, &w1).unwrap();
        let (b2, mut w2) = commit_fixture(Some(&b1), 2, 1);
        w2[0].transaction_id = "tx-1-0".into();
        assert!(matches!(
            store.commit_block(&b2, &w2),
            Err(StoreError::DuplicateWitness(_))
        ));
        assert_eq!(store.witness_count().unwrap(), 2);
    }

    #[test]
    fn rejects_count_mismatch() {
        let store = InMemoryAuditStore::new();
        let (b1, mut w1) = commit_fixture(None, 1, 3);
        w1.pop();
        assert!(matches!(
            store.commit_block(&b1, &w1),
            Err(StoreError::WitnessMismatch { height: 1, .. })
        ));
        assert!(store.latest_block().unwrap().is_none());
    }
}
