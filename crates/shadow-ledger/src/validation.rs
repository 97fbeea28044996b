use serde::{Deserialize, Serialize};
use shadow_crypto::{ChainError, HashChainVerifier, MerkleTree};
use shadow_seal::StrategySet;
use shadow_store::AuditStore;
use shadow_types::AuditBlock;
use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::verify::check_evidence;

/// Result of a full-chain audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub block_count: u64,
    pub transaction_count: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub height: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    HeightGap,
    BrokenLink,
    RootMismatch,
    CountMismatch,
    InvalidProof,
}

/// Full-chain integrity validator.
///
/// Unlike [`LedgerChain::verify`](crate::LedgerChain::verify), which stops at
/// the first problem with one transaction, the validator walks every block
/// and collects every violation it finds.
pub struct ChainValidator;

impl ChainValidator {
    pub fn validate(store: &dyn AuditStore, strategies: &StrategySet) -> LedgerResult<ValidationReport> {
        let blocks = store.all_blocks()?;
        let mut violations = Vec::new();
        let mut transaction_count = 0u64;
        let mut prev: Option<&AuditBlock> = None;

        for block in &blocks {
            let height = block.height;
            let mut push = |kind, description: String| {
                violations.push(Violation {
                    height,
                    kind,
                    description,
                })
            };

            match HashChainVerifier::check_link(prev, block) {
                Ok(()) => {}
                Err(e @ (ChainError::HeightGap { .. } | ChainError::HeightOverflow { .. })) => {
                    push(ViolationKind::HeightGap, e.to_string())
                }
                Err(e @ ChainError::BrokenLink { .. }) => push(ViolationKind::BrokenLink, e.to_string()),
            }

            let witnesses = store.witnesses_for_block(height)?;
            transaction_count += witnesses.len() as u64;
            if witnesses.len() as u64 != block.transaction_count {
                push(
                    ViolationKind::CountMismatch,
                    format!(
                        "block records {} transactions, {} witnesses found",
                        block.transaction_count,
                        witnesses.len()
                    ),
                );
            }

            let strategy = strategies.get(block.seal_mode);
            let leaves = witnesses
                .iter()
                .map(|w| strategy.leaf(&w.transaction_hash, &w.token))
                .collect();
            match MerkleTree::from_leaves(leaves) {
                Ok(tree) if tree.root() == block.merkle_root => {}
                Ok(tree) => push(
                    ViolationKind::RootMismatch,
                    format!(
                        "recomputed root {} differs from stored {}",
                        tree.root().short_hex(),
                        block.merkle_root.short_hex()
                    ),
                ),
                Err(e) => push(ViolationKind::RootMismatch, e.to_string()),
            }

            for witness in &witnesses {
                if let Err(e) = check_evidence(strategies, block, witness) {
                    let description = match e {
                        LedgerError::ChainIntegrityViolation { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    push(ViolationKind::InvalidProof, description);
                }
            }

            prev = Some(block);
        }

        if violations.is_empty() {
            info!(blocks = blocks.len(), transactions = transaction_count, "chain valid");
        } else {
            warn!(violations = violations.len(), "chain validation found violations");
        }

        Ok(ValidationReport {
            block_count: blocks.len() as u64,
            transaction_count,
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shadow_store::InMemoryAuditStore;
    use shadow_types::{Digest, SealMode, TransactionWitness};

    /// Store that serves a fixed, possibly inconsistent, set of records.
    struct RawStore {
        blocks: Vec<AuditBlock>,
        witnesses: Vec<TransactionWitness>,
    }

    impl AuditStore for RawStore {
        fn commit_block(&self, _: &AuditBlock, _: &[TransactionWitness]) -> shadow_store::StoreResult<()> {
            unimplemented!("read-only fixture")
        }
        fn latest_block(&self) -> shadow_store::StoreResult<Option<AuditBlock>> {
            Ok(self.blocks.last().cloned())
        }
        fn block(&self, height: u64) -> shadow_store::StoreResult<Option<AuditBlock>> {
            Ok(self.blocks.iter().find(|b| b.height == height).cloned())
        }
        fn recent_blocks(&self, n: usize) -> shadow_store::StoreResult<Vec<AuditBlock>> {
            Ok(self.blocks.iter().rev().take(n).cloned().collect())
        }
        fn witness(&self, id: &shadow_types::TransactionId) -> shadow_store::StoreResult<Option<TransactionWitness>> {
            Ok(self.witnesses.iter().find(|w| &w.transaction_id == id).cloned())
        }
        fn witnesses_for_block(&self, height: u64) -> shadow_store::StoreResult<Vec<TransactionWitness>> {
            Ok(self.witnesses.iter().filter(|w| w.block_height == height).cloned().collect())
        }
        fn block_count(&self) -> shadow_store::StoreResult<u64> {
            Ok(self.blocks.len() as u64)
        }
        fn all_blocks(&self) -> shadow_store::StoreResult<Vec<AuditBlock>> {
            Ok(self.blocks.clone())
        }
    }

    fn sealed_records() -> (Vec<AuditBlock>, Vec<TransactionWitness>, StrategySet) {
        let ledger = crate::LedgerChain::in_memory(crate::LedgerConfig::with_batch_size(2)).unwrap();
        for i in 0..6 {
            let event = shadow_types::TransactionEvent::new(
                format!("c-{i}"),
                "from",
                "to",
                10,
                Utc::now(),
            )
            .unwrap();
            ledger.submit(event, SealMode::Simple).unwrap();
        }
        let blocks = ledger.store().all_blocks().unwrap();
        let witnesses = blocks
            .iter()
            .flat_map(|b| ledger.store().witnesses_for_block(b.height).unwrap())
            .collect();
        (blocks, witnesses, StrategySet::ephemeral())
    }

    #[test]
    fn empty_store_is_valid() {
        let report =
            ChainValidator::validate(&InMemoryAuditStore::new(), &StrategySet::ephemeral()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.block_count, 0);
    }

    #[test]
    fn clean_chain_has_no_violations() {
        let (blocks, witnesses, strategies) = sealed_records();
        let report = ChainValidator::validate(&RawStore { blocks, witnesses }, &strategies).unwrap();
        assert!(report.is_valid(), "{:?}", report.violations);
        assert_eq!(report.block_count, 3);
        assert_eq!(report.transaction_count, 6);
    }

    #[test]
    fn collects_multiple_violations() {
        let (mut blocks, mut witnesses, strategies) = sealed_records();
        blocks[1].merkle_root = Digest::derive("tamper", b"root");
        witnesses.retain(|w| w.transaction_id.as_str() != "c-5");

        let report = ChainValidator::validate(&RawStore { blocks, witnesses }, &strategies).unwrap();
        let kinds: Vec<ViolationKind> = report.violations.iter().map(|v| v.kind).collect();
        assert!(kinds.contains(&ViolationKind::RootMismatch));
        assert!(kinds.contains(&ViolationKind::BrokenLink));
        assert!(kinds.contains(&ViolationKind::CountMismatch));
        assert!(kinds.contains(&ViolationKind::InvalidProof));
    }

    #[test]
    fn detects_height_gap() {
        let (mut blocks, witnesses, strategies) = sealed_records();
        blocks.remove(1);
        let report = ChainValidator::validate(&RawStore { blocks, witnesses }, &strategies).unwrap();
        assert!(report
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::HeightGap && v.height == 3));
    }
}
