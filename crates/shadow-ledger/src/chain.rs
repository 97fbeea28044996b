use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shadow_crypto::HashChainVerifier;
use shadow_seal::{seal_batch, StrategySet};
use shadow_store::{AuditStore, InMemoryAuditStore};
use shadow_types::{AuditBlock, SealMode, TransactionEvent, TransactionId, TransactionWitness};
use tracing::{debug, error, info, warn};

use crate::buffer::{FailedBatch, PendingLanes, Pushed};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::validation::{ChainValidator, ValidationReport};
use crate::verify::{self, VerificationResult};

/// Where a submitted transaction stands after `submit` returns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitStatus {
    /// Buffered; `lane_depth` transactions are waiting in its lane.
    Pending { lane_depth: usize },
    /// Sealed into the block at `height`.
    Sealed { height: u64 },
}

/// Synchronous acknowledgement of a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAck {
    pub transaction_id: TransactionId,
    pub mode: SealMode,
    #[serde(flatten)]
    pub status: SubmitStatus,
}

/// Result of sealing one batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SealOutcome {
    /// A new block was committed.
    Sealed(AuditBlock),
    /// Nothing was pending.
    Empty,
    /// Every transaction in the batch already has a witness in `height`.
    AlreadySealed { height: u64 },
}

/// The audit ledger: pending lanes plus the append-only block sequence.
///
/// `LedgerChain` is the only writer of its store. Concurrent submitters
/// are safe: lane updates are serialized by the lane lock, and sealing is
/// serialized by a separate seal lock backed by the store's height check.
pub struct LedgerChain {
    config: LedgerConfig,
    strategies: StrategySet,
    store: Arc<dyn AuditStore>,
    pending: PendingLanes,
    seal_lock: Mutex<()>,
}

impl LedgerChain {
    pub fn new(
        config: LedgerConfig,
        strategies: StrategySet,
        store: Arc<dyn AuditStore>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            strategies,
            store,
            pending: PendingLanes::default(),
            seal_lock: Mutex::new(()),
        })
    }

    /// An in-memory ledger with freshly generated strategy keys.
    pub fn in_memory(config: LedgerConfig) -> LedgerResult<Self> {
        Self::new(
            config,
            StrategySet::ephemeral(),
            Arc::new(InMemoryAuditStore::new()),
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn AuditStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Submission and sealing
    // -----------------------------------------------------------------------

    /// Buffer `event` in the lane for `mode`, sealing the lane if it is full.
    pub fn submit(&self, event: TransactionEvent, mode: SealMode) -> LedgerResult<SubmitAck> {
        event.validate()?;
        self.strategies
            .get(mode)
            .ensure_ready()
            .map_err(|source| LedgerError::StrategyUnavailable { mode, source })?;

        let transaction_id = event.id.clone();
        let pushed = self.pending.push(event, mode, self.config.batch_size, |id| {
            Ok(self.store.witness(id)?.is_some())
        })?;
        let status = match pushed {
            Pushed::Waiting { depth } => {
                debug!(tx = %transaction_id, %mode, depth, "transaction buffered");
                SubmitStatus::Pending { lane_depth: depth }
            }
            Pushed::Full(batch) => match self.seal(mode, batch)? {
                SealOutcome::Sealed(block) => SubmitStatus::Sealed {
                    height: block.height,
                },
                SealOutcome::AlreadySealed { height } => SubmitStatus::Sealed { height },
                SealOutcome::Empty => SubmitStatus::Pending { lane_depth: 0 },
            },
        };

        Ok(SubmitAck {
            transaction_id,
            mode,
            status,
        })
    }

    /// Seal whatever is pending in the lane for `mode`.
    pub fn seal_lane(&self, mode: SealMode) -> LedgerResult<SealOutcome> {
        let batch = self.pending.take(mode)?;
        self.seal(mode, batch)
    }

    /// Seal every non-empty lane. Returns the blocks created.
    pub fn flush(&self) -> LedgerResult<Vec<AuditBlock>> {
        let mut sealed = Vec::new();
        for mode in SealMode::ALL {
            if let SealOutcome::Sealed(block) = self.seal_lane(mode)? {
                sealed.push(block);
            }
        }
        if !sealed.is_empty() {
            info!(blocks = sealed.len(), "flushed pending lanes");
        }
        Ok(sealed)
    }

    /// Pending transactions per non-empty lane.
    pub fn pending(&self) -> LedgerResult<Vec<(SealMode, usize)>> {
        self.pending.depths()
    }

    /// Batches whose seal or commit failed, oldest first. A transaction
    /// drops out of this list once it is submitted again.
    pub fn failed_batches(&self) -> LedgerResult<Vec<FailedBatch>> {
        self.pending.failed_batches()
    }

    fn seal(&self, mode: SealMode, batch: Vec<TransactionEvent>) -> LedgerResult<SealOutcome> {
        if batch.is_empty() {
            return Ok(SealOutcome::Empty);
        }
        match self.seal_batch_locked(mode, &batch) {
            Ok(outcome) => {
                self.pending.release(batch.iter().map(|e| &e.id))?;
                Ok(outcome)
            }
            Err(e) => {
                let failed = self.pending.abandon(mode, &batch, e.to_string())?;
                warn!(
                    %mode,
                    transactions = failed.transaction_ids.len(),
                    reason = %failed.reason,
                    "batch abandoned"
                );
                Err(e)
            }
        }
    }

    fn seal_batch_locked(
        &self,
        mode: SealMode,
        batch: &[TransactionEvent],
    ) -> LedgerResult<SealOutcome> {
        let _guard = self.seal_lock.lock().map_err(|_| LedgerError::LockPoisoned)?;

        if let Some(height) = self.already_sealed(batch)? {
            debug!(%mode, height, "batch already sealed");
            return Ok(SealOutcome::AlreadySealed { height });
        }

        let sealed_at = Utc::now();
        let strategy = self.strategies.get(mode);
        let seal = seal_batch(strategy, batch, sealed_at).map_err(|source| {
            error!(%mode, batch = batch.len(), error = %source, "sealing failed");
            LedgerError::Sealing {
                mode,
                transaction_ids: batch.iter().map(|e| e.id.clone()).collect(),
                source,
            }
        })?;

        let tip = self.store.latest_block()?;
        let (height, previous_block_hash) = HashChainVerifier::next_link(tip.as_ref())
            .map_err(|e| LedgerError::integrity(tip.as_ref().map_or(0, |b| b.height), e.to_string()))?;
        let block = AuditBlock {
            height,
            merkle_root: seal.root,
            previous_block_hash,
            transaction_count: seal.entries.len() as u64,
            timestamp: sealed_at,
            seal_mode: mode,
        };
        let witnesses: Vec<TransactionWitness> = seal
            .entries
            .into_iter()
            .map(|entry| TransactionWitness {
                transaction_id: entry.transaction_id,
                transaction_hash: entry.content_hash,
                block_height: height,
                leaf_index: entry.leaf_index,
                proof: entry.proof,
                seal_mode: mode,
                token: entry.token,
            })
            .collect();

        self.store.commit_block(&block, &witnesses)?;
        info!(
            height,
            %mode,
            transactions = block.transaction_count,
            root = %block.merkle_root.short_hex(),
            "block sealed"
        );
        Ok(SealOutcome::Sealed(block))
    }

    /// If every event already has a witness in a single block, that height.
    fn already_sealed(&self, batch: &[TransactionEvent]) -> LedgerResult<Option<u64>> {
        let mut height = None;
        for event in batch {
            match self.store.witness(&event.id)? {
                Some(w) if height.is_none() || height == Some(w.block_height) => {
                    height = Some(w.block_height)
                }
                Some(_) => return Err(LedgerError::DuplicateTransaction(event.id.clone())),
                None if height.is_some() => {
                    return Err(LedgerError::DuplicateTransaction(event.id.clone()))
                }
                None => return Ok(None),
            }
        }
        Ok(height)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Look up and re-check the evidence for one transaction.
    ///
    /// Unknown ids yield `found == false`, with `seal_failure` set when the
    /// id was lost with a failed batch. Any mismatch in stored evidence
    /// is an error.
    pub fn verify(&self, transaction_id: &TransactionId) -> LedgerResult<VerificationResult> {
        let witness = match self.store.witness(transaction_id)? {
            Some(w) => w,
            None => {
                let pending = self.pending.contains(transaction_id)?;
                let mut result = VerificationResult::not_found(transaction_id.clone(), pending);
                result.seal_failure = self.pending.failure(transaction_id)?;
                return Ok(result);
            }
        };
        verify::verify_witness(self.store.as_ref(), &self.strategies, witness)
    }

    /// Up to `n` blocks, newest first.
    pub fn recent_blocks(&self, n: usize) -> LedgerResult<Vec<AuditBlock>> {
        Ok(self.store.recent_blocks(n)?)
    }

    /// Walk the whole chain and report every violation found.
    pub fn validate_chain(&self) -> LedgerResult<ValidationReport> {
        ChainValidator::validate(self.store.as_ref(), &self.strategies)
    }
}

impl std::fmt::Debug for LedgerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerChain")
            .field("config", &self.config)
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}
