use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shadow_types::{SealMode, TransactionEvent, TransactionId};

use crate::error::{LedgerError, LedgerResult};

/// Result of pushing one event into its lane.
#[derive(Debug)]
pub(crate) enum Pushed {
    /// The event is waiting; `depth` events are now in the lane.
    Waiting { depth: usize },
    /// The event filled the lane, which was taken as a full batch.
    Full(Vec<TransactionEvent>),
}

/// A batch that was taken from its lane but never committed.
///
/// Ids stay listed here until they are submitted again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedBatch {
    pub mode: SealMode,
    pub transaction_ids: Vec<TransactionId>,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Default)]
struct LaneState {
    lanes: BTreeMap<SealMode, Vec<TransactionEvent>>,
    /// Ids that are buffered or currently being sealed.
    in_flight: HashSet<TransactionId>,
    failed: Vec<FailedBatch>,
}

impl LaneState {
    fn forget_failure(&mut self, id: &TransactionId) {
        for batch in &mut self.failed {
            batch.transaction_ids.retain(|t| t != id);
        }
        self.failed.retain(|b| !b.transaction_ids.is_empty());
    }
}

/// Pending transactions, one lane per seal mode.
///
/// Appending and snapshot-and-clear happen under one lock, so every event
/// lands in exactly one batch. An id leaves `in_flight` only after its
/// block is committed, and `push` consults the store under the same lock,
/// so a sealed id is always caught by one check or the other.
#[derive(Default)]
pub(crate) struct PendingLanes {
    state: Mutex<LaneState>,
}

impl PendingLanes {
    fn lock(&self) -> LedgerResult<MutexGuard<'_, LaneState>> {
        self.state.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Append `event` to the lane for `mode`, taking the lane once it holds
    /// `batch_size` events. `is_sealed` is asked about ids not in flight.
    pub(crate) fn push(
        &self,
        event: TransactionEvent,
        mode: SealMode,
        batch_size: usize,
        is_sealed: impl FnOnce(&TransactionId) -> LedgerResult<bool>,
    ) -> LedgerResult<Pushed> {
        let mut state = self.lock()?;
        if state.in_flight.contains(&event.id) || is_sealed(&event.id)? {
            return Err(LedgerError::DuplicateTransaction(event.id));
        }
        state.in_flight.insert(event.id.clone());
        state.forget_failure(&event.id);
        let lane = state.lanes.entry(mode).or_default();
        lane.push(event);
        if lane.len() >= batch_size {
            Ok(Pushed::Full(std::mem::take(lane)))
        } else {
            Ok(Pushed::Waiting { depth: lane.len() })
        }
    }

    /// Take every event in the lane for `mode`.
    pub(crate) fn take(&self, mode: SealMode) -> LedgerResult<Vec<TransactionEvent>> {
        let mut state = self.lock()?;
        Ok(state.lanes.get_mut(&mode).map(std::mem::take).unwrap_or_default())
    }

    /// Forget ids whose batch has been committed.
    pub(crate) fn release<'a>(&self, ids: impl IntoIterator<Item = &'a TransactionId>) -> LedgerResult<()> {
        let mut state = self.lock()?;
        for id in ids {
            state.in_flight.remove(id);
        }
        Ok(())
    }

    /// Forget ids whose batch could not be committed, and record why.
    pub(crate) fn abandon(
        &self,
        mode: SealMode,
        batch: &[TransactionEvent],
        reason: String,
    ) -> LedgerResult<FailedBatch> {
        let mut state = self.lock()?;
        let transaction_ids: Vec<TransactionId> = batch.iter().map(|e| e.id.clone()).collect();
        for id in &transaction_ids {
            state.in_flight.remove(id);
            state.forget_failure(id);
        }
        let failed = FailedBatch {
            mode,
            transaction_ids,
            reason,
            failed_at: Utc::now(),
        };
        state.failed.push(failed.clone());
        Ok(failed)
    }

    /// Whether `id` is buffered or being sealed.
    pub(crate) fn contains(&self, id: &TransactionId) -> LedgerResult<bool> {
        Ok(self.lock()?.in_flight.contains(id))
    }

    /// Why the batch holding `id` failed, if it did.
    pub(crate) fn failure(&self, id: &TransactionId) -> LedgerResult<Option<String>> {
        Ok(self
            .lock()?
            .failed
            .iter()
            .rev()
            .find(|b| b.transaction_ids.contains(id))
            .map(|b| b.reason.clone()))
    }

    pub(crate) fn failed_batches(&self) -> LedgerResult<Vec<FailedBatch>> {
        Ok(self.lock()?.failed.clone())
    }

    /// Number of events waiting in each non-empty lane.
    pub(crate) fn depths(&self) -> LedgerResult<Vec<(SealMode, usize)>> {
        Ok(self
            .lock()?
            .lanes
            .iter()
            .filter(|(_, lane)| !lane.is_empty())
            .map(|(mode, lane)| (*mode, lane.len()))
            .collect())
    }
}
