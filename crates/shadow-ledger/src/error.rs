use shadow_seal::SealError;
use shadow_store::StoreError;
use shadow_types::{SealMode, TransactionId, TypeError};

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Malformed input, rejected before buffering.
    #[error("validation error: {0}")]
    Validation(#[from] TypeError),

    /// The transaction id is already pending or sealed.
    #[error("transaction {0} has already been submitted")]
    DuplicateTransaction(TransactionId),

    /// The strategy for this mode cannot seal right now.
    #[error("{mode} strategy not ready: {source}")]
    StrategyUnavailable {
        mode: SealMode,
        #[source]
        source: SealError,
    },

    /// Sealing a batch failed; nothing was committed.
    #[error("sealing {count} {mode} transactions failed: {source}", count = .transaction_ids.len())]
    Sealing {
        mode: SealMode,
        transaction_ids: Vec<TransactionId>,
        #[source]
        source: SealError,
    },

    /// Stored evidence does not check out.
    #[error("chain integrity violation at block {height}: {reason}")]
    ChainIntegrityViolation { height: u64, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    pub fn integrity(height: u64, reason: impl Into<String>) -> Self {
        Self::ChainIntegrityViolation {
            height,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for ledger results.
pub type LedgerResult<T> = Result<T, LedgerError>;
