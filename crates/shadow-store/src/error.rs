use shadow_types::TransactionId;

/// Errors from audit store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The block does not sit directly on top of the current tip.
    #[error("height conflict: expected block {expected}, got {actual}")]
    HeightConflict { expected: u64, actual: u64 },

    /// The block's previous hash does not match the tip's root.
    #[error("block {height} does not link to the current tip")]
    BrokenLink { height: u64 },

    /// A witness for this transaction already exists.
    #[error("duplicate witness for transaction {0}")]
    DuplicateWitness(TransactionId),

    /// Witnesses do not agree with the block they are committed with.
    #[error("witness set does not match block {height}: {reason}")]
    WitnessMismatch { height: u64, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk log is damaged before its final record.
    #[error("corrupt store at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
