use shadow_crypto::MerkleError;
use shadow_types::{SealMode, TransactionId};

/// Errors that can occur while sealing or re-checking a witness token.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// The strategy has no usable key material.
    #[error("key unavailable for {mode}: {reason}")]
    KeyUnavailable { mode: SealMode, reason: String },

    /// Producing a signature or commitment failed.
    #[error("signing error: {0}")]
    Signing(String),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    /// A stored token does not check out against its evidence.
    #[error("invalid {mode} token for {transaction_id}: {reason}")]
    InvalidToken {
        mode: SealMode,
        transaction_id: TransactionId,
        reason: String,
    },

    /// Strategy configuration is malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SealError {
    pub fn key_unavailable(mode: SealMode, reason: impl Into<String>) -> Self {
        Self::KeyUnavailable {
            mode,
            reason: reason.into(),
        }
    }

    pub fn invalid_token(
        mode: SealMode,
        transaction_id: &TransactionId,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidToken {
            mode,
            transaction_id: transaction_id.clone(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for sealing results.
pub type SealResult<T> = Result<T, SealError>;
