use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid payment: {0}")]
    Validation(#[from] shadow_types::TypeError),

    #[error("ledger error: {0}")]
    Ledger(#[from] shadow_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] shadow_store::StoreError),

    #[error("seal error: {0}")]
    Seal(#[from] shadow_seal::SealError),

    #[error("policy error: {0}")]
    Policy(#[from] shadow_policy::PolicyError),

    #[error("classifier error: {0}")]
    Classifier(#[from] shadow_risk::ClassifierError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking ledger task panicked or was cancelled.
    #[error("ledger task failed: {0}")]
    Join(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
