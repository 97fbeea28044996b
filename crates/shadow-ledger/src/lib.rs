//! The Shadow Ledger audit chain.
//!
//! [`LedgerChain`] is the single writer of the block sequence. Transactions
//! are submitted into a pending lane for their [`SealMode`](shadow_types::SealMode);
//! when a lane reaches the configured batch size it is sealed into one
//! [`AuditBlock`](shadow_types::AuditBlock) whose `previous_block_hash` is
//! the Merkle root of the block before it.
//!
//! # Key Types
//!
//! - [`LedgerChain`]: submit, seal, flush, verify, and audit
//! - [`LedgerConfig`]: batch size
//! - [`VerificationResult`]: answer to "was transaction X sealed, and how?"
//! - [`ChainValidator`] / [`ValidationReport`]: full-chain audit walk

pub mod buffer;
pub mod chain;
pub mod config;
pub mod error;
pub mod validation;
pub mod verify;

pub use buffer::FailedBatch;
pub use chain::{LedgerChain, SealOutcome, SubmitAck, SubmitStatus};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use validation::{ChainValidator, ValidationReport, Violation, ViolationKind};
pub use verify::VerificationResult;
