//! Foundation types for the Shadow Ledger.
//!
//! This crate provides the value types shared by every other Shadow Ledger
//! crate. It carries no I/O and no locking.
//!
//! # Key Types
//!
//! - [`Digest`]: 32-byte BLAKE3 digest with domain-separated derivation
//! - [`TransactionEvent`]: immutable captured transaction with a content hash
//! - [`SealMode`]: the sealing strategy a transaction is committed under
//! - [`WitnessToken`]: opaque proof emitted by a sealing strategy
//! - [`AuditBlock`]: one entry in the hash-chained block sequence
//! - [`TransactionWitness`]: per-transaction inclusion record referencing a block

pub mod block;
pub mod digest;
pub mod error;
pub mod transaction;
pub mod witness;

pub use block::{AuditBlock, ProofStep, Side, TransactionWitness};
pub use digest::Digest;
pub use error::TypeError;
pub use transaction::{TransactionEvent, TransactionId};
pub use witness::{SealMode, WitnessToken};
