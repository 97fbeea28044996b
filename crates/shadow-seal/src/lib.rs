//! Sealing strategies for the Shadow Ledger.
//!
//! A [`SealingStrategy`] turns one captured transaction into a
//! [`WitnessToken`](shadow_types::WitnessToken). [`seal_batch`] folds a whole
//! pending batch into a Merkle root plus one inclusion proof per transaction,
//! which is what the ledger persists as a block.
//!
//! Strategies are selected through [`StrategySet`], which maps every
//! [`SealMode`](shadow_types::SealMode) to exactly one implementation.

pub mod config;
pub mod error;
pub mod merkle;
pub mod multisig;
pub mod simple;
pub mod strategy;
pub mod tsa;
pub mod zkp;

pub use config::StrategyConfig;
pub use error::{SealError, SealResult};
pub use merkle::MerkleStrategy;
pub use multisig::{Attestation, MultiSignatureStrategy};
pub use simple::SimpleStrategy;
pub use strategy::{seal_batch, BatchSeal, SealedEntry, SealingStrategy, StrategySet};
pub use tsa::TimestampAuthorityStrategy;
pub use zkp::{verify_opening, CommitmentOpening, CommitmentStrategy};
