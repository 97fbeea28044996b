//! Risk-to-strategy policy for the Shadow Ledger.
//!
//! The [`PolicyEngine`] is a pure, total function from a risk score, an
//! amount, and a set of [`TransactionFlags`] to a [`PolicyDecision`]: either
//! block the payment or seal it under a particular
//! [`SealMode`](shadow_types::SealMode).
//!
//! Rules are evaluated in fixed priority order and the first match wins:
//!
//! 1. risk above the high cutoff, or a honeypot account → block
//! 2. privacy flag or the privacy marker amount → commitment
//! 3. risk above the medium cutoff or a large amount → multi-signature
//! 4. risk above the low cutoff → timestamp authority
//! 5. otherwise Merkle batching, or simple sealing when a bypass account
//!    pays no more than the small-amount limit

pub mod config;
pub mod engine;
pub mod error;

pub use config::PolicyThresholds;
pub use engine::{BlockReason, PolicyDecision, PolicyEngine, TransactionFlags};
pub use error::PolicyError;
