//! Persistence for the Shadow Ledger.
//!
//! The [`AuditStore`] trait is the seam between the ledger and durable
//! storage. Every commit writes one block together with all of its
//! witnesses, and is rejected unless the block extends the current tip.
//!
//! Two backends are provided:
//!
//! - [`InMemoryAuditStore`] for tests and embedding
//! - [`FileAuditStore`], an append-only file of length- and CRC-framed
//!   JSON commit records

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileAuditStore;
pub use memory::InMemoryAuditStore;
pub use traits::AuditStore;
