//! High-level SDK for the Shadow Ledger.
//!
//! [`AuditService`] is the entry point for applications: it scores each
//! payment through the risk gateway, applies the policy engine, and submits
//! accepted payments to the audit ledger. [`ShadowConfig`] wires every
//! subsystem from a single TOML file.

pub mod accounts;
pub mod config;
pub mod error;
pub mod request;
pub mod service;

pub use accounts::AccountsConfig;
pub use config::{ShadowConfig, StorageConfig};
pub use error::{SdkError, SdkResult};
pub use request::{PaymentOutcome, PaymentRequest};
pub use service::AuditService;

// Re-export key types
pub use shadow_ledger::{SubmitAck, SubmitStatus, ValidationReport, VerificationResult, Violation};
pub use shadow_policy::{BlockReason, TransactionFlags};
pub use shadow_risk::{RiskAssessment, RiskGateway};
pub use shadow_types::{AuditBlock, SealMode, TransactionId};
