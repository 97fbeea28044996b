use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::Digest;
use crate::error::TypeError;

/// Domain tag for transaction content hashes.
pub const TRANSACTION_DOMAIN: &str = "shadow-tx-v1";

/// Maximum length of an identifier or account field, in bytes.
pub const MAX_FIELD_LEN: usize = 128;

/// Identifier of a captured transaction.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create from an existing string. Validation happens on the owning event.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new time-ordered identifier (UUID v7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An immutable captured transaction.
///
/// Amounts are unsigned minor currency units, so negative amounts are
/// unrepresentable. The content hash covers every field through
/// [`TransactionEvent::canonical_bytes`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub id: TransactionId,
    pub from_account: String,
    pub to_account: String,
    pub amount: u64,
    pub timestamp: DateTime<Utc>,
}

impl TransactionEvent {
    /// Build and validate a new event.
    pub fn new(
        id: impl Into<TransactionId>,
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, TypeError> {
        let event = Self {
            id: id.into(),
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            timestamp,
        };
        event.validate()?;
        Ok(event)
    }

    /// Check structural well-formedness.
    ///
    /// Identifiers and accounts must be non-empty, at most [`MAX_FIELD_LEN`]
    /// bytes, free of control characters and of the `|` field separator used
    /// by the canonical encoding. Sender and recipient must differ.
    pub fn validate(&self) -> Result<(), TypeError> {
        check_field("id", self.id.as_str())?;
        check_field("from_account", &self.from_account)?;
        check_field("to_account", &self.to_account)?;
        if self.from_account == self.to_account {
            return Err(TypeError::validation(
                "to_account",
                "sender and recipient must differ",
            ));
        }
        Ok(())
    }

    /// Deterministic byte encoding of every field.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        format!(
            "id={}|from={}|to={}|amount={}|ts={}",
            self.id,
            self.from_account,
            self.to_account,
            self.amount,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        )
        .into_bytes()
    }

    /// Domain-separated digest over [`canonical_bytes`](Self::canonical_bytes).
    pub fn content_hash(&self) -> Digest {
        Digest::derive(TRANSACTION_DOMAIN, &self.canonical_bytes())
    }
}

fn check_field(field: &'static str, value: &str) -> Result<(), TypeError> {
    if value.trim().is_empty() {
        return Err(TypeError::validation(field, "must not be empty"));
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(TypeError::validation(
            field,
            format!("exceeds {MAX_FIELD_LEN} bytes"),
        ));
    }
    if value.chars().any(|c| c == '|' || c.is_control()) {
        return Err(TypeError::validation(
            field,
            "contains a separator or control character",
        ));
    }
    Ok(())
}
