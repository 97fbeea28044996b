use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::transaction::TransactionId;

/// Sealing strategy a transaction is committed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SealMode {
    /// Batched Merkle inclusion only.
    Merkle,
    /// Signed timestamp from a trusted authority.
    TimestampAuthority,
    /// Threshold of independent signatures.
    MultiSignature,
    /// Hiding commitment over the amount.
    ZeroKnowledge,
    /// Fast path for low-risk traffic.
    Simple,
}

impl SealMode {
    pub const ALL: [SealMode; 5] = [
        SealMode::Merkle,
        SealMode::TimestampAuthority,
        SealMode::MultiSignature,
        SealMode::ZeroKnowledge,
        SealMode::Simple,
    ];

    /// Stable strategy name recorded in witness tokens.
    pub fn strategy_name(self) -> &'static str {
        match self {
            SealMode::Merkle => "MERKLE",
            SealMode::TimestampAuthority => "TSA",
            SealMode::MultiSignature => "MULTI_SIG",
            SealMode::ZeroKnowledge => "ZKP_COMMITMENT",
            SealMode::Simple => "SIMPLE",
        }
    }
}

impl fmt::Display for SealMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.strategy_name())
    }
}

impl FromStr for SealMode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merkle" => Ok(SealMode::Merkle),
            "tsa" | "timestamp_authority" => Ok(SealMode::TimestampAuthority),
            "multi_sig" | "multisig" | "multi_signature" => Ok(SealMode::MultiSignature),
            "zkp" | "zkp_commitment" | "zero_knowledge" => Ok(SealMode::ZeroKnowledge),
            "simple" => Ok(SealMode::Simple),
            _ => Err(TypeError::UnknownSealMode(s.to_string())),
        }
    }
}

/// Opaque proof produced by a sealing strategy for one transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WitnessToken {
    pub transaction_id: TransactionId,
    /// Strategy-specific proof value, usually hex.
    pub token: String,
    pub strategy_name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl WitnessToken {
    pub fn new(transaction_id: TransactionId, token: impl Into<String>, mode: SealMode) -> Self {
        Self {
            transaction_id,
            token: token.into(),
            strategy_name: mode.strategy_name().to_string(),
            metadata: BTreeMap::new(),
        }
    }

    /// Builder-style metadata insert.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// Bytes bound into the batch leaf for per-transaction strategies.
    pub fn binding_bytes(&self) -> Vec<u8> {
        format!("{}|{}", self.strategy_name, self.token).into_bytes()
    }
}
