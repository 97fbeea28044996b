use serde::{Deserialize, Serialize};
use shadow_crypto::SigningKey;

use crate::error::{SealError, SealResult};

/// Key material for the signing strategies.
///
/// Keys are hex-encoded 32-byte Ed25519 seeds. Absent keys leave the
/// corresponding strategy unconfigured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Timestamp authority signing seed.
    pub tsa_authority_key: Option<String>,
    /// Multi-signature signer seeds.
    pub multisig_signer_keys: Vec<String>,
    /// Number of signatures required per transaction.
    pub multisig_threshold: usize,
}

impl StrategyConfig {
    /// Fresh random key material: one authority and `signers` signers.
    pub fn generate(signers: usize, threshold: usize) -> Self {
        Self {
            tsa_authority_key: Some(SigningKey::generate().to_hex()),
            multisig_signer_keys: (0..signers).map(|_| SigningKey::generate().to_hex()).collect(),
            multisig_threshold: threshold,
        }
    }

    pub fn validate(&self) -> SealResult<()> {
        let n = self.multisig_signer_keys.len();
        if n > 0 && (self.multisig_threshold == 0 || self.multisig_threshold > n) {
            return Err(SealError::Config(format!(
                "multisig threshold {} must be between 1 and {n}",
                self.multisig_threshold
            )));
        }
        Ok(())
    }

    pub(crate) fn tsa_key(&self) -> SealResult<Option<SigningKey>> {
        self.tsa_authority_key
            .as_deref()
            .map(|hex| {
                SigningKey::from_hex(hex)
                    .map_err(|e| SealError::Config(format!("tsa_authority_key: {e}")))
            })
            .transpose()
    }

    pub(crate) fn multisig_keys(&self) -> SealResult<Vec<SigningKey>> {
        self.multisig_signer_keys
            .iter()
            .enumerate()
            .map(|(i, hex)| {
                SigningKey::from_hex(hex)
                    .map_err(|e| SealError::Config(format!("multisig_signer_keys[{i}]: {e}")))
            })
            .collect()
    }
}
