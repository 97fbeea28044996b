use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shadow_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use shadow_types::{Digest, SealMode, TransactionEvent, TransactionId, WitnessToken};

use crate::error::{SealError, SealResult};
use crate::strategy::SealingStrategy;

/// One signer's approval of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Hex-encoded verifying key of the signer.
    pub signer: String,
    pub signature: Signature,
}

/// k-of-n approval sealing.
///
/// The first `threshold` configured signers each sign the same payload. The
/// token is the JSON list of attestations.
pub struct MultiSignatureStrategy {
    signers: Vec<SigningKey>,
    threshold: usize,
}

impl MultiSignatureStrategy {
    pub fn new(signers: Vec<SigningKey>, threshold: usize) -> SealResult<Self> {
        if threshold == 0 || threshold > signers.len() {
            return Err(SealError::Config(format!(
                "multisig threshold {threshold} must be between 1 and {}",
                signers.len()
            )));
        }
        Ok(Self::from_parts(signers, threshold))
    }

    pub(crate) fn from_parts(signers: Vec<SigningKey>, threshold: usize) -> Self {
        Self { signers, threshold }
    }

    /// A strategy with no signers. Refuses to seal.
    pub fn unconfigured() -> Self {
        Self {
            signers: Vec::new(),
            threshold: 0,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Payload every signer signs.
    pub fn message(content_hash: &Digest, transaction_id: &TransactionId) -> Digest {
        ContentHasher::ATTESTATION
            .hash_parts(&[content_hash.as_bytes(), transaction_id.as_str().as_bytes()])
    }

    fn find_signer(&self, signer: &str) -> Option<VerifyingKey> {
        self.signers
            .iter()
            .map(SigningKey::verifying_key)
            .find(|vk| vk.to_hex() == signer)
    }
}

impl SealingStrategy for MultiSignatureStrategy {
    fn mode(&self) -> SealMode {
        SealMode::MultiSignature
    }

    fn ensure_ready(&self) -> SealResult<()> {
        if self.threshold == 0 || self.signers.len() < self.threshold {
            return Err(SealError::key_unavailable(
                self.mode(),
                format!(
                    "{} signers configured, {} required",
                    self.signers.len(),
                    self.threshold.max(1)
                ),
            ));
        }
        Ok(())
    }

    fn process_transaction(
        &self,
        event: &TransactionEvent,
        _sealed_at: DateTime<Utc>,
    ) -> SealResult<WitnessToken> {
        self.ensure_ready()?;
        let message = Self::message(&event.content_hash(), &event.id);
        let attestations: Vec<Attestation> = self.signers[..self.threshold]
            .iter()
            .map(|key| Attestation {
                signer: key.verifying_key().to_hex(),
                signature: key.sign(message.as_bytes()),
            })
            .collect();
        let signer_ids: Vec<String> = self
            .signers
            .iter()
            .take(self.threshold)
            .map(|key| key.verifying_key().fingerprint())
            .collect();
        let token =
            serde_json::to_string(&attestations).map_err(|e| SealError::Signing(e.to_string()))?;

        Ok(WitnessToken::new(event.id.clone(), token, self.mode())
            .with_meta("threshold", self.threshold)
            .with_meta("signers", self.signers.len())
            .with_meta("signer_ids", signer_ids))
    }

    fn verify_token(
        &self,
        content_hash: &Digest,
        token: &WitnessToken,
        _root: &Digest,
    ) -> SealResult<()> {
        self.ensure_ready()?;
        let invalid = |reason: String| SealError::invalid_token(self.mode(), &token.transaction_id, reason);

        let attestations: Vec<Attestation> = serde_json::from_str(&token.token)
            .map_err(|e| invalid(format!("malformed attestation list: {e}")))?;
        let message = Self::message(content_hash, &token.transaction_id);

        let mut seen = HashSet::new();
        for attestation in &attestations {
            if !seen.insert(attestation.signer.as_str()) {
                return Err(invalid(format!("duplicate signer {}", attestation.signer)));
            }
            let key = self
                .find_signer(&attestation.signer)
                .ok_or_else(|| invalid(format!("unknown signer {}", attestation.signer)))?;
            key.verify(message.as_bytes(), &attestation.signature)
                .map_err(|_| invalid(format!("bad signature from {}", key.fingerprint())))?;
        }

        if seen.len() < self.threshold {
            return Err(invalid(format!(
                "quorum not met: {} of {}",
                seen.len(),
                self.threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy(n: usize, k: usize) -> MultiSignatureStrategy {
        MultiSignatureStrategy::new((0..n).map(|_| SigningKey::generate()).collect(), k).unwrap()
    }

    fn event() -> TransactionEvent {
        TransactionEvent::new("tx-ms", "treasury", "vendor", 2_500_000, Utc::now()).unwrap()
    }

    #[test]
    fn collects_threshold_signatures() {
        let s = strategy(3, 2);
        let e = event();
        let token = s.process_transaction(&e, Utc::now()).unwrap();
        let attestations: Vec<Attestation> = serde_json::from_str(&token.token).unwrap();
        assert_eq!(attestations.len(), 2);
        assert_eq!(token.metadata["threshold"], serde_json::json!(2));
        s.verify_token(&e.content_hash(), &token, &Digest::null()).unwrap();
    }

    #[test]
    fn rejects_below_quorum() {
        let s = strategy(3, 2);
        let e = event();
        let mut token = s.process_transaction(&e, Utc::now()).unwrap();
        let mut attestations: Vec<Attestation> = serde_json::from_str(&token.token).unwrap();
        attestations.pop();
        token.token = serde_json::to_string(&attestations).unwrap();
        let err = s
            .verify_token(&e.content_hash(), &token, &Digest::null())
            .unwrap_err();
        assert!(err.to_string().contains("quorum"));
    }

    #[test]
    fn rejects_duplicated_signer() {
        let s = strategy(3, 2);
        let e = event();
        let mut token = s.process_transaction(&e, Utc::now()).unwrap();
        let attestations: Vec<Attestation> = serde_json::from_str(&token.token).unwrap();
        let doubled = vec![attestations[0].clone(), attestations[0].clone()];
        token.token = serde_json::to_string(&doubled).unwrap();
        assert!(s
            .verify_token(&e.content_hash(), &token, &Digest::null())
            .is_err());
    }

    #[test]
    fn rejects_signature_over_other_content() {
        let s = strategy(2, 2);
        let e = event();
        let token = s.process_transaction(&e, Utc::now()).unwrap();
        assert!(s
            .verify_token(&Digest::derive("x", b"other"), &token, &Digest::null())
            .is_err());
    }

    #[test]
    fn invalid_threshold_is_a_config_error() {
        let signers = vec![SigningKey::generate()];
        assert!(matches!(
            MultiSignatureStrategy::new(signers, 2),
            Err(SealError::Config(_))
        ));
    }

    #[test]
    fn unconfigured_is_not_ready() {
        assert!(matches!(
            MultiSignatureStrategy::unconfigured().ensure_ready(),
            Err(SealError::KeyUnavailable { .. })
        ));
    }
}
