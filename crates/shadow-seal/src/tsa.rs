use chrono::{DateTime, SecondsFormat, Utc};
use shadow_crypto::{ContentHasher, Signature, SigningKey};
use shadow_types::{Digest, SealMode, TransactionEvent, WitnessToken};
use tracing::debug;

use crate::error::{SealError, SealResult};
use crate::strategy::SealingStrategy;

const META_AUTHORITY: &str = "authority";
const META_CAPTURED_AT: &str = "captured_at";
const META_SEALED_AT: &str = "sealed_at";

/// Signed-timestamp sealing by a long-lived authority key.
///
/// The authority signs the content hash together with the capture time and
/// the seal time. Both times are recorded in the token metadata so the
/// signature can be re-checked later.
pub struct TimestampAuthorityStrategy {
    authority: Option<SigningKey>,
}

impl TimestampAuthorityStrategy {
    pub fn new(authority: SigningKey) -> Self {
        Self {
            authority: Some(authority),
        }
    }

    /// A strategy with no authority key. Refuses to seal.
    pub fn unconfigured() -> Self {
        Self { authority: None }
    }

    fn key(&self) -> SealResult<&SigningKey> {
        self.authority
            .as_ref()
            .ok_or_else(|| SealError::key_unavailable(self.mode(), "no authority key configured"))
    }

    /// Message the authority signs.
    pub fn message(content_hash: &Digest, captured_at: &str, sealed_at: &str) -> Digest {
        ContentHasher::TIMESTAMP.hash_parts(&[
            content_hash.as_bytes(),
            captured_at.as_bytes(),
            sealed_at.as_bytes(),
        ])
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl SealingStrategy for TimestampAuthorityStrategy {
    fn mode(&self) -> SealMode {
        SealMode::TimestampAuthority
    }

    fn ensure_ready(&self) -> SealResult<()> {
        self.key().map(|_| ())
    }

    fn process_transaction(
        &self,
        event: &TransactionEvent,
        sealed_at: DateTime<Utc>,
    ) -> SealResult<WitnessToken> {
        let key = self.key()?;
        let captured_at = rfc3339(event.timestamp);
        let sealed_at = rfc3339(sealed_at);
        let message = Self::message(&event.content_hash(), &captured_at, &sealed_at);
        let signature = key.sign(message.as_bytes());
        debug!(tx = %event.id, "timestamp authority signed");

        Ok(
            WitnessToken::new(event.id.clone(), signature.to_hex(), self.mode())
                .with_meta(META_AUTHORITY, key.verifying_key().to_hex())
                .with_meta(META_CAPTURED_AT, captured_at)
                .with_meta(META_SEALED_AT, sealed_at),
        )
    }

    fn verify_token(
        &self,
        content_hash: &Digest,
        token: &WitnessToken,
        _root: &Digest,
    ) -> SealResult<()> {
        let invalid = |reason: &str| SealError::invalid_token(self.mode(), &token.transaction_id, reason);
        let authority = self.key()?.verifying_key();

        if token.meta_str(META_AUTHORITY) != Some(authority.to_hex().as_str()) {
            return Err(invalid("signed by an unknown authority"));
        }
        let captured_at = token
            .meta_str(META_CAPTURED_AT)
            .ok_or_else(|| invalid("missing capture time"))?;
        let sealed_at = token
            .meta_str(META_SEALED_AT)
            .ok_or_else(|| invalid("missing seal time"))?;
        let signature =
            Signature::from_hex(&token.token).map_err(|_| invalid("malformed signature"))?;

        let message = Self::message(content_hash, captured_at, sealed_at);
        authority
            .verify(message.as_bytes(), &signature)
            .map_err(|_| invalid("signature does not verify"))
    }
}
