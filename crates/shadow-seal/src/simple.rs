use chrono::{DateTime, Utc};
use shadow_types::{Digest, SealMode, TransactionEvent, WitnessToken};

use crate::error::{SealError, SealResult};
use crate::strategy::SealingStrategy;

const PREFIX: &str = "SIMPLE_";

/// Structural placeholder for low-risk traffic. Carries no signature.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleStrategy;

fn token_for(content_hash: &Digest) -> String {
    format!("{PREFIX}{}", &content_hash.to_hex()[..16])
}

impl SealingStrategy for SimpleStrategy {
    fn mode(&self) -> SealMode {
        SealMode::Simple
    }

    fn process_transaction(
        &self,
        event: &TransactionEvent,
        _sealed_at: DateTime<Utc>,
    ) -> SealResult<WitnessToken> {
        Ok(WitnessToken::new(
            event.id.clone(),
            token_for(&event.content_hash()),
            self.mode(),
        ))
    }

    fn verify_token(
        &self,
        content_hash: &Digest,
        token: &WitnessToken,
        _root: &Digest,
    ) -> SealResult<()> {
        if token.token != token_for(content_hash) {
            return Err(SealError::invalid_token(
                self.mode(),
                &token.transaction_id,
                "token does not match content hash",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_prefixed_hash() {
        let event = TransactionEvent::new("tx", "a", "b", 1, Utc::now()).unwrap();
        let token = SimpleStrategy.process_transaction(&event, Utc::now()).unwrap();
        assert!(token.token.starts_with("SIMPLE_"));
        assert_eq!(token.token.len(), PREFIX.len() + 16);
        let root = Digest::null();
        assert!(SimpleStrategy
            .verify_token(&event.content_hash(), &token, &root)
            .is_ok());
        assert!(SimpleStrategy
            .verify_token(&Digest::derive("x", b"y"), &token, &root)
            .is_err());
    }
}
