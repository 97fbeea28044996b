use shadow_types::transaction::TRANSACTION_DOMAIN;
use shadow_types::Digest;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag that is prepended to every hash
/// computation, so a batch leaf and a commitment over identical bytes hash
/// differently.
#[derive(Clone, Copy, Debug)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for transaction content.
    pub const TRANSACTION: Self = Self {
        domain: TRANSACTION_DOMAIN,
    };
    /// Hasher for batch leaves that bind a content hash to a witness token.
    pub const LEAF: Self = Self {
        domain: "shadow-leaf-v1",
    };
    /// Hasher for amount commitments.
    pub const COMMITMENT: Self = Self {
        domain: "shadow-commit-v1",
    };
    /// Hasher for the message a timestamp authority signs.
    pub const TIMESTAMP: Self = Self {
        domain: "shadow-tsa-v1",
    };
    /// Hasher for the message multi-signature signers sign.
    pub const ATTESTATION: Self = Self {
        domain: "shadow-attest-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        Digest::derive(self.domain, data)
    }

    /// Hash the concatenation of several byte slices.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<Digest, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
