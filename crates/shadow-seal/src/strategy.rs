use chrono::{DateTime, Utc};
use shadow_crypto::{ContentHasher, MerkleTree, SigningKey};
use shadow_types::{Digest, ProofStep, SealMode, TransactionEvent, TransactionId, WitnessToken};
use tracing::debug;

use crate::config::StrategyConfig;
use crate::error::SealResult;
use crate::merkle::MerkleStrategy;
use crate::multisig::MultiSignatureStrategy;
use crate::simple::SimpleStrategy;
use crate::tsa::TimestampAuthorityStrategy;
use crate::zkp::CommitmentStrategy;

// ---------------------------------------------------------------------------
// SealingStrategy
// ---------------------------------------------------------------------------

/// A way of turning a captured transaction into a witness token.
///
/// Implementations never mutate the event and never perform network I/O.
/// Apart from privacy blinding, the token structure is a deterministic
/// function of the event, the seal time, and the strategy's key material.
pub trait SealingStrategy: Send + Sync {
    /// The mode this strategy implements.
    fn mode(&self) -> SealMode;

    /// Fails with `KeyUnavailable` when the strategy cannot currently seal.
    fn ensure_ready(&self) -> SealResult<()> {
        Ok(())
    }

    /// Produce the witness token for one event.
    fn process_transaction(
        &self,
        event: &TransactionEvent,
        sealed_at: DateTime<Utc>,
    ) -> SealResult<WitnessToken>;

    /// Leaf committed to the batch tree for one sealed transaction.
    ///
    /// Binds the content hash to the token so that swapping a token breaks
    /// the inclusion proof.
    fn leaf(&self, content_hash: &Digest, token: &WitnessToken) -> Digest {
        ContentHasher::LEAF.hash_parts(&[content_hash.as_bytes(), &token.binding_bytes()])
    }

    /// Final adjustment of a token once the batch root is known.
    fn finish_token(&self, token: WitnessToken, _root: &Digest) -> WitnessToken {
        token
    }

    /// Re-check a stored token against its content hash and block root.
    fn verify_token(
        &self,
        content_hash: &Digest,
        token: &WitnessToken,
        root: &Digest,
    ) -> SealResult<()>;
}

// ---------------------------------------------------------------------------
// Batch sealing
// ---------------------------------------------------------------------------

/// One transaction's share of a sealed batch.
#[derive(Clone, Debug)]
pub struct SealedEntry {
    pub transaction_id: TransactionId,
    pub content_hash: Digest,
    pub leaf_index: u64,
    pub proof: Vec<ProofStep>,
    pub token: WitnessToken,
}

/// Result of sealing a batch: the root that becomes the block's seal value,
/// plus per-transaction entries in submission order.
#[derive(Clone, Debug)]
pub struct BatchSeal {
    pub mode: SealMode,
    pub root: Digest,
    pub entries: Vec<SealedEntry>,
}

/// Seal `events` in order under `strategy`.
///
/// Fails as a whole if any event cannot be sealed; no partial result is
/// returned.
pub fn seal_batch(
    strategy: &dyn SealingStrategy,
    events: &[TransactionEvent],
    sealed_at: DateTime<Utc>,
) -> SealResult<BatchSeal> {
    strategy.ensure_ready()?;

    let mut hashed = Vec::with_capacity(events.len());
    for event in events {
        let content_hash = event.content_hash();
        let token = strategy.process_transaction(event, sealed_at)?;
        hashed.push((event.id.clone(), content_hash, token));
    }

    let leaves = hashed
        .iter()
        .map(|(_, hash, token)| strategy.leaf(hash, token))
        .collect();
    let tree = MerkleTree::from_leaves(leaves)?;
    let root = tree.root();

    let mut entries = Vec::with_capacity(hashed.len());
    for (index, (transaction_id, content_hash, token)) in hashed.into_iter().enumerate() {
        let proof = tree.proof(index)?;
        entries.push(SealedEntry {
            transaction_id,
            content_hash,
            leaf_index: index as u64,
            proof: proof.path,
            token: strategy.finish_token(token, &root),
        });
    }

    debug!(
        mode = %strategy.mode(),
        batch = entries.len(),
        root = %root.short_hex(),
        "sealed batch"
    );

    Ok(BatchSeal {
        mode: strategy.mode(),
        root,
        entries,
    })
}

// ---------------------------------------------------------------------------
// StrategySet
// ---------------------------------------------------------------------------

/// Exactly one strategy per [`SealMode`].
pub struct StrategySet {
    merkle: MerkleStrategy,
    tsa: TimestampAuthorityStrategy,
    multisig: MultiSignatureStrategy,
    zkp: CommitmentStrategy,
    simple: SimpleStrategy,
}

impl StrategySet {
    pub fn new(tsa: TimestampAuthorityStrategy, multisig: MultiSignatureStrategy) -> Self {
        Self {
            merkle: MerkleStrategy,
            tsa,
            multisig,
            zkp: CommitmentStrategy,
            simple: SimpleStrategy,
        }
    }

    /// Build from configured key material.
    ///
    /// Missing keys leave the corresponding strategy unconfigured; it then
    /// refuses submissions through [`SealingStrategy::ensure_ready`].
    pub fn from_config(config: &StrategyConfig) -> SealResult<Self> {
        config.validate()?;
        let tsa = match config.tsa_key()? {
            Some(key) => TimestampAuthorityStrategy::new(key),
            None => TimestampAuthorityStrategy::unconfigured(),
        };
        let signers = config.multisig_keys()?;
        let multisig = if signers.is_empty() {
            MultiSignatureStrategy::unconfigured()
        } else {
            MultiSignatureStrategy::new(signers, config.multisig_threshold)?
        };
        Ok(Self::new(tsa, multisig))
    }

    /// A set with freshly generated keys: one authority, 2-of-3 signers.
    pub fn ephemeral() -> Self {
        let signers = (0..3).map(|_| SigningKey::generate()).collect();
        Self::new(
            TimestampAuthorityStrategy::new(SigningKey::generate()),
            MultiSignatureStrategy::from_parts(signers, 2),
        )
    }

    pub fn get(&self, mode: SealMode) -> &dyn SealingStrategy {
        match mode {
            SealMode::Merkle => &self.merkle,
            SealMode::TimestampAuthority => &self.tsa,
            SealMode::MultiSignature => &self.multisig,
            SealMode::ZeroKnowledge => &self.zkp,
            SealMode::Simple => &self.simple,
        }
    }
}

impl std::fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategySet")
            .field("tsa_ready", &self.tsa.ensure_ready().is_ok())
            .field("multisig_ready", &self.multisig.ensure_ready().is_ok())
            .finish()
    }
}
