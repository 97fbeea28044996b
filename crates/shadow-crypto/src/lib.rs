//! Cryptographic primitives for the Shadow Ledger.
//!
//! Provides domain-separated BLAKE3 hashing, binary Merkle trees with
//! inclusion proofs, Ed25519 signing, and block hash-chain link checks.
//!
//! All crypto operations wrap established libraries. Nothing here is a
//! custom primitive.

pub mod chain;
pub mod hasher;
pub mod merkle;
pub mod signer;

pub use chain::{ChainError, HashChainVerifier};
pub use hasher::{ContentHasher, HasherError};
pub use merkle::{combine, compute_root, verify_inclusion, MerkleError, MerkleProof, MerkleTree};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
