use serde::{Deserialize, Serialize};
use shadow_types::{Digest, ProofStep, Side};

/// Errors from Merkle tree construction and proof generation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a Merkle tree from an empty batch")]
    EmptyBatch,

    #[error("leaf index {index} out of range for {leaf_count} leaves")]
    IndexOutOfRange { index: usize, leaf_count: usize },
}

/// Binary Merkle tree over a batch of leaf digests.
///
/// Levels are stored bottom-up: `levels[0]` holds the leaves and the last
/// level holds only the root. An odd node at any level is paired with itself.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    root: Digest,
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree from leaf digests in order.
    ///
    /// A single leaf is its own root.
    pub fn from_leaves(leaves: Vec<Digest>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyBatch);
        }

        let mut levels = vec![leaves];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() == 1 {
                break;
            }
            let next: Vec<Digest> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => combine(left, right),
                    [only] => combine(only, only),
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
            levels.push(next);
        }

        let root = levels[levels.len() - 1][0];
        Ok(Self { root, levels })
    }

    pub fn root(&self) -> Digest {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn leaves(&self) -> &[Digest] {
        &self.levels[0]
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        let leaf_count = self.leaf_count();
        if index >= leaf_count {
            return Err(MerkleError::IndexOutOfRange { index, leaf_count });
        }

        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling_idx, side) = if idx % 2 == 0 {
                (idx + 1, Side::Right)
            } else {
                (idx - 1, Side::Left)
            };
            let sibling = level.get(sibling_idx).copied().unwrap_or(level[idx]);
            path.push(ProofStep { sibling, side });
            idx /= 2;
        }

        Ok(MerkleProof {
            leaf: self.levels[0][index],
            path,
            root: self.root,
        })
    }
}

/// Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Digest,
    /// Sibling hashes from leaf to root, each tagged with its side.
    pub path: Vec<ProofStep>,
    pub root: Digest,
}

impl MerkleProof {
    /// Recompute the root from the leaf and path.
    pub fn verify(&self) -> bool {
        verify_inclusion(&self.leaf, &self.path, &self.root)
    }
}

/// Fold `path` over `leaf` and compare with `root`.
pub fn verify_inclusion(leaf: &Digest, path: &[ProofStep], root: &Digest) -> bool {
    compute_root(leaf, path) == *root
}

/// Root implied by `leaf` and `path`.
pub fn compute_root(leaf: &Digest, path: &[ProofStep]) -> Digest {
    path.iter().fold(*leaf, |current, step| match step.side {
        Side::Left => combine(&step.sibling, &current),
        Side::Right => combine(&current, &step.sibling),
    })
}

/// Parent of two adjacent nodes. Order matters: `combine(a, b) != combine(b, a)`.
pub fn combine(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"shadow-merkle-v1:");
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Digest::from_hash(*hasher.finalize().as_bytes())
}
