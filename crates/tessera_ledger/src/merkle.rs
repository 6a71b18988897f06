//! Deterministic binary Merkle tree over `(key, value)` records.
//!
//! Leaves are `SHA-256(key || SHA-256(value))` in ascending key order. Each
//! level pairs neighbours left to right; an odd node at the end of a level is
//! paired with itself.

use crate::{Hash, Key};
use sha2::{Digest, Sha256};

pub const ZERO_HASH: Hash = [0u8; 32];

pub fn leaf_hash(key: &Key, value: &[u8]) -> Hash {
    let value_hash: Hash = Sha256::digest(value).into();
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(value_hash);
    hasher.finalize().into()
}

fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn next_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| node_hash(&pair[0], pair.get(1).unwrap_or(&pair[0])))
        .collect()
}

/// Root over already-ordered leaves.
pub fn root_of(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return ZERO_HASH;
    }
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level[0]
}

/// One step of an inclusion proof: the sibling hash, and whether the sibling
/// sits on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: Hash,
    pub sibling_is_left: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub key: Key,
    pub leaf: Hash,
    pub path: Vec<ProofStep>,
    pub root: Hash,
}

impl MerkleProof {
    /// Build a proof for the leaf at `index` of `leaves`.
    pub fn build(key: Key, leaves: &[Hash], index: usize) -> Option<Self> {
        let leaf = *leaves.get(index)?;
        let mut path = Vec::new();
        let mut level = leaves.to_vec();
        let mut i = index;
        while level.len() > 1 {
            let sibling_index = if i % 2 == 0 { i + 1 } else { i - 1 };
            let sibling = level.get(sibling_index).copied().unwrap_or(level[i]);
            path.push(ProofStep {
                sibling,
                sibling_is_left: i % 2 == 1,
            });
            level = next_level(&level);
            i /= 2;
        }
        Some(Self {
            key,
            leaf,
            path,
            root: root_of(leaves),
        })
    }

    /// Recompute the root from the leaf and path and compare.
    pub fn verify(&self) -> bool {
        let computed = self.path.iter().fold(self.leaf, |acc, step| {
            if step.sibling_is_left {
                node_hash(&step.sibling, &acc)
            } else {
                node_hash(&acc, &step.sibling)
            }
        });
        computed == self.root
    }

    /// Verify and also check the leaf commits to `value`.
    pub fn verify_value(&self, value: &[u8]) -> bool {
        leaf_hash(&self.key, value) == self.leaf && self.verify()
    }
}
