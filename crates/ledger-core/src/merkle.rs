//! Merkle aggregation over transaction hashes (hex strings).
//!
//! Pairs are combined as `SHA256(left_hex ‖ right_hex)`; an odd node at the
//! end of a level is paired with itself.

use serde::{Deserialize, Serialize};

use crate::constants::ZERO_HASH;
use crate::sha256_hex;

fn combine(left: &str, right: &str) -> String {
    sha256_hex(&[left.as_bytes(), right.as_bytes()])
}

fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|pair| {
            let right = pair.get(1).unwrap_or(&pair[0]);
            combine(&pair[0], right)
        })
        .collect()
}

/// Merkle root of `hashes`; `"0"` for an empty list.
pub fn merkle_root<S: AsRef<str>>(hashes: &[S]) -> String {
    if hashes.is_empty() {
        return ZERO_HASH.to_string();
    }
    let mut level: Vec<String> = hashes.iter().map(|h| h.as_ref().to_string()).collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.swap_remove(0)
}

/// Full tree kept level by level (leaves first) so inclusion proofs can be cut.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub hash: String,
    /// Which side the sibling sits on when combining.
    pub side: Side,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: String,
    pub steps: Vec<ProofStep>,
}

impl MerkleProof {
    /// Fold the sibling path and compare against `root`.
    pub fn verify(&self, root: &str) -> bool {
        let computed = self.steps.iter().fold(self.leaf.clone(), |acc, step| match step.side {
            Side::Left => combine(&step.hash, &acc),
            Side::Right => combine(&acc, &step.hash),
        });
        computed == root
    }
}

impl MerkleTree {
    pub fn new<S: AsRef<str>>(leaves: &[S]) -> Self {
        if leaves.is_empty() {
            return Self { levels: vec![] };
        }
        let mut levels = vec![leaves.iter().map(|h| h.as_ref().to_string()).collect::<Vec<_>>()];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = next_level(current);
            levels.push(next);
        }
        Self { levels }
    }

    pub fn root(&self) -> String {
        self.levels
            .last()
            .and_then(|level| level.first())
            .cloned()
            .unwrap_or_else(|| ZERO_HASH.to_string())
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    /// Inclusion proof for the leaf at `index`, or `None` when out of range.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = self.levels.first()?.get(index)?.clone();
        let mut steps = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let step = if idx % 2 == 0 {
                // Odd tail pairs with itself.
                let sibling = level.get(idx + 1).unwrap_or(&level[idx]);
                ProofStep {
                    hash: sibling.clone(),
                    side: Side::Right,
                }
            } else {
                ProofStep {
                    hash: level[idx - 1].clone(),
                    side: Side::Left,
                }
            };
            steps.push(step);
            idx /= 2;
        }
        Some(MerkleProof { leaf, steps })
    }
}
