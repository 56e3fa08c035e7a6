use mintgate_hash::{node_digest, Digest, ZERO_DIGEST};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Merkle tree over a set of leaf digests.
///
/// Leaves are stored in canonical ascending byte order, so the root commits
/// to the set of leaves and not to any particular input order. Inner nodes
/// hash their children as a sorted pair; a trailing node without a sibling is
/// promoted to the next layer unhashed. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MerkleTree {
    layers: Vec<Vec<Digest>>,
}

impl MerkleTree {
    pub fn build(leaves: &[Digest]) -> Self {
        let mut base = leaves.to_vec();
        base.par_sort_unstable();

        let mut layers = vec![base];
        while layers.last().map_or(false, |l| l.len() > 1) {
            let prev = layers.last().expect("non-empty layer stack");
            let mut next = Vec::with_capacity((prev.len() + 1) / 2);
            for pair in prev.chunks(2) {
                next.push(match pair {
                    [a, b] => node_digest(a, b),
                    [last] => *last,
                    _ => unreachable!("chunks(2) yields 1 or 2 elements"),
                });
            }
            layers.push(next);
        }
        Self { layers }
    }

    /// Apex digest; `ZERO_DIGEST` for a tree built over no leaves.
    pub fn root(&self) -> Digest {
        self.layers
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or(ZERO_DIGEST)
    }

    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// Sibling path from `leaf` to the root, or `None` when the leaf is not
    /// part of the tree. Absence is a sentinel, not an error.
    pub fn proof(&self, leaf: &Digest) -> Option<Vec<Digest>> {
        let mut idx = self.layers[0].binary_search(leaf).ok()?;
        let mut path = Vec::with_capacity(self.layers.len());
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = idx ^ 1;
            if sibling < layer.len() {
                path.push(layer[sibling]);
            }
            idx >>= 1;
        }
        Some(path)
    }

    /// Fold `leaf` through `path` with sorted-pair hashing and compare the
    /// result to `root`. Stateless; mirrors the on-chain verifier.
    pub fn verify(root: &Digest, leaf: &Digest, path: &[Digest]) -> bool {
        let mut acc = *leaf;
        for sibling in path {
            acc = node_digest(&acc, sibling);
        }
        acc == *root
    }
}
