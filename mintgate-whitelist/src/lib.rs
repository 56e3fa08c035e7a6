use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use mintgate_hash::{entry_digest, Digest, ADDRESS_LEN};
use mintgate_merkle::MerkleTree;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-width account identifier, rendered as 0x-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = WhitelistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| WhitelistError::BadAddress(s.to_string()))?;
        let raw: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| WhitelistError::BadAddress(s.to_string()))?;
        Ok(Address(raw))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WhitelistError {
    #[error("addresses and allowances differ in length ({addresses} vs {allowances})")]
    LengthMismatch { addresses: usize, allowances: usize },
    #[error("duplicate address {0}")]
    DuplicateAddress(Address),
    #[error("zero allowance for {0}")]
    ZeroAllowance(Address),
    #[error("malformed address {0:?}")]
    BadAddress(String),
}

/// Validated whitelist snapshot: each address maps to a positive mint
/// allowance. Construction fails fast on malformed input instead of
/// committing to a wrong tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    entries: BTreeMap<Address, u64>,
}

impl Whitelist {
    /// Build from the two parallel sequences the snapshot format carries.
    pub fn from_pairs(addresses: &[Address], allowances: &[u64]) -> Result<Self, WhitelistError> {
        if addresses.len() != allowances.len() {
            return Err(WhitelistError::LengthMismatch {
                addresses: addresses.len(),
                allowances: allowances.len(),
            });
        }
        let mut entries = BTreeMap::new();
        for (addr, &allowance) in addresses.iter().zip(allowances) {
            if allowance == 0 {
                return Err(WhitelistError::ZeroAllowance(*addr));
            }
            if entries.insert(*addr, allowance).is_some() {
                return Err(WhitelistError::DuplicateAddress(*addr));
            }
        }
        Ok(Self { entries })
    }

    pub fn allowance(&self, addr: &Address) -> Option<u64> {
        self.entries.get(addr).copied()
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.entries.contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, u64)> {
        self.entries.iter().map(|(a, &n)| (a, n))
    }
}

/// Inclusion proof for one whitelist entry: the entry's leaf digest and the
/// sibling path to the root it was generated for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipProof {
    pub leaf: Digest,
    pub path: Vec<Digest>,
}

impl MembershipProof {
    /// Check that this proof grants `claimed_allowance` to `addr` under
    /// `root`. The leaf must be the digest of exactly that (address,
    /// allowance) pair; a proof never transfers to another allowance value.
    pub fn verify(&self, root: &Digest, addr: &Address, claimed_allowance: u64) -> bool {
        self.leaf == entry_digest(&addr.0, claimed_allowance)
            && MerkleTree::verify(root, &self.leaf, &self.path)
    }
}

/// One whitelist snapshot committed to a single root. Immutable; a changed
/// snapshot means a fresh `Commitment` and a republished root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Commitment {
    leaves: BTreeMap<Address, Digest>,
    tree: MerkleTree,
}

impl Commitment {
    pub fn build(whitelist: &Whitelist) -> Self {
        let leaves: BTreeMap<Address, Digest> = whitelist
            .iter()
            .map(|(addr, allowance)| (*addr, entry_digest(&addr.0, allowance)))
            .collect();
        let tree = MerkleTree::build(&leaves.values().copied().collect::<Vec<_>>());
        Self { leaves, tree }
    }

    pub fn root(&self) -> Digest {
        self.tree.root()
    }

    pub fn leaf(&self, addr: &Address) -> Option<Digest> {
        self.leaves.get(addr).copied()
    }

    /// Leaf and sibling path for `addr`, or `None` when the address is not
    /// whitelisted. Callers branch on the sentinel; absence is not an error.
    pub fn membership(&self, addr: &Address) -> Option<MembershipProof> {
        let leaf = self.leaf(addr)?;
        let path = self.tree.proof(&leaf)?;
        Some(MembershipProof { leaf, path })
    }
}

/// Everything an operator distributes after a snapshot is committed: the
/// root to publish on chain and one proof per member.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofBundle {
    pub root: Digest,
    pub entries: Vec<BundleEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BundleEntry {
    pub address: Address,
    pub allowance: u64,
    pub proof: MembershipProof,
}

impl ProofBundle {
    pub fn build(whitelist: &Whitelist, commitment: &Commitment) -> Self {
        let root = commitment.root();
        let entries = whitelist
            .iter()
            .filter_map(|(addr, allowance)| {
                commitment.membership(addr).map(|proof| BundleEntry {
                    address: *addr,
                    allowance,
                    proof,
                })
            })
            .collect();
        Self { root, entries }
    }

    pub fn entry(&self, addr: &Address) -> Option<&BundleEntry> {
        self.entries.iter().find(|e| e.address == *addr)
    }
}
