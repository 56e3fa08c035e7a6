use sha3::{Digest as _, Keccak256};

pub const DIGEST_LEN: usize = 32; // Keccak-256 output
pub const ADDRESS_LEN: usize = 20;
pub const WORD_LEN: usize = 32; // packed uint256 width

pub type Digest = [u8; DIGEST_LEN];

pub const ZERO_DIGEST: Digest = [0u8; DIGEST_LEN];

#[inline]
pub fn keccak256(data: &[u8]) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest of a whitelist entry: `keccak256(address ++ allowance)` with the
/// allowance right-aligned in a 32-byte big-endian word. Byte-compatible with
/// the packed `keccak256(address, uint256)` leaves published on chain.
#[inline]
pub fn entry_digest(address: &[u8; ADDRESS_LEN], allowance: u64) -> Digest {
    let mut buf = [0u8; ADDRESS_LEN + WORD_LEN];
    buf[..ADDRESS_LEN].copy_from_slice(address);
    buf[ADDRESS_LEN + WORD_LEN - 8..].copy_from_slice(&allowance.to_be_bytes());
    keccak256(&buf)
}

/// Combine two child digests into their parent. The pair is sorted before
/// concatenation, so the result does not depend on left/right orientation.
#[inline]
pub fn node_digest(a: &Digest, b: &Digest) -> Digest {
    let mut buf = [0u8; 2 * DIGEST_LEN];
    if a <= b {
        buf[..DIGEST_LEN].copy_from_slice(a);
        buf[DIGEST_LEN..].copy_from_slice(b);
    } else {
        buf[..DIGEST_LEN].copy_from_slice(b);
        buf[DIGEST_LEN..].copy_from_slice(a);
    }
    keccak256(&buf)
}
