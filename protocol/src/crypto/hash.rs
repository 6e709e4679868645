//! # Hashing Utilities
//!
//! The four digests the Stacks wire format needs:
//!
//! - **SHA-256** for Bitcoin-style checksums and SIP-018 structured data.
//! - **double SHA-256** for c32check and base58check checksums.
//! - **SHA-512/256** for transaction ids and signature-hash chaining.
//! - **HASH160** (`RIPEMD-160(SHA-256(x))`) for public-key hashes inside
//!   addresses and spending conditions.
//!
//! Everything returns fixed-size arrays. Callers that need a `Vec` can
//! call `.to_vec()`.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512_256};

/// SHA-256 of `data`.
///
/// # Example
///
/// ```
/// use stacks_rosetta::crypto::sha256;
///
/// let digest = sha256(b"stacks");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `SHA-256(SHA-256(data))`.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// SHA-512/256 of `data`, the truncated SHA-512 variant with its own IV.
/// Not the same as the first 32 bytes of SHA-512.
pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-512/256 over several slices without concatenating them first.
pub fn sha512_256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// `RIPEMD-160(SHA-256(data))`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256(data));
    hasher.finalize().into()
}
