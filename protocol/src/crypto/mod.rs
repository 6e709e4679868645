//! # Cryptographic Primitives
//!
//! Hashing, secp256k1 keys and recoverable ECDSA. Everything here wraps
//! `k256`, `sha2` and `ripemd`; no curve arithmetic lives in this crate.

pub mod hash;
pub mod keys;
pub mod signatures;

use thiserror::Error;

pub use hash::{double_sha256, hash160, sha256, sha512_256};
pub use keys::{Secp256k1PrivateKey, Secp256k1PublicKey};
pub use signatures::{recover_public_key, rsv_to_vrs, verify, vrs_to_rsv};

/// Failures from key parsing, signing and verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid public key length: {0} bytes")]
    InvalidPublicKeyLength(usize),

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("invalid private key length: {0} bytes")]
    InvalidPrivateKeyLength(usize),

    #[error("invalid signature length: {0} bytes")]
    InvalidSignatureLength(usize),

    #[error("malformed signature")]
    MalformedSignature,

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("recovery id does not match public key")]
    RecoveryMismatch,

    #[error("signing failed")]
    SigningFailed,
}
