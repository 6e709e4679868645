//! Transaction errors and origin signature verification.
//!
//! [`verify_origin`] is what `/construction/combine` relies on before it
//! returns a signed transaction: the spliced signature must recover to a
//! key whose HASH160 is the origin signer. A signature that verifies but
//! belongs to someone else is caught here, not at broadcast.

use thiserror::Error;

use crate::codec::CodecError;
use crate::crypto::signatures::{recover_public_key, vrs_to_rsv};
use crate::crypto::{CryptoError, Secp256k1PublicKey};

use super::auth::SpendingCondition;
use super::builder::StacksTransaction;
use super::signing::presign_digest;
use super::types::KeyEncoding;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("invalid transaction hex: {0}")]
    InvalidHex(String),

    /// Only single-signature origins can be signed or combined.
    #[error("multi-signature spending conditions are not supported")]
    MultisigUnsupported,

    #[error("transaction has no origin spending condition")]
    MissingOrigin,

    #[error("transaction has no payload")]
    MissingPayload,

    /// The key or recovered key does not hash to the origin signer.
    #[error("signature does not belong to the origin signer")]
    SignerMismatch,

    #[error("transaction is unsigned")]
    NotSigned,
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Checks the origin signature and returns the recovered public key.
///
/// # Errors
///
/// - [`TransactionError::NotSigned`] if the signature is empty.
/// - [`TransactionError::MultisigUnsupported`] for multi-sig origins.
/// - [`TransactionError::SignerMismatch`] if recovery yields a different
///   signer.
pub fn verify_origin(tx: &StacksTransaction) -> Result<Secp256k1PublicKey, TransactionError> {
    let SpendingCondition::SingleSig(cond) = tx.auth.origin() else {
        return Err(TransactionError::MultisigUnsupported);
    };
    if cond.signature.is_empty() {
        return Err(TransactionError::NotSigned);
    }

    let digest = presign_digest(tx)?;
    let rsv = vrs_to_rsv(cond.signature.as_bytes());
    let compressed = cond.key_encoding == KeyEncoding::Compressed;
    let public_key = recover_public_key(&digest, &rsv, compressed)?;

    if public_key.hash160() != cond.signer {
        return Err(TransactionError::SignerMismatch);
    }
    Ok(public_key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
