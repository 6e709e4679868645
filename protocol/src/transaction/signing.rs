//! Origin signing for single-signature transactions.
//!
//! Signing is split from building because the private key is never in this
//! process during normal construction: the caller receives the presign
//! digest from `/construction/payloads`, signs it elsewhere, and hands the
//! signature back to `/construction/combine`.
//!
//! ```text
//! initial = SHA512/256(tx with origin cleared, sponsor placeholder)
//! presign = SHA512/256(initial || auth_flag || fee_be64 || nonce_be64)
//! ```

use crate::crypto::hash::{sha512_256, sha512_256_parts};
use crate::crypto::signatures::sign_digest_vrs;
use crate::crypto::Secp256k1PrivateKey;
use crate::codec::StacksMessageCodec;

use super::auth::SpendingCondition;
use super::builder::StacksTransaction;
use super::types::{AuthFlag, MessageSignature};
use super::verification::TransactionError;

/// SHA-512/256 of the transaction with all signing material stripped.
pub fn initial_sighash(tx: &StacksTransaction) -> Result<[u8; 32], TransactionError> {
    let mut cleared = tx.clone();
    cleared.auth = tx.auth.into_initial_sighash_auth();
    Ok(sha512_256(&cleared.serialize_to_vec()?))
}

/// Mixes the origin's fee and nonce into an initial sighash.
pub fn make_presign_sighash(initial: &[u8; 32], flag: AuthFlag, fee: u64, nonce: u64) -> [u8; 32] {
    sha512_256_parts(&[
        initial.as_slice(),
        &[flag as u8],
        fee.to_be_bytes().as_slice(),
        nonce.to_be_bytes().as_slice(),
    ])
}

/// The digest the origin must sign.
///
/// The origin always signs with the standard flag, even in a sponsored
/// transaction, since the sponsor signs afterwards.
///
/// # Errors
///
/// [`TransactionError::MultisigUnsupported`] if the origin is multi-sig.
pub fn presign_digest(tx: &StacksTransaction) -> Result<[u8; 32], TransactionError> {
    let origin = tx.auth.origin();
    if !matches!(origin, SpendingCondition::SingleSig(_)) {
        return Err(TransactionError::MultisigUnsupported);
    }
    let initial = initial_sighash(tx)?;
    Ok(make_presign_sighash(
        &initial,
        AuthFlag::Standard,
        origin.tx_fee(),
        origin.nonce(),
    ))
}

/// Returns a copy of `tx` with `signature` (VRS) written into the origin
/// spending condition. The rest of the transaction is untouched.
pub fn splice_origin_signature(
    tx: &StacksTransaction,
    signature: MessageSignature,
) -> Result<StacksTransaction, TransactionError> {
    let mut signed = tx.clone();
    match signed.auth.origin_mut() {
        SpendingCondition::SingleSig(cond) => {
            cond.signature = signature;
            Ok(signed)
        }
        SpendingCondition::MultiSig(_) => Err(TransactionError::MultisigUnsupported),
    }
}

pub fn is_signed(tx: &StacksTransaction) -> bool {
    tx.auth.origin().is_signed()
}

/// Signs the origin in place with a local key.
///
/// The key must belong to the origin signer; a mismatch is reported
/// instead of producing a transaction the network would reject.
pub fn sign_origin(
    tx: &mut StacksTransaction,
    key: &Secp256k1PrivateKey,
) -> Result<(), TransactionError> {
    if key.public_key().hash160() != *tx.auth.origin().signer() {
        return Err(TransactionError::SignerMismatch);
    }
    let digest = presign_digest(tx)?;
    let vrs = sign_digest_vrs(key, &digest)?;
    *tx = splice_origin_signature(tx, MessageSignature(vrs))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
