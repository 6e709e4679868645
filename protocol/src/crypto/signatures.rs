//! # Recoverable ECDSA Signatures
//!
//! Two 65-byte layouts of the same recoverable signature meet in this
//! module:
//!
//! - **RSV** (`r || s || v`): what Rosetta signers hand back for the
//!   `ecdsa_recovery` signature type.
//! - **VRS** (`v || r || s`): the Stacks `MessageSignature` layout embedded
//!   in spending conditions.
//!
//! [`rsv_to_vrs`] and [`vrs_to_rsv`] are the only places the bytes move.
//! Everything else in the crate works on one layout or the other and never
//! shuffles bytes by hand.
//!
//! Verification runs over 32-byte prehashed digests (the Stacks presign
//! hash is already SHA-512/256), and `s` is normalised to the low half of
//! the curve order before `k256` sees it, because `k256` rejects high-S
//! signatures outright.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use super::keys::{Secp256k1PrivateKey, Secp256k1PublicKey};
use super::CryptoError;

/// Length of a recoverable signature in either layout.
pub const RECOVERABLE_SIGNATURE_LENGTH: usize = 65;

/// Length of a bare `r || s` signature.
pub const COMPACT_SIGNATURE_LENGTH: usize = 64;

/// Moves the trailing recovery byte to the front.
pub fn rsv_to_vrs(rsv: &[u8; 65]) -> [u8; 65] {
    let mut vrs = [0u8; 65];
    vrs[0] = rsv[64];
    vrs[1..].copy_from_slice(&rsv[..64]);
    vrs
}

/// Moves the leading recovery byte to the back.
pub fn vrs_to_rsv(vrs: &[u8; 65]) -> [u8; 65] {
    let mut rsv = [0u8; 65];
    rsv[..64].copy_from_slice(&vrs[1..]);
    rsv[64] = vrs[0];
    rsv
}

fn parse_compact(rs: &[u8]) -> Result<Signature, CryptoError> {
    let sig = Signature::from_slice(rs).map_err(|_| CryptoError::MalformedSignature)?;
    Ok(sig.normalize_s().unwrap_or(sig))
}

/// Verifies an `r || s` signature over a 32-byte digest.
pub fn verify_digest(
    digest: &[u8; 32],
    public_key: &Secp256k1PublicKey,
    rs: &[u8],
) -> Result<bool, CryptoError> {
    if rs.len() != COMPACT_SIGNATURE_LENGTH {
        return Err(CryptoError::InvalidSignatureLength(rs.len()));
    }
    let sig = parse_compact(rs)?;
    Ok(public_key.verifying_key().verify_prehash(digest, &sig).is_ok())
}

/// Boolean convenience over hex inputs. Any malformed input is `false`.
///
/// `signature` may be 64 bytes (`r || s`) or 65 bytes RSV; the recovery
/// byte is not consulted.
pub fn verify(digest: &[u8], public_key_hex: &str, signature: &[u8]) -> bool {
    let Ok(digest) = <[u8; 32]>::try_from(digest) else {
        return false;
    };
    let Ok(public_key) = Secp256k1PublicKey::from_hex(public_key_hex) else {
        return false;
    };
    let rs = match signature.len() {
        COMPACT_SIGNATURE_LENGTH => signature,
        RECOVERABLE_SIGNATURE_LENGTH => &signature[..64],
        _ => return false,
    };
    verify_digest(&digest, &public_key, rs).unwrap_or(false)
}

/// Finds the recovery id that maps `sig` over `digest` back to `public_key`.
fn find_recovery_id(
    digest: &[u8; 32],
    public_key: &Secp256k1PublicKey,
    sig: &Signature,
) -> Option<RecoveryId> {
    (0u8..4).filter_map(RecoveryId::from_byte).find(|id| {
        VerifyingKey::recover_from_prehash(digest, sig, *id)
            .map(|recovered| recovered == *public_key.verifying_key())
            .unwrap_or(false)
    })
}

/// Turns a caller-supplied signature into a verified, low-S RSV signature.
///
/// Accepts 64-byte `r || s` (the recovery id is recovered against
/// `public_key`) or 65-byte RSV (the supplied `v` must recover
/// `public_key`, after adjusting for S normalisation).
pub fn to_recoverable_rsv(
    digest: &[u8; 32],
    public_key: &Secp256k1PublicKey,
    signature: &[u8],
) -> Result<[u8; 65], CryptoError> {
    let (rs, supplied_v) = match signature.len() {
        COMPACT_SIGNATURE_LENGTH => (signature, None),
        RECOVERABLE_SIGNATURE_LENGTH => (&signature[..64], Some(signature[64])),
        other => return Err(CryptoError::InvalidSignatureLength(other)),
    };

    let raw = Signature::from_slice(rs).map_err(|_| CryptoError::MalformedSignature)?;
    let normalized = raw.normalize_s();
    let sig = normalized.unwrap_or(raw);

    if public_key.verifying_key().verify_prehash(digest, &sig).is_err() {
        return Err(CryptoError::VerificationFailed);
    }

    let recovery_id = find_recovery_id(digest, public_key, &sig).ok_or(CryptoError::VerificationFailed)?;

    if let Some(v) = supplied_v {
        // Negating s flips the parity bit of the recovery id.
        let expected = if normalized.is_some() { v ^ 1 } else { v };
        if expected != recovery_id.to_byte() {
            return Err(CryptoError::RecoveryMismatch);
        }
    }

    let mut rsv = [0u8; 65];
    rsv[..64].copy_from_slice(&sig.to_bytes());
    rsv[64] = recovery_id.to_byte();
    Ok(rsv)
}

/// Signs a 32-byte digest and returns RSV.
pub fn sign_digest_rsv(key: &Secp256k1PrivateKey, digest: &[u8; 32]) -> Result<[u8; 65], CryptoError> {
    let (sig, recovery_id) = key
        .signing_key()
        .sign_prehash_recoverable(digest)
        .map_err(|_| CryptoError::SigningFailed)?;
    let mut rsv = [0u8; 65];
    rsv[..64].copy_from_slice(&sig.to_bytes());
    rsv[64] = recovery_id.to_byte();
    Ok(rsv)
}

/// Signs a 32-byte digest and returns the native Stacks VRS layout.
pub fn sign_digest_vrs(key: &Secp256k1PrivateKey, digest: &[u8; 32]) -> Result<[u8; 65], CryptoError> {
    sign_digest_rsv(key, digest).map(|rsv| rsv_to_vrs(&rsv))
}

/// Recovers the signer of an RSV signature over `digest`.
///
/// `compressed` picks the encoding of the returned key, which decides its
/// HASH160 and therefore the address it maps to.
pub fn recover_public_key(
    digest: &[u8; 32],
    rsv: &[u8; 65],
    compressed: bool,
) -> Result<Secp256k1PublicKey, CryptoError> {
    let raw = Signature::from_slice(&rsv[..64]).map_err(|_| CryptoError::MalformedSignature)?;
    let normalized = raw.normalize_s();
    let v = if normalized.is_some() { rsv[64] ^ 1 } else { rsv[64] };
    let recovery_id = RecoveryId::from_byte(v).ok_or(CryptoError::MalformedSignature)?;
    let key = VerifyingKey::recover_from_prehash(digest, &normalized.unwrap_or(raw), recovery_id)
        .map_err(|_| CryptoError::VerificationFailed)?;
    Ok(Secp256k1PublicKey::from_verifying_key(key, compressed))
}
