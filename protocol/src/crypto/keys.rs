//! # secp256k1 Keys
//!
//! Thin wrappers over `k256` that remember whether a key was supplied in
//! compressed or uncompressed SEC1 form. The form matters on Stacks: it
//! selects the spending condition's key-encoding byte and changes the
//! HASH160 that ends up in the sender address.

use std::fmt;

use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use super::hash::hash160;
use super::CryptoError;

/// A secp256k1 public key plus its SEC1 encoding flag.
#[derive(Clone, PartialEq, Eq)]
pub struct Secp256k1PublicKey {
    key: VerifyingKey,
    compressed: bool,
}

impl Secp256k1PublicKey {
    /// Parses a 33-byte compressed or 65-byte uncompressed SEC1 key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let compressed = match bytes.len() {
            33 => true,
            65 => false,
            other => return Err(CryptoError::InvalidPublicKeyLength(other)),
        };
        let key = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { key, compressed })
    }

    /// Parses hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_slice(&bytes)
    }

    pub fn from_verifying_key(key: VerifyingKey, compressed: bool) -> Self {
        Self { key, compressed }
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// SEC1 bytes in the form the key was supplied in.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.key.to_encoded_point(self.compressed).as_bytes().to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// HASH160 of [`to_bytes`](Self::to_bytes). This is the 20-byte signer
    /// hash stored in P2PKH spending conditions.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }
}

impl fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1PublicKey({})", self.to_hex())
    }
}

/// A secp256k1 private key.
///
/// Stacks serializes private keys as 32 bytes, or 33 bytes with a trailing
/// `0x01` meaning "derive the compressed public key". Bare 32-byte keys
/// also derive compressed public keys here, which is what every wallet in
/// practice does.
#[derive(Clone)]
pub struct Secp256k1PrivateKey {
    key: SigningKey,
    compress_public: bool,
}

impl Secp256k1PrivateKey {
    /// A fresh random key from the OS RNG.
    pub fn random() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
            compress_public: true,
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let (secret, compress_public) = match bytes.len() {
            32 => (bytes, true),
            33 if bytes[32] == 0x01 => (&bytes[..32], true),
            33 => (&bytes[..32], false),
            other => return Err(CryptoError::InvalidPrivateKeyLength(other)),
        };
        let key = SigningKey::from_slice(secret).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { key, compress_public })
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Self::from_slice(&bytes)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    pub fn public_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey::from_verifying_key(*self.key.verifying_key(), self.compress_public)
    }
}

// Never print secret material, not even in debug builds.
impl fmt::Debug for Secp256k1PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1PrivateKey")
            .field("public_key", &self.public_key())
            .finish()
    }
}
