//! Transaction authorization: who pays, who signs.
//!
//! A standard transaction carries one spending condition (the origin). A
//! sponsored transaction carries two: the origin, who authorizes the
//! payload, and the sponsor, who pays the fee.
//!
//! ```text
//! single-sig: hash_mode | signer[20] | nonce u64 | fee u64 | key_encoding | signature[65]
//! multi-sig:  hash_mode | signer[20] | nonce u64 | fee u64 | u32 n | field*n | required u16
//! ```

use std::io::{Read, Write};

use crate::address::StacksAddress;
use crate::codec::{read_next, write_next, CodecError, StacksMessageCodec};
use crate::config::StacksNetwork;
use crate::crypto::Secp256k1PublicKey;

use super::types::{AuthFlag, HashMode, KeyEncoding, MessageSignature};

// ---------------------------------------------------------------------------
// Spending conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSigSpendingCondition {
    pub hash_mode: HashMode,
    pub signer: [u8; 20],
    pub nonce: u64,
    pub tx_fee: u64,
    pub key_encoding: KeyEncoding,
    pub signature: MessageSignature,
}

/// One entry of a multi-sig condition: either a bare public key (a signer
/// that did not sign) or a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionAuthField {
    PublicKey {
        encoding: KeyEncoding,
        key: [u8; 33],
    },
    Signature {
        encoding: KeyEncoding,
        signature: MessageSignature,
    },
}

impl TransactionAuthField {
    fn type_id(&self) -> u8 {
        match self {
            Self::PublicKey { encoding: KeyEncoding::Compressed, .. } => 0x00,
            Self::PublicKey { encoding: KeyEncoding::Uncompressed, .. } => 0x01,
            Self::Signature { encoding: KeyEncoding::Compressed, .. } => 0x02,
            Self::Signature { encoding: KeyEncoding::Uncompressed, .. } => 0x03,
        }
    }
}

impl StacksMessageCodec for TransactionAuthField {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_next(fd, &self.type_id())?;
        match self {
            Self::PublicKey { key, .. } => write_next(fd, key),
            Self::Signature { signature, .. } => write_next(fd, signature),
        }
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let type_id: u8 = read_next(fd)?;
        let field = match type_id {
            0x00 | 0x01 => Self::PublicKey {
                encoding: KeyEncoding::from_compressed(type_id == 0x00),
                key: read_next(fd)?,
            },
            0x02 | 0x03 => Self::Signature {
                encoding: KeyEncoding::from_compressed(type_id == 0x02),
                signature: read_next(fd)?,
            },
            other => {
                return Err(CodecError::DeserializeError(format!(
                    "unknown auth field type {other:#04x}"
                )))
            }
        };
        Ok(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSigSpendingCondition {
    pub hash_mode: HashMode,
    pub signer: [u8; 20],
    pub nonce: u64,
    pub tx_fee: u64,
    pub fields: Vec<TransactionAuthField>,
    pub signatures_required: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendingCondition {
    SingleSig(SingleSigSpendingCondition),
    MultiSig(MultiSigSpendingCondition),
}

impl SpendingCondition {
    /// Unsigned single-sig P2PKH condition for `public_key`.
    pub fn new_single_sig_p2pkh(public_key: &Secp256k1PublicKey) -> Self {
        Self::SingleSig(SingleSigSpendingCondition {
            hash_mode: HashMode::P2pkh,
            signer: public_key.hash160(),
            nonce: 0,
            tx_fee: 0,
            key_encoding: KeyEncoding::from_compressed(public_key.is_compressed()),
            signature: MessageSignature::empty(),
        })
    }

    /// Unsigned single-sig P2PKH condition over a known signer hash. Used
    /// for size estimates when no public key is available yet.
    pub fn new_single_sig_from_hash(signer: [u8; 20]) -> Self {
        Self::SingleSig(SingleSigSpendingCondition {
            hash_mode: HashMode::P2pkh,
            signer,
            nonce: 0,
            tx_fee: 0,
            key_encoding: KeyEncoding::Compressed,
            signature: MessageSignature::empty(),
        })
    }

    /// Placeholder that stands in for the sponsor while the origin signs.
    pub fn initial_sighash() -> Self {
        Self::new_single_sig_from_hash([0u8; 20])
    }

    pub fn hash_mode(&self) -> HashMode {
        match self {
            Self::SingleSig(c) => c.hash_mode,
            Self::MultiSig(c) => c.hash_mode,
        }
    }

    pub fn signer(&self) -> &[u8; 20] {
        match self {
            Self::SingleSig(c) => &c.signer,
            Self::MultiSig(c) => &c.signer,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            Self::SingleSig(c) => c.nonce,
            Self::MultiSig(c) => c.nonce,
        }
    }

    pub fn tx_fee(&self) -> u64 {
        match self {
            Self::SingleSig(c) => c.tx_fee,
            Self::MultiSig(c) => c.tx_fee,
        }
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        match self {
            Self::SingleSig(c) => c.nonce = nonce,
            Self::MultiSig(c) => c.nonce = nonce,
        }
    }

    pub fn set_tx_fee(&mut self, tx_fee: u64) {
        match self {
            Self::SingleSig(c) => c.tx_fee = tx_fee,
            Self::MultiSig(c) => c.tx_fee = tx_fee,
        }
    }

    /// The address that owns this condition. Only P2PKH maps to the
    /// single-sig version; every other hash mode uses the multi-sig one.
    pub fn address(&self, network: StacksNetwork) -> StacksAddress {
        let version = match self.hash_mode() {
            HashMode::P2pkh => network.single_sig_address_version(),
            _ => network.multi_sig_address_version(),
        };
        StacksAddress::from_network_version(version, *self.signer())
    }

    /// True once a signature is present: a non-empty signature for
    /// single-sig, at least one signature field for multi-sig.
    pub fn is_signed(&self) -> bool {
        match self {
            Self::SingleSig(c) => !c.signature.is_empty(),
            Self::MultiSig(c) => c
                .fields
                .iter()
                .any(|f| matches!(f, TransactionAuthField::Signature { .. })),
        }
    }

    /// Nonce, fee and signature material zeroed, as hashed for the
    /// initial signature hash. Key encoding is preserved.
    pub fn cleared(&self) -> Self {
        match self {
            Self::SingleSig(c) => Self::SingleSig(SingleSigSpendingCondition {
                nonce: 0,
                tx_fee: 0,
                signature: MessageSignature::empty(),
                ..c.clone()
            }),
            Self::MultiSig(c) => Self::MultiSig(MultiSigSpendingCondition {
                nonce: 0,
                tx_fee: 0,
                fields: Vec::new(),
                ..c.clone()
            }),
        }
    }
}

impl StacksMessageCodec for SpendingCondition {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        match self {
            Self::SingleSig(c) => {
                write_next(fd, &c.hash_mode)?;
                write_next(fd, &c.signer)?;
                write_next(fd, &c.nonce)?;
                write_next(fd, &c.tx_fee)?;
                write_next(fd, &c.key_encoding)?;
                write_next(fd, &c.signature)?;
            }
            Self::MultiSig(c) => {
                write_next(fd, &c.hash_mode)?;
                write_next(fd, &c.signer)?;
                write_next(fd, &c.nonce)?;
                write_next(fd, &c.tx_fee)?;
                write_next(fd, &c.fields)?;
                write_next(fd, &c.signatures_required)?;
            }
        }
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let hash_mode: HashMode = read_next(fd)?;
        let signer: [u8; 20] = read_next(fd)?;
        let nonce: u64 = read_next(fd)?;
        let tx_fee: u64 = read_next(fd)?;

        if hash_mode.is_single_sig() {
            let key_encoding: KeyEncoding = read_next(fd)?;
            if hash_mode == HashMode::P2wpkh && key_encoding != KeyEncoding::Compressed {
                return Err(CodecError::DeserializeError(
                    "P2WPKH spending condition requires a compressed key".to_string(),
                ));
            }
            let signature: MessageSignature = read_next(fd)?;
            Ok(Self::SingleSig(SingleSigSpendingCondition {
                hash_mode,
                signer,
                nonce,
                tx_fee,
                key_encoding,
                signature,
            }))
        } else {
            let fields: Vec<TransactionAuthField> = read_next(fd)?;
            let signatures_required: u16 = read_next(fd)?;
            Ok(Self::MultiSig(MultiSigSpendingCondition {
                hash_mode,
                signer,
                nonce,
                tx_fee,
                fields,
                signatures_required,
            }))
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionAuth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionAuth {
    Standard(SpendingCondition),
    Sponsored(SpendingCondition, SpendingCondition),
}

impl TransactionAuth {
    pub fn flag(&self) -> AuthFlag {
        match self {
            Self::Standard(_) => AuthFlag::Standard,
            Self::Sponsored(..) => AuthFlag::Sponsored,
        }
    }

    pub fn origin(&self) -> &SpendingCondition {
        match self {
            Self::Standard(origin) | Self::Sponsored(origin, _) => origin,
        }
    }

    pub fn origin_mut(&mut self) -> &mut SpendingCondition {
        match self {
            Self::Standard(origin) | Self::Sponsored(origin, _) => origin,
        }
    }

    pub fn sponsor(&self) -> Option<&SpendingCondition> {
        match self {
            Self::Standard(_) => None,
            Self::Sponsored(_, sponsor) => Some(sponsor),
        }
    }

    pub fn is_sponsored(&self) -> bool {
        matches!(self, Self::Sponsored(..))
    }

    /// The fee is paid by the sponsor when there is one.
    pub fn tx_fee(&self) -> u64 {
        match self {
            Self::Standard(origin) => origin.tx_fee(),
            Self::Sponsored(_, sponsor) => sponsor.tx_fee(),
        }
    }

    pub fn set_tx_fee(&mut self, tx_fee: u64) {
        match self {
            Self::Standard(origin) => origin.set_tx_fee(tx_fee),
            Self::Sponsored(_, sponsor) => sponsor.set_tx_fee(tx_fee),
        }
    }

    pub fn origin_nonce(&self) -> u64 {
        self.origin().nonce()
    }

    /// The authorization as hashed for the initial signature hash: origin
    /// cleared, sponsor (if any) replaced by the placeholder condition.
    pub fn into_initial_sighash_auth(&self) -> Self {
        match self {
            Self::Standard(origin) => Self::Standard(origin.cleared()),
            Self::Sponsored(origin, _) => {
                Self::Sponsored(origin.cleared(), SpendingCondition::initial_sighash())
            }
        }
    }
}

impl StacksMessageCodec for TransactionAuth {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_next(fd, &self.flag())?;
        match self {
            Self::Standard(origin) => write_next(fd, origin),
            Self::Sponsored(origin, sponsor) => {
                write_next(fd, origin)?;
                write_next(fd, sponsor)
            }
        }
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let flag: AuthFlag = read_next(fd)?;
        let origin: SpendingCondition = read_next(fd)?;
        match flag {
            AuthFlag::Standard => Ok(Self::Standard(origin)),
            AuthFlag::Sponsored => Ok(Self::Sponsored(origin, read_next(fd)?)),
        }
    }
}
