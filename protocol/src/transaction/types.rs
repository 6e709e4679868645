//! Core wire-level value types for Stacks transactions.
//!
//! Small `Copy` enums for the one-byte discriminants, plus the fixed-width
//! byte newtypes (txid, signature, memo) that show up in several places.

use std::fmt;
use std::io::{Read, Write};

use crate::codec::{read_next, write_next, CodecError, StacksMessageCodec};
use crate::config::TOKEN_TRANSFER_MEMO_LENGTH;

/// Declares a `#[repr(u8)]` enum with `from_u8` and a codec that writes the
/// discriminant byte.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $(x if x == $value => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl StacksMessageCodec for $name {
            fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
                write_next(fd, &(*self as u8))
            }

            fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
                let byte: u8 = read_next(fd)?;
                Self::from_u8(byte).ok_or_else(|| {
                    CodecError::DeserializeError(format!(
                        concat!("unknown ", stringify!($name), " {:#04x}"),
                        byte
                    ))
                })
            }
        }
    };
}

wire_enum! {
    /// Whether the transaction may be mined in an anchored block, a
    /// microblock, or either.
    pub enum AnchorMode {
        OnChainOnly = 0x01,
        OffChainOnly = 0x02,
        Any = 0x03,
    }
}

wire_enum! {
    /// `Deny` aborts the transaction if it moves any asset not covered by a
    /// post-condition.
    pub enum PostConditionMode {
        Allow = 0x01,
        Deny = 0x02,
    }
}

wire_enum! {
    /// How the signer hash in a spending condition was derived.
    pub enum HashMode {
        P2pkh = 0x00,
        P2sh = 0x01,
        P2wpkh = 0x02,
        P2wsh = 0x03,
        P2shNonSequential = 0x05,
        P2wshNonSequential = 0x07,
    }
}

impl HashMode {
    pub fn is_single_sig(&self) -> bool {
        matches!(self, Self::P2pkh | Self::P2wpkh)
    }
}

wire_enum! {
    pub enum KeyEncoding {
        Compressed = 0x00,
        Uncompressed = 0x01,
    }
}

impl KeyEncoding {
    pub fn from_compressed(compressed: bool) -> Self {
        if compressed {
            Self::Compressed
        } else {
            Self::Uncompressed
        }
    }
}

wire_enum! {
    /// Authorization type byte. Also the flag mixed into presign hashes.
    pub enum AuthFlag {
        Standard = 0x04,
        Sponsored = 0x05,
    }
}

// ---------------------------------------------------------------------------
// Txid
// ---------------------------------------------------------------------------

/// SHA-512/256 of the serialized transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    /// `0x`-prefixed lowercase hex, the form Rosetta clients expect.
    pub fn to_hex_prefixed(&self) -> String {
        format!("0x{self}")
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({self})")
    }
}

// ---------------------------------------------------------------------------
// MessageSignature
// ---------------------------------------------------------------------------

/// A recoverable signature in native VRS order (recovery byte first).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageSignature(pub [u8; 65]);

impl MessageSignature {
    /// The all-zero placeholder carried by unsigned transactions.
    pub fn empty() -> Self {
        Self([0u8; 65])
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }
}

impl Default for MessageSignature {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for MessageSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageSignature({})", hex::encode(self.0))
    }
}

impl StacksMessageCodec for MessageSignature {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_next(fd, &self.0)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        read_next(fd).map(Self)
    }
}

// ---------------------------------------------------------------------------
// TokenTransferMemo
// ---------------------------------------------------------------------------

/// Fixed 34-byte memo attached to STX transfers.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenTransferMemo(pub [u8; TOKEN_TRANSFER_MEMO_LENGTH]);

impl TokenTransferMemo {
    pub fn empty() -> Self {
        Self([0u8; TOKEN_TRANSFER_MEMO_LENGTH])
    }

    /// Zero-pads `text` to the memo width. `None` if it does not fit.
    pub fn from_text(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() > TOKEN_TRANSFER_MEMO_LENGTH {
            return None;
        }
        let mut memo = [0u8; TOKEN_TRANSFER_MEMO_LENGTH];
        memo[..bytes.len()].copy_from_slice(bytes);
        Some(Self(memo))
    }

    /// The memo with trailing zero bytes removed, decoded lossily.
    /// Empty memos yield `None`.
    pub fn to_text(&self) -> Option<String> {
        let end = self.0.iter().rposition(|b| *b != 0).map(|i| i + 1)?;
        Some(String::from_utf8_lossy(&self.0[..end]).into_owned())
    }
}

impl Default for TokenTransferMemo {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for TokenTransferMemo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenTransferMemo({})", hex::encode(self.0))
    }
}

impl StacksMessageCodec for TokenTransferMemo {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_next(fd, &self.0)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        read_next(fd).map(Self)
    }
}
