//! # Consensus Codec
//!
//! Big-endian, length-prefixed binary encoding shared by transactions,
//! post-conditions and Clarity values. Every wire type implements
//! [`StacksMessageCodec`]; composite types are built out of
//! [`write_next`] / [`read_next`] calls in field order.
//!
//! Readers are plain `std::io::Read`, so decoding straight out of a byte
//! slice (`&mut &[u8]`) needs no intermediate buffer.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Upper bound on any single transaction, and on any variable-length field
/// inside one.
pub const MAX_TRANSACTION_LEN: u32 = 2 * 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("failed to deserialize: {0}")]
    DeserializeError(String),

    #[error("failed to serialize: {0}")]
    SerializeError(String),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("io error: {0}")]
    Io(String),
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::UnexpectedEof,
            _ => Self::Io(err.to_string()),
        }
    }
}

/// A type with a canonical consensus byte encoding.
pub trait StacksMessageCodec: Sized {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError>;

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError>;

    fn serialize_to_vec(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        self.consensus_serialize(&mut bytes)?;
        Ok(bytes)
    }
}

pub fn write_next<T: StacksMessageCodec, W: Write>(fd: &mut W, item: &T) -> Result<(), CodecError> {
    item.consensus_serialize(fd)
}

pub fn read_next<T: StacksMessageCodec, R: Read>(fd: &mut R) -> Result<T, CodecError> {
    T::consensus_deserialize(fd)
}

/// Decodes `bytes` completely. Leftover input is an error.
pub fn deserialize_exact<T: StacksMessageCodec>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut cursor = bytes;
    let value = T::consensus_deserialize(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(CodecError::TrailingBytes(cursor.len()));
    }
    Ok(value)
}

/// Reads exactly `len` bytes without trusting `len` for the allocation.
pub fn read_exact_vec<R: Read>(fd: &mut R, len: u64) -> Result<Vec<u8>, CodecError> {
    if len > u64::from(MAX_TRANSACTION_LEN) {
        return Err(CodecError::DeserializeError(format!(
            "length {len} exceeds maximum {MAX_TRANSACTION_LEN}"
        )));
    }
    let mut buf = Vec::new();
    fd.by_ref().take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(CodecError::UnexpectedEof);
    }
    Ok(buf)
}

/// `u8` length followed by the bytes. Names (contract, function, tuple
/// keys) use this form.
pub fn write_u8_prefixed<W: Write>(fd: &mut W, bytes: &[u8]) -> Result<(), CodecError> {
    let len = u8::try_from(bytes.len())
        .map_err(|_| CodecError::SerializeError(format!("{} bytes exceeds u8 length prefix", bytes.len())))?;
    fd.write_all(&[len])?;
    fd.write_all(bytes)?;
    Ok(())
}

pub fn read_u8_prefixed<R: Read>(fd: &mut R) -> Result<Vec<u8>, CodecError> {
    let len: u8 = read_next(fd)?;
    read_exact_vec(fd, u64::from(len))
}

/// `u32` length followed by the bytes.
pub fn write_u32_prefixed<W: Write>(fd: &mut W, bytes: &[u8]) -> Result<(), CodecError> {
    let len = u32::try_from(bytes.len())
        .ok()
        .filter(|len| *len <= MAX_TRANSACTION_LEN)
        .ok_or_else(|| CodecError::SerializeError(format!("{} bytes is too long", bytes.len())))?;
    write_next(fd, &len)?;
    fd.write_all(bytes)?;
    Ok(())
}

pub fn read_u32_prefixed<R: Read>(fd: &mut R) -> Result<Vec<u8>, CodecError> {
    let len: u32 = read_next(fd)?;
    read_exact_vec(fd, u64::from(len))
}

/// A `u8`-prefixed name that must be valid ASCII.
pub fn read_name<R: Read>(fd: &mut R, what: &str) -> Result<String, CodecError> {
    let bytes = read_u8_prefixed(fd)?;
    if !bytes.is_ascii() {
        return Err(CodecError::DeserializeError(format!("{what} is not ASCII")));
    }
    String::from_utf8(bytes).map_err(|e| CodecError::DeserializeError(format!("{what}: {e}")))
}

macro_rules! impl_codec_for_int {
    ($($t:ty),*) => {
        $(
            impl StacksMessageCodec for $t {
                fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
                    fd.write_all(&self.to_be_bytes())?;
                    Ok(())
                }

                fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    fd.read_exact(&mut buf)?;
                    Ok(<$t>::from_be_bytes(buf))
                }
            }
        )*
    };
}

impl_codec_for_int!(u8, u16, u32, u64, i128, u128);

impl<const N: usize> StacksMessageCodec for [u8; N] {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        fd.write_all(self)?;
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let mut buf = [0u8; N];
        fd.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// `u32` item count followed by each item.
impl<T: StacksMessageCodec> StacksMessageCodec for Vec<T> {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        let len = u32::try_from(self.len())
            .map_err(|_| CodecError::SerializeError("too many items".to_string()))?;
        write_next(fd, &len)?;
        for item in self {
            write_next(fd, item)?;
        }
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let len: u32 = read_next(fd)?;
        if len > MAX_TRANSACTION_LEN {
            return Err(CodecError::DeserializeError(format!("item count {len} is too large")));
        }
        // Items are at least one byte each; a short input fails on EOF
        // long before `len` iterations.
        let mut items = Vec::new();
        for _ in 0..len {
            items.push(read_next(fd)?);
        }
        Ok(items)
    }
}
