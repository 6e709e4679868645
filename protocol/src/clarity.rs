//! # Clarity Values
//!
//! The subset of the Clarity VM needed to build and read contract-call
//! arguments: the value enum, its consensus serialization (type-prefixed,
//! big-endian), and the `repr` string the Clarity REPL prints.
//!
//! Type ids on the wire:
//!
//! | id | value | id | value |
//! |----|-------|----|-------|
//! | 0x00 | int (i128) | 0x07 | (ok v) |
//! | 0x01 | uint (u128) | 0x08 | (err v) |
//! | 0x02 | buffer | 0x09 | none |
//! | 0x03 | true | 0x0a | (some v) |
//! | 0x04 | false | 0x0b | list |
//! | 0x05 | standard principal | 0x0c | tuple |
//! | 0x06 | contract principal | 0x0d / 0x0e | string-ascii / string-utf8 |

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};

use crate::address::{ContractId, PrincipalData, StacksAddress};
use crate::codec::{
    read_name, read_next, read_u32_prefixed, write_next, write_u32_prefixed, write_u8_prefixed,
    CodecError, StacksMessageCodec,
};

/// Nesting limit for composite values.
pub const MAX_VALUE_DEPTH: u8 = 32;

/// Longest buffer or string value accepted.
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_TRUE: u8 = 0x03;
const TYPE_FALSE: u8 = 0x04;
const TYPE_PRINCIPAL_STANDARD: u8 = 0x05;
const TYPE_PRINCIPAL_CONTRACT: u8 = 0x06;
const TYPE_RESPONSE_OK: u8 = 0x07;
const TYPE_RESPONSE_ERR: u8 = 0x08;
const TYPE_OPTIONAL_NONE: u8 = 0x09;
const TYPE_OPTIONAL_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    Principal(PrincipalData),
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(BTreeMap<String, ClarityValue>),
    StringAscii(Vec<u8>),
    StringUtf8(String),
}

impl ClarityValue {
    pub fn some(value: ClarityValue) -> Self {
        Self::OptionalSome(Box::new(value))
    }

    pub fn ok(value: ClarityValue) -> Self {
        Self::ResponseOk(Box::new(value))
    }

    pub fn err(value: ClarityValue) -> Self {
        Self::ResponseErr(Box::new(value))
    }

    pub fn from_option(value: Option<ClarityValue>) -> Self {
        value.map_or(Self::OptionalNone, Self::some)
    }

    pub fn tuple<K: Into<String>>(fields: impl IntoIterator<Item = (K, ClarityValue)>) -> Self {
        Self::Tuple(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn ascii(s: &str) -> Self {
        Self::StringAscii(s.as_bytes().to_vec())
    }

    pub fn principal(principal: impl Into<PrincipalData>) -> Self {
        Self::Principal(principal.into())
    }

    // -- accessors --------------------------------------------------------

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&[u8]> {
        match self {
            Self::Buffer(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_principal(&self) -> Option<&PrincipalData> {
        match self {
            Self::Principal(p) => Some(p),
            _ => None,
        }
    }

    /// `Some(None)` for `none`, `Some(Some(v))` for `(some v)`, `None` for
    /// anything that is not an optional.
    pub fn as_optional(&self) -> Option<Option<&ClarityValue>> {
        match self {
            Self::OptionalNone => Some(None),
            Self::OptionalSome(v) => Some(Some(v)),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<Result<&ClarityValue, &ClarityValue>> {
        match self {
            Self::ResponseOk(v) => Some(Ok(v)),
            Self::ResponseErr(v) => Some(Err(v)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ClarityValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&BTreeMap<String, ClarityValue>> {
        match self {
            Self::Tuple(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn tuple_get(&self, key: &str) -> Option<&ClarityValue> {
        self.as_tuple().and_then(|fields| fields.get(key))
    }

    /// Text of an ascii or utf8 string value.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::StringAscii(bytes) => String::from_utf8(bytes.clone()).ok(),
            Self::StringUtf8(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Short name of the value's type, as used in function-arg metadata.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Buffer(_) => "buff",
            Self::Bool(_) => "bool",
            Self::Principal(_) => "principal",
            Self::ResponseOk(_) | Self::ResponseErr(_) => "response",
            Self::OptionalNone | Self::OptionalSome(_) => "optional",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::StringAscii(_) => "string-ascii",
            Self::StringUtf8(_) => "string-utf8",
        }
    }

    // -- encoding helpers --------------------------------------------------

    /// `0x`-prefixed hex of the consensus encoding.
    pub fn to_hex(&self) -> Result<String, CodecError> {
        Ok(format!("0x{}", hex::encode(self.serialize_to_vec()?)))
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| CodecError::DeserializeError(format!("invalid hex: {e}")))?;
        crate::codec::deserialize_exact(&bytes)
    }

    /// Clarity REPL rendering, e.g. `(tuple (amount u100) (memo none))`.
    pub fn repr(&self) -> String {
        self.to_string()
    }

    fn serialize_inner<W: Write>(&self, fd: &mut W, depth: u8) -> Result<(), CodecError> {
        if depth > MAX_VALUE_DEPTH {
            return Err(CodecError::SerializeError("value nesting too deep".to_string()));
        }
        match self {
            Self::Int(v) => {
                write_next(fd, &TYPE_INT)?;
                write_next(fd, v)?;
            }
            Self::UInt(v) => {
                write_next(fd, &TYPE_UINT)?;
                write_next(fd, v)?;
            }
            Self::Buffer(bytes) => {
                write_next(fd, &TYPE_BUFFER)?;
                write_sized(fd, bytes)?;
            }
            Self::Bool(true) => write_next(fd, &TYPE_TRUE)?,
            Self::Bool(false) => write_next(fd, &TYPE_FALSE)?,
            Self::Principal(PrincipalData::Standard(addr)) => {
                write_next(fd, &TYPE_PRINCIPAL_STANDARD)?;
                write_address(fd, addr)?;
            }
            Self::Principal(PrincipalData::Contract(id)) => {
                write_next(fd, &TYPE_PRINCIPAL_CONTRACT)?;
                write_address(fd, &id.issuer)?;
                write_u8_prefixed(fd, id.name.as_bytes())?;
            }
            Self::ResponseOk(v) => {
                write_next(fd, &TYPE_RESPONSE_OK)?;
                v.serialize_inner(fd, depth + 1)?;
            }
            Self::ResponseErr(v) => {
                write_next(fd, &TYPE_RESPONSE_ERR)?;
                v.serialize_inner(fd, depth + 1)?;
            }
            Self::OptionalNone => write_next(fd, &TYPE_OPTIONAL_NONE)?,
            Self::OptionalSome(v) => {
                write_next(fd, &TYPE_OPTIONAL_SOME)?;
                v.serialize_inner(fd, depth + 1)?;
            }
            Self::List(items) => {
                write_next(fd, &TYPE_LIST)?;
                write_next(fd, &count_u32(items.len())?)?;
                for item in items {
                    item.serialize_inner(fd, depth + 1)?;
                }
            }
            Self::Tuple(fields) => {
                write_next(fd, &TYPE_TUPLE)?;
                write_next(fd, &count_u32(fields.len())?)?;
                for (name, value) in fields {
                    write_u8_prefixed(fd, name.as_bytes())?;
                    value.serialize_inner(fd, depth + 1)?;
                }
            }
            Self::StringAscii(bytes) => {
                write_next(fd, &TYPE_STRING_ASCII)?;
                write_sized(fd, bytes)?;
            }
            Self::StringUtf8(s) => {
                write_next(fd, &TYPE_STRING_UTF8)?;
                write_sized(fd, s.as_bytes())?;
            }
        }
        Ok(())
    }

    fn deserialize_inner<R: Read>(fd: &mut R, depth: u8) -> Result<Self, CodecError> {
        if depth > MAX_VALUE_DEPTH {
            return Err(CodecError::DeserializeError("value nesting too deep".to_string()));
        }
        let type_id: u8 = read_next(fd)?;
        let value = match type_id {
            TYPE_INT => Self::Int(read_next(fd)?),
            TYPE_UINT => Self::UInt(read_next(fd)?),
            TYPE_BUFFER => Self::Buffer(read_sized(fd)?),
            TYPE_TRUE => Self::Bool(true),
            TYPE_FALSE => Self::Bool(false),
            TYPE_PRINCIPAL_STANDARD => Self::Principal(PrincipalData::Standard(read_address(fd)?)),
            TYPE_PRINCIPAL_CONTRACT => {
                let issuer = read_address(fd)?;
                let name = read_name(fd, "contract name")?;
                let id = ContractId::new(issuer, name)
                    .map_err(|e| CodecError::DeserializeError(e.to_string()))?;
                Self::Principal(PrincipalData::Contract(id))
            }
            TYPE_RESPONSE_OK => Self::ok(Self::deserialize_inner(fd, depth + 1)?),
            TYPE_RESPONSE_ERR => Self::err(Self::deserialize_inner(fd, depth + 1)?),
            TYPE_OPTIONAL_NONE => Self::OptionalNone,
            TYPE_OPTIONAL_SOME => Self::some(Self::deserialize_inner(fd, depth + 1)?),
            TYPE_LIST => {
                let len: u32 = read_next(fd)?;
                let mut items = Vec::new();
                for _ in 0..len {
                    items.push(Self::deserialize_inner(fd, depth + 1)?);
                }
                Self::List(items)
            }
            TYPE_TUPLE => {
                let len: u32 = read_next(fd)?;
                let mut fields = BTreeMap::new();
                for _ in 0..len {
                    let name = read_name(fd, "tuple key")?;
                    let value = Self::deserialize_inner(fd, depth + 1)?;
                    if fields.insert(name.clone(), value).is_some() {
                        return Err(CodecError::DeserializeError(format!(
                            "duplicate tuple key '{name}'"
                        )));
                    }
                }
                Self::Tuple(fields)
            }
            TYPE_STRING_ASCII => {
                let bytes = read_sized(fd)?;
                if !bytes.is_ascii() {
                    return Err(CodecError::DeserializeError("invalid string-ascii".to_string()));
                }
                Self::StringAscii(bytes)
            }
            TYPE_STRING_UTF8 => {
                let bytes = read_sized(fd)?;
                let s = String::from_utf8(bytes)
                    .map_err(|e| CodecError::DeserializeError(format!("invalid string-utf8: {e}")))?;
                Self::StringUtf8(s)
            }
            other => {
                return Err(CodecError::DeserializeError(format!(
                    "unknown clarity type id {other:#04x}"
                )))
            }
        };
        Ok(value)
    }
}

fn count_u32(len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::SerializeError("too many items".to_string()))
}

fn write_sized<W: Write>(fd: &mut W, bytes: &[u8]) -> Result<(), CodecError> {
    if bytes.len() > MAX_VALUE_SIZE {
        return Err(CodecError::SerializeError(format!("{} bytes exceeds value size limit", bytes.len())));
    }
    write_u32_prefixed(fd, bytes)
}

fn read_sized<R: Read>(fd: &mut R) -> Result<Vec<u8>, CodecError> {
    let bytes = read_u32_prefixed(fd)?;
    if bytes.len() > MAX_VALUE_SIZE {
        return Err(CodecError::DeserializeError(format!("{} bytes exceeds value size limit", bytes.len())));
    }
    Ok(bytes)
}

pub(crate) fn write_address<W: Write>(fd: &mut W, addr: &StacksAddress) -> Result<(), CodecError> {
    write_next(fd, &addr.version())?;
    write_next(fd, addr.hash160())
}

pub(crate) fn read_address<R: Read>(fd: &mut R) -> Result<StacksAddress, CodecError> {
    let version: u8 = read_next(fd)?;
    let hash160: [u8; 20] = read_next(fd)?;
    StacksAddress::new(version, hash160).map_err(|e| CodecError::DeserializeError(e.to_string()))
}

impl StacksMessageCodec for ClarityValue {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        self.serialize_inner(fd, 0)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        Self::deserialize_inner(fd, 0)
    }
}

impl fmt::Display for ClarityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "u{v}"),
            Self::Buffer(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Principal(p) => write!(f, "'{p}"),
            Self::ResponseOk(v) => write!(f, "(ok {v})"),
            Self::ResponseErr(v) => write!(f, "(err {v})"),
            Self::OptionalNone => f.write_str("none"),
            Self::OptionalSome(v) => write!(f, "(some {v})"),
            Self::List(items) => {
                f.write_str("(list")?;
                for item in items {
                    write!(f, " {item}")?;
                }
                f.write_str(")")
            }
            Self::Tuple(fields) => {
                f.write_str("(tuple")?;
                for (name, value) in fields {
                    write!(f, " ({name} {value})")?;
                }
                f.write_str(")")
            }
            Self::StringAscii(bytes) => {
                f.write_str("\"")?;
                for b in bytes {
                    write!(f, "{}", std::ascii::escape_default(*b))?;
                }
                f.write_str("\"")
            }
            Self::StringUtf8(s) => {
                f.write_str("u\"")?;
                for c in s.chars() {
                    if c.is_ascii() {
                        write!(f, "{}", c.escape_default())?;
                    } else {
                        write!(f, "\\u{{{:x}}}", c as u32)?;
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::deserialize_exact;

    fn roundtrip(value: &ClarityValue) -> Vec<u8> {
        let bytes = value.serialize_to_vec().unwrap();
        assert_eq!(&deserialize_exact::<ClarityValue>(&bytes).unwrap(), value);
        bytes
    }

    #[test]
    fn uint_and_int_encoding() {
        let bytes = roundtrip(&ClarityValue::UInt(1000));
        assert_eq!(hex::encode(&bytes), "01000000000000000000000000000003e8");
        let bytes = roundtrip(&ClarityValue::Int(-1));
        assert_eq!(bytes[0], 0x00);
        assert!(bytes[1..].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn standard_principal_matches_token_transfer_recipient() {
        // Recipient bytes from a testnet STX transfer payload.
        let bytes = hex::decode("051a1ae3f911d8f1d46d7416bfbe4b593fd41eac19cb").unwrap();
        let value: ClarityValue = deserialize_exact(&bytes).unwrap();
        let principal = value.as_principal().unwrap();
        assert_eq!(principal.address().version(), 26);
        assert_eq!(roundtrip(&value), bytes);
    }

    #[test]
    fn tuple_keys_are_sorted_on_the_wire() {
        let value = ClarityValue::tuple([
            ("version", ClarityValue::Buffer(vec![0x00])),
            ("hashbytes", ClarityValue::Buffer(vec![0xab; 20])),
        ]);
        let bytes = roundtrip(&value);
        // type, count, then "hashbytes" before "version"
        assert_eq!(bytes[0], TYPE_TUPLE);
        assert_eq!(&bytes[1..5], &[0, 0, 0, 2]);
        assert_eq!(bytes[5] as usize, "hashbytes".len());
        assert_eq!(&bytes[6..15], b"hashbytes");
    }

    #[test]
    fn duplicate_tuple_keys_rejected() {
        let mut bytes = vec![TYPE_TUPLE, 0, 0, 0, 2];
        for _ in 0..2 {
            bytes.extend_from_slice(&[1, b'a', TYPE_TRUE]);
        }
        assert!(deserialize_exact::<ClarityValue>(&bytes).is_err());
    }

    #[test]
    fn depth_limit() {
        let mut value = ClarityValue::UInt(1);
        for _ in 0..40 {
            value = ClarityValue::some(value);
        }
        assert!(value.serialize_to_vec().is_err());

        let mut bytes = vec![TYPE_OPTIONAL_SOME; 40];
        bytes.push(TYPE_TRUE);
        assert!(deserialize_exact::<ClarityValue>(&bytes).is_err());
    }

    #[test]
    fn unknown_type_id() {
        assert!(deserialize_exact::<ClarityValue>(&[0x42]).is_err());
    }

    #[test]
    fn repr_rendering() {
        let addr: StacksAddress = "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM".parse().unwrap();
        let value = ClarityValue::ok(ClarityValue::tuple([
            ("lock-amount", ClarityValue::UInt(100)),
            ("stacker", ClarityValue::principal(addr)),
            ("unlock-burn-height", ClarityValue::UInt(7)),
        ]));
        assert_eq!(
            value.repr(),
            "(ok (tuple (lock-amount u100) (stacker 'ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM) (unlock-burn-height u7)))"
        );
        assert_eq!(ClarityValue::OptionalNone.repr(), "none");
        assert_eq!(ClarityValue::Buffer(vec![0xde, 0xad]).repr(), "0xdead");
        assert_eq!(ClarityValue::ascii("hi \"x\"").repr(), "\"hi \\\"x\\\"\"");
        assert_eq!(ClarityValue::StringUtf8("é".into()).repr(), "u\"\\u{e9}\"");
        assert_eq!(
            ClarityValue::List(vec![ClarityValue::Int(-3), ClarityValue::Bool(true)]).repr(),
            "(list -3 true)"
        );
    }

    #[test]
    fn hex_helpers() {
        let value = ClarityValue::some(ClarityValue::UInt(5));
        let hex = value.to_hex().unwrap();
        assert!(hex.starts_with("0x0a01"));
        assert_eq!(ClarityValue::from_hex(&hex).unwrap(), value);
        assert_eq!(ClarityValue::from_hex(&hex[2..]).unwrap(), value);
        assert!(ClarityValue::from_hex("0xzz").is_err());
    }

    #[test]
    fn accessors() {
        let tuple = ClarityValue::tuple([("a", ClarityValue::UInt(1))]);
        assert_eq!(tuple.tuple_get("a").and_then(ClarityValue::as_uint), Some(1));
        assert!(tuple.tuple_get("b").is_none());
        assert_eq!(ClarityValue::OptionalNone.as_optional(), Some(None));
        assert_eq!(ClarityValue::UInt(1).as_optional(), None);
        assert_eq!(ClarityValue::ascii("stack-stx").as_text().as_deref(), Some("stack-stx"));
        assert_eq!(ClarityValue::from_option(None), ClarityValue::OptionalNone);
    }
}
