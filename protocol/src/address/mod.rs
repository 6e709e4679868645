//! # Stacks Addresses & Principals
//!
//! A Stacks address is a 5-bit version plus a 20-byte HASH160, rendered
//! with c32check and an `S` prefix:
//!
//! ```text
//! public_key (33 or 65 bytes)
//!     -> HASH160(public_key) -> 20 bytes
//!     -> "S" || c32check(version, hash) -> ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM
//! ```
//!
//! Principals are either a standard address or a contract identifier
//! (`<address>.<contract-name>`). Both appear as token recipients, call
//! targets and delegation targets.

pub mod c32;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::config::StacksNetwork;
use crate::crypto::Secp256k1PublicKey;

use self::c32::{c32check_decode, c32check_encode};

/// Longest contract name accepted on the wire.
pub const MAX_CONTRACT_NAME_LENGTH: usize = 128;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid c32 character")]
    InvalidCharacter,

    #[error("invalid encoded length: {0}")]
    InvalidLength(usize),

    #[error("checksum mismatch")]
    BadChecksum,

    #[error("invalid address version: {0}")]
    InvalidVersion(u8),

    #[error("address must start with 'S'")]
    MissingPrefix,

    #[error("address version {version} does not belong to {network}")]
    WrongNetwork { version: u8, network: StacksNetwork },

    #[error("invalid contract name: '{0}'")]
    InvalidContractName(String),

    #[error("invalid bitcoin address: {0}")]
    InvalidBitcoinAddress(String),
}

// ---------------------------------------------------------------------------
// StacksAddress
// ---------------------------------------------------------------------------

/// A versioned HASH160.
///
/// # Examples
///
/// ```
/// use stacks_rosetta::address::StacksAddress;
///
/// let addr: StacksAddress = "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM".parse().unwrap();
/// assert_eq!(addr.version(), 26);
/// assert_eq!(addr.to_string(), "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StacksAddress {
    version: u8,
    hash160: [u8; 20],
}

impl StacksAddress {
    pub fn new(version: u8, hash160: [u8; 20]) -> Result<Self, AddressError> {
        if version >= 32 {
            return Err(AddressError::InvalidVersion(version));
        }
        Ok(Self { version, hash160 })
    }

    /// For versions taken from [`StacksNetwork`], which are all valid c32
    /// digits.
    pub(crate) fn from_network_version(version: u8, hash160: [u8; 20]) -> Self {
        debug_assert!(version < 32);
        Self { version, hash160 }
    }

    /// Single-signature (P2PKH) address of `public_key` on `network`.
    pub fn from_public_key(network: StacksNetwork, public_key: &Secp256k1PublicKey) -> Self {
        Self {
            version: network.single_sig_address_version(),
            hash160: public_key.hash160(),
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn hash160(&self) -> &[u8; 20] {
        &self.hash160
    }

    /// The network this address's version byte belongs to, if any.
    pub fn network(&self) -> Option<StacksNetwork> {
        [StacksNetwork::Mainnet, StacksNetwork::Testnet]
            .into_iter()
            .find(|n| n.accepts_address_version(self.version))
    }

    /// Parses and additionally requires the version to belong to `network`.
    pub fn parse_for_network(s: &str, network: StacksNetwork) -> Result<Self, AddressError> {
        let addr: Self = s.parse()?;
        if !network.accepts_address_version(addr.version) {
            return Err(AddressError::WrongNetwork {
                version: addr.version,
                network,
            });
        }
        Ok(addr)
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `new` guarantees the version fits in one c32 digit.
        let encoded = c32check_encode(self.version, &self.hash160).map_err(|_| fmt::Error)?;
        write!(f, "S{encoded}")
    }
}

impl fmt::Debug for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StacksAddress({self})")
    }
}

impl FromStr for StacksAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('S').ok_or(AddressError::MissingPrefix)?;
        let (version, payload) = c32check_decode(rest)?;
        let hash160: [u8; 20] = payload
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(payload.len()))?;
        Self::new(version, hash160)
    }
}

// ---------------------------------------------------------------------------
// Contract identifiers & principals
// ---------------------------------------------------------------------------

/// Checks a Clarity contract name: a letter followed by letters, digits,
/// `-` or `_`.
pub fn validate_contract_name(name: &str) -> Result<(), AddressError> {
    let mut chars = name.chars();
    let valid = name.len() <= MAX_CONTRACT_NAME_LENGTH
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AddressError::InvalidContractName(name.to_string()))
    }
}

/// `<issuer>.<name>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId {
    pub issuer: StacksAddress,
    pub name: String,
}

impl ContractId {
    pub fn new(issuer: StacksAddress, name: impl Into<String>) -> Result<Self, AddressError> {
        let name = name.into();
        validate_contract_name(&name)?;
        Ok(Self { issuer, name })
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.issuer, self.name)
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({self})")
    }
}

impl FromStr for ContractId {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (issuer, name) = s
            .split_once('.')
            .ok_or_else(|| AddressError::InvalidContractName(s.to_string()))?;
        Self::new(issuer.parse()?, name)
    }
}

/// Anything that can own STX.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrincipalData {
    Standard(StacksAddress),
    Contract(ContractId),
}

impl PrincipalData {
    /// The address part: the account itself, or the contract's deployer.
    pub fn address(&self) -> &StacksAddress {
        match self {
            Self::Standard(addr) => addr,
            Self::Contract(id) => &id.issuer,
        }
    }
}

impl From<StacksAddress> for PrincipalData {
    fn from(addr: StacksAddress) -> Self {
        Self::Standard(addr)
    }
}

impl From<ContractId> for PrincipalData {
    fn from(id: ContractId) -> Self {
        Self::Contract(id)
    }
}

impl fmt::Display for PrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(addr) => addr.fmt(f),
            Self::Contract(id) => id.fmt(f),
        }
    }
}

impl fmt::Debug for PrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrincipalData({self})")
    }
}

impl FromStr for PrincipalData {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('.') {
            s.parse().map(Self::Contract)
        } else {
            s.parse().map(Self::Standard)
        }
    }
}
