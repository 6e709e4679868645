//! # Proof-of-Transfer (Stacking)
//!
//! Everything the construction API needs to know about the PoX boot
//! contracts: which contracts count as PoX, how `stack-stx` and
//! `delegate-stx` arguments are laid out, and how a bitcoin reward address
//! maps to the `{version, hashbytes}` tuple the contract expects.
//!
//! ## Reward address versions
//!
//! | version | kind | bitcoin encoding |
//! |---------|------|------------------|
//! | 0x00 | p2pkh | base58check |
//! | 0x01 | p2sh | base58check |
//! | 0x02 | p2sh-p2wpkh | base58check (p2sh) |
//! | 0x03 | p2sh-p2wsh | base58check (p2sh) |
//! | 0x04 | p2wpkh | bech32, witness v0 |
//! | 0x05 | p2wsh | bech32, witness v0 |
//! | 0x06 | p2tr | bech32m, witness v1 |
//!
//! ## Contract versions
//!
//! `pox`, `pox-2` and `pox-3` take four `stack-stx` arguments. `pox-4`
//! adds the signer authorization: an optional SIP-018 signature, the
//! signer's compressed public key, a max amount and an auth id
//! (see [`signer`]).

pub mod signer;

use bech32::{hrp, segwit, Hrp};
use thiserror::Error;

use crate::address::{AddressError, ContractId, PrincipalData};
use crate::clarity::ClarityValue;
use crate::config::{StacksNetwork, POX_4_CONTRACT_NAME, POX_CONTRACT_NAMES};
use crate::crypto::CryptoError;

pub const POX_ADDRESS_P2PKH: u8 = 0x00;
pub const POX_ADDRESS_P2SH: u8 = 0x01;
pub const POX_ADDRESS_P2SH_P2WPKH: u8 = 0x02;
pub const POX_ADDRESS_P2SH_P2WSH: u8 = 0x03;
pub const POX_ADDRESS_P2WPKH: u8 = 0x04;
pub const POX_ADDRESS_P2WSH: u8 = 0x05;
pub const POX_ADDRESS_P2TR: u8 = 0x06;

/// Function names the translator specializes.
pub const FN_STACK_STX: &str = "stack-stx";
pub const FN_DELEGATE_STX: &str = "delegate-stx";
pub const FN_REVOKE_DELEGATE_STX: &str = "revoke-delegate-stx";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoxError {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("unsupported PoX address version {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("PoX address version {version:#04x} needs {expected} hash bytes, got {actual}")]
    HashLength {
        version: u8,
        expected: usize,
        actual: usize,
    },

    #[error("malformed {function} arguments: {reason}")]
    InvalidArguments { function: &'static str, reason: String },

    #[error("malformed PoX value: {0}")]
    InvalidValue(String),
}

fn bad_args(function: &'static str, reason: impl Into<String>) -> PoxError {
    PoxError::InvalidArguments {
        function,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Contract recognition
// ---------------------------------------------------------------------------

/// True if `contract` is one of the PoX boot contracts on `network`.
pub fn is_pox_contract(contract: &ContractId, network: StacksNetwork) -> bool {
    contract.issuer.to_string() == network.boot_address()
        && POX_CONTRACT_NAMES.contains(&contract.name.as_str())
}

/// Whether `stack-stx` on this contract carries a signer authorization.
pub fn requires_signer_key(contract_name: &str) -> bool {
    contract_name == POX_4_CONTRACT_NAME
}

// ---------------------------------------------------------------------------
// PoxAddress
// ---------------------------------------------------------------------------

/// A bitcoin reward address in the shape the PoX contract stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoxAddress {
    pub version: u8,
    pub hashbytes: Vec<u8>,
}

fn expected_hash_len(version: u8) -> Result<usize, PoxError> {
    match version {
        POX_ADDRESS_P2PKH..=POX_ADDRESS_P2WPKH => Ok(20),
        POX_ADDRESS_P2WSH | POX_ADDRESS_P2TR => Ok(32),
        other => Err(PoxError::UnsupportedVersion(other)),
    }
}

fn network_hrp(network: StacksNetwork) -> Hrp {
    if network.is_mainnet() {
        hrp::BC
    } else {
        hrp::TB
    }
}

impl PoxAddress {
    pub fn new(version: u8, hashbytes: Vec<u8>) -> Result<Self, PoxError> {
        let expected = expected_hash_len(version)?;
        if hashbytes.len() != expected {
            return Err(PoxError::HashLength {
                version,
                expected,
                actual: hashbytes.len(),
            });
        }
        Ok(Self { version, hashbytes })
    }

    /// Parses a bitcoin address of `network`.
    ///
    /// Base58check addresses are tried first; their version byte decides
    /// p2pkh or p2sh. Anything else must be a segwit address with the
    /// network's human-readable part.
    pub fn from_btc_address(address: &str, network: StacksNetwork) -> Result<Self, PoxError> {
        let invalid = || AddressError::InvalidBitcoinAddress(address.to_string());

        if let Ok(decoded) = bs58::decode(address).with_check(None).into_vec() {
            let (version, hash) = decoded.split_first().ok_or_else(invalid)?;
            let pox_version = if *version == network.btc_p2pkh_version() {
                POX_ADDRESS_P2PKH
            } else if *version == network.btc_p2sh_version() {
                POX_ADDRESS_P2SH
            } else {
                return Err(invalid().into());
            };
            return Self::new(pox_version, hash.to_vec());
        }

        let (found_hrp, witness_version, program) = segwit::decode(address).map_err(|_| invalid())?;
        let hrp_ok = found_hrp == network_hrp(network) || (!network.is_mainnet() && found_hrp == hrp::BCRT);
        if !hrp_ok {
            return Err(invalid().into());
        }
        let pox_version = match (witness_version.to_u8(), program.len()) {
            (0, 20) => POX_ADDRESS_P2WPKH,
            (0, 32) => POX_ADDRESS_P2WSH,
            (1, 32) => POX_ADDRESS_P2TR,
            _ => return Err(invalid().into()),
        };
        Self::new(pox_version, program)
    }

    /// Renders the reward address as a bitcoin address of `network`.
    pub fn to_btc_address(&self, network: StacksNetwork) -> Result<String, PoxError> {
        let base58 = |version: u8| {
            let mut data = Vec::with_capacity(1 + self.hashbytes.len());
            data.push(version);
            data.extend_from_slice(&self.hashbytes);
            bs58::encode(data).with_check().into_string()
        };
        let bech32 = |witness_version| {
            segwit::encode(network_hrp(network), witness_version, &self.hashbytes)
                .map_err(|e| PoxError::InvalidValue(e.to_string()))
        };

        match self.version {
            POX_ADDRESS_P2PKH => Ok(base58(network.btc_p2pkh_version())),
            POX_ADDRESS_P2SH | POX_ADDRESS_P2SH_P2WPKH | POX_ADDRESS_P2SH_P2WSH => {
                Ok(base58(network.btc_p2sh_version()))
            }
            POX_ADDRESS_P2WPKH | POX_ADDRESS_P2WSH => bech32(segwit::VERSION_0),
            POX_ADDRESS_P2TR => bech32(segwit::VERSION_1),
            other => Err(PoxError::UnsupportedVersion(other)),
        }
    }

    /// `(tuple (version (buff 1)) (hashbytes (buff 32)))`.
    pub fn to_clarity(&self) -> ClarityValue {
        ClarityValue::tuple([
            ("version", ClarityValue::Buffer(vec![self.version])),
            ("hashbytes", ClarityValue::Buffer(self.hashbytes.clone())),
        ])
    }

    pub fn from_clarity(value: &ClarityValue) -> Result<Self, PoxError> {
        let field = |name: &str| {
            value
                .tuple_get(name)
                .and_then(ClarityValue::as_buffer)
                .ok_or_else(|| PoxError::InvalidValue(format!("pox-addr missing buffer '{name}'")))
        };
        let version = match field("version")? {
            [v] => *v,
            other => {
                return Err(PoxError::InvalidValue(format!(
                    "pox-addr version must be one byte, got {}",
                    other.len()
                )))
            }
        };
        Self::new(version, field("hashbytes")?.to_vec())
    }
}

// ---------------------------------------------------------------------------
// stack-stx
// ---------------------------------------------------------------------------

/// The pox-4 signer authorization appended to `stack-stx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerAuthorization {
    /// RSV signature over the SIP-018 stacking message, or `None` when the
    /// signer pre-registered the authorization on chain.
    pub signer_signature: Option<[u8; 65]>,
    pub signer_key: [u8; 33],
    pub max_amount: u128,
    pub auth_id: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackStxArgs {
    pub amount_ustx: u128,
    pub pox_addr: PoxAddress,
    pub start_burn_height: u128,
    pub lock_period: u128,
    pub signer: Option<SignerAuthorization>,
}

fn uint_arg(args: &[ClarityValue], index: usize, function: &'static str, name: &str) -> Result<u128, PoxError> {
    args.get(index)
        .and_then(ClarityValue::as_uint)
        .ok_or_else(|| bad_args(function, format!("argument {index} ({name}) must be a uint")))
}

impl StackStxArgs {
    pub fn to_clarity_args(&self) -> Vec<ClarityValue> {
        let mut args = vec![
            ClarityValue::UInt(self.amount_ustx),
            self.pox_addr.to_clarity(),
            ClarityValue::UInt(self.start_burn_height),
            ClarityValue::UInt(self.lock_period),
        ];
        if let Some(auth) = &self.signer {
            args.push(ClarityValue::from_option(
                auth.signer_signature.map(|sig| ClarityValue::Buffer(sig.to_vec())),
            ));
            args.push(ClarityValue::Buffer(auth.signer_key.to_vec()));
            args.push(ClarityValue::UInt(auth.max_amount));
            args.push(ClarityValue::UInt(auth.auth_id));
        }
        args
    }

    /// Accepts the four-argument form and the eight-argument pox-4 form.
    pub fn from_clarity_args(args: &[ClarityValue]) -> Result<Self, PoxError> {
        const F: &str = FN_STACK_STX;
        if args.len() != 4 && args.len() != 8 {
            return Err(bad_args(F, format!("expected 4 or 8 arguments, got {}", args.len())));
        }

        let signer = if args.len() == 8 {
            let signer_signature = match args[4].as_optional() {
                Some(None) => None,
                Some(Some(inner)) => Some(
                    inner
                        .as_buffer()
                        .and_then(|b| <[u8; 65]>::try_from(b).ok())
                        .ok_or_else(|| bad_args(F, "signer-sig must be a 65-byte buffer"))?,
                ),
                None => return Err(bad_args(F, "signer-sig must be optional")),
            };
            let signer_key = args[5]
                .as_buffer()
                .and_then(|b| <[u8; 33]>::try_from(b).ok())
                .ok_or_else(|| bad_args(F, "signer-key must be a 33-byte buffer"))?;
            Some(SignerAuthorization {
                signer_signature,
                signer_key,
                max_amount: uint_arg(args, 6, F, "max-amount")?,
                auth_id: uint_arg(args, 7, F, "auth-id")?,
            })
        } else {
            None
        };

        Ok(Self {
            amount_ustx: uint_arg(args, 0, F, "amount-ustx")?,
            pox_addr: PoxAddress::from_clarity(&args[1])?,
            start_burn_height: uint_arg(args, 2, F, "start-burn-ht")?,
            lock_period: uint_arg(args, 3, F, "lock-period")?,
            signer,
        })
    }
}

/// `(ok (tuple (lock-amount uint) (stacker principal) (unlock-burn-height uint)))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackStxResult {
    pub lock_amount: u128,
    pub stacker: PrincipalData,
    pub unlock_burn_height: u128,
}

impl StackStxResult {
    /// `None` for error responses or unexpected shapes.
    pub fn from_clarity(result: &ClarityValue) -> Option<Self> {
        let ok = result.as_response()?.ok()?;
        Some(Self {
            lock_amount: ok.tuple_get("lock-amount")?.as_uint()?,
            stacker: ok.tuple_get("stacker")?.as_principal()?.clone(),
            unlock_burn_height: ok.tuple_get("unlock-burn-height")?.as_uint()?,
        })
    }
}

// ---------------------------------------------------------------------------
// delegate-stx
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateStxArgs {
    pub amount_ustx: u128,
    pub delegate_to: PrincipalData,
    pub until_burn_height: Option<u128>,
    pub pox_addr: Option<PoxAddress>,
}

impl DelegateStxArgs {
    pub fn to_clarity_args(&self) -> Vec<ClarityValue> {
        vec![
            ClarityValue::UInt(self.amount_ustx),
            ClarityValue::principal(self.delegate_to.clone()),
            ClarityValue::from_option(self.until_burn_height.map(ClarityValue::UInt)),
            ClarityValue::from_option(self.pox_addr.as_ref().map(PoxAddress::to_clarity)),
        ]
    }

    pub fn from_clarity_args(args: &[ClarityValue]) -> Result<Self, PoxError> {
        const F: &str = FN_DELEGATE_STX;
        if args.len() != 4 {
            return Err(bad_args(F, format!("expected 4 arguments, got {}", args.len())));
        }
        let delegate_to = args[1]
            .as_principal()
            .cloned()
            .ok_or_else(|| bad_args(F, "delegate-to must be a principal"))?;
        let until_burn_height = match args[2].as_optional() {
            Some(None) => None,
            Some(Some(v)) => Some(v.as_uint().ok_or_else(|| bad_args(F, "until-burn-ht must be a uint"))?),
            None => return Err(bad_args(F, "until-burn-ht must be optional")),
        };
        let pox_addr = match args[3].as_optional() {
            Some(None) => None,
            Some(Some(v)) => Some(PoxAddress::from_clarity(v)?),
            None => return Err(bad_args(F, "pox-addr must be optional")),
        };
        Ok(Self {
            amount_ustx: uint_arg(args, 0, F, "amount-ustx")?,
            delegate_to,
            until_burn_height,
            pox_addr,
        })
    }
}
