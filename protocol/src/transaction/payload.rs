//! Transaction payloads: what the transaction actually does.
//!
//! | id   | payload |
//! |------|---------|
//! | 0x00 | STX token transfer |
//! | 0x01 | smart-contract deploy |
//! | 0x02 | contract call |
//! | 0x03 | poison microblock |
//! | 0x04 | coinbase |
//! | 0x05 | coinbase paying an alternate recipient |
//! | 0x06 | versioned smart-contract deploy |
//! | 0x07 | tenure change |
//! | 0x08 | Nakamoto coinbase (with VRF proof) |

use std::fmt;
use std::io::{Read, Write};

use crate::address::{validate_contract_name, ContractId, PrincipalData, StacksAddress};
use crate::clarity::{read_address, write_address, ClarityValue};
use crate::codec::{
    read_name, read_next, read_u32_prefixed, write_next, write_u32_prefixed, write_u8_prefixed,
    CodecError, StacksMessageCodec,
};

use super::types::TokenTransferMemo;

const PAYLOAD_TOKEN_TRANSFER: u8 = 0x00;
const PAYLOAD_SMART_CONTRACT: u8 = 0x01;
const PAYLOAD_CONTRACT_CALL: u8 = 0x02;
const PAYLOAD_POISON_MICROBLOCK: u8 = 0x03;
const PAYLOAD_COINBASE: u8 = 0x04;
const PAYLOAD_COINBASE_TO_ALT_RECIPIENT: u8 = 0x05;
const PAYLOAD_VERSIONED_SMART_CONTRACT: u8 = 0x06;
const PAYLOAD_TENURE_CHANGE: u8 = 0x07;
const PAYLOAD_NAKAMOTO_COINBASE: u8 = 0x08;

/// Longest Clarity function name.
pub const MAX_FUNCTION_NAME_LENGTH: usize = 128;

// ---------------------------------------------------------------------------
// Contract call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContractCall {
    pub contract: ContractId,
    pub function_name: String,
    pub function_args: Vec<ClarityValue>,
}

impl TransactionContractCall {
    pub fn new(
        contract: ContractId,
        function_name: impl Into<String>,
        function_args: Vec<ClarityValue>,
    ) -> Result<Self, CodecError> {
        let function_name = function_name.into();
        validate_function_name(&function_name)?;
        Ok(Self {
            contract,
            function_name,
            function_args,
        })
    }
}

/// Clarity identifiers: ASCII, non-empty, no whitespace or parentheses.
fn validate_function_name(name: &str) -> Result<(), CodecError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_FUNCTION_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !matches!(c, '(' | ')' | '\'' | '"' | '.' | ','));
    if valid {
        Ok(())
    } else {
        Err(CodecError::DeserializeError(format!(
            "invalid function name '{name}'"
        )))
    }
}

impl fmt::Display for TransactionContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .function_args
            .iter()
            .map(ClarityValue::repr)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}::{}({})", self.contract, self.function_name, args)
    }
}

impl StacksMessageCodec for TransactionContractCall {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_address(fd, &self.contract.issuer)?;
        write_u8_prefixed(fd, self.contract.name.as_bytes())?;
        write_u8_prefixed(fd, self.function_name.as_bytes())?;
        write_next(fd, &self.function_args)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let issuer = read_address(fd)?;
        let contract_name = read_name(fd, "contract name")?;
        let function_name = read_name(fd, "function name")?;
        let function_args: Vec<ClarityValue> = read_next(fd)?;
        let contract = ContractId::new(issuer, contract_name)
            .map_err(|e| CodecError::DeserializeError(e.to_string()))?;
        Self::new(contract, function_name, function_args)
    }
}

// ---------------------------------------------------------------------------
// Smart contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSmartContract {
    pub name: String,
    pub code_body: String,
    /// `None` deploys with whatever Clarity version the chain defaults to.
    pub clarity_version: Option<u8>,
}

impl TransactionSmartContract {
    fn serialize_body<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_u8_prefixed(fd, self.name.as_bytes())?;
        write_u32_prefixed(fd, self.code_body.as_bytes())
    }

    fn deserialize_body<R: Read>(fd: &mut R, clarity_version: Option<u8>) -> Result<Self, CodecError> {
        let name = read_name(fd, "contract name")?;
        validate_contract_name(&name).map_err(|e| CodecError::DeserializeError(e.to_string()))?;
        let code = read_u32_prefixed(fd)?;
        if !code.is_ascii() {
            return Err(CodecError::DeserializeError("contract code is not ASCII".to_string()));
        }
        let code_body = String::from_utf8(code)
            .map_err(|e| CodecError::DeserializeError(format!("contract code: {e}")))?;
        Ok(Self {
            name,
            code_body,
            clarity_version,
        })
    }
}

// ---------------------------------------------------------------------------
// Poison microblock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroblockHeader {
    pub version: u8,
    pub sequence: u16,
    pub prev_block: [u8; 32],
    pub tx_merkle_root: [u8; 32],
    pub signature: [u8; 65],
}

impl StacksMessageCodec for MicroblockHeader {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_next(fd, &self.version)?;
        write_next(fd, &self.sequence)?;
        write_next(fd, &self.prev_block)?;
        write_next(fd, &self.tx_merkle_root)?;
        write_next(fd, &self.signature)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        Ok(Self {
            version: read_next(fd)?,
            sequence: read_next(fd)?,
            prev_block: read_next(fd)?,
            tx_merkle_root: read_next(fd)?,
            signature: read_next(fd)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tenure change
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenureChangeCause {
    BlockFound,
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenureChangePayload {
    pub tenure_consensus_hash: [u8; 20],
    pub prev_tenure_consensus_hash: [u8; 20],
    pub burn_view_consensus_hash: [u8; 20],
    pub previous_tenure_end: [u8; 32],
    pub previous_tenure_blocks: u32,
    pub cause: TenureChangeCause,
    pub pubkey_hash: [u8; 20],
}

impl StacksMessageCodec for TenureChangePayload {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_next(fd, &self.tenure_consensus_hash)?;
        write_next(fd, &self.prev_tenure_consensus_hash)?;
        write_next(fd, &self.burn_view_consensus_hash)?;
        write_next(fd, &self.previous_tenure_end)?;
        write_next(fd, &self.previous_tenure_blocks)?;
        let cause: u8 = match self.cause {
            TenureChangeCause::BlockFound => 0x00,
            TenureChangeCause::Extended => 0x01,
        };
        write_next(fd, &cause)?;
        write_next(fd, &self.pubkey_hash)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let tenure_consensus_hash = read_next(fd)?;
        let prev_tenure_consensus_hash = read_next(fd)?;
        let burn_view_consensus_hash = read_next(fd)?;
        let previous_tenure_end = read_next(fd)?;
        let previous_tenure_blocks = read_next(fd)?;
        let cause = match read_next::<u8, _>(fd)? {
            0x00 => TenureChangeCause::BlockFound,
            0x01 => TenureChangeCause::Extended,
            other => {
                return Err(CodecError::DeserializeError(format!(
                    "unknown tenure change cause {other:#04x}"
                )))
            }
        };
        Ok(Self {
            tenure_consensus_hash,
            prev_tenure_consensus_hash,
            burn_view_consensus_hash,
            previous_tenure_end,
            previous_tenure_blocks,
            cause,
            pubkey_hash: read_next(fd)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionPayload {
    TokenTransfer {
        recipient: PrincipalData,
        amount: u64,
        memo: TokenTransferMemo,
    },
    SmartContract(TransactionSmartContract),
    ContractCall(TransactionContractCall),
    PoisonMicroblock(MicroblockHeader, MicroblockHeader),
    /// Covers all three coinbase encodings; the optional fields select
    /// which one goes on the wire.
    Coinbase {
        payload: [u8; 32],
        alt_recipient: Option<PrincipalData>,
        vrf_proof: Option<[u8; 80]>,
    },
    TenureChange(TenureChangePayload),
}

impl TransactionPayload {
    pub fn token_transfer(recipient: PrincipalData, amount: u64, memo: TokenTransferMemo) -> Self {
        Self::TokenTransfer {
            recipient,
            amount,
            memo,
        }
    }

    pub fn contract_call(
        address: StacksAddress,
        contract_name: &str,
        function_name: &str,
        args: Vec<ClarityValue>,
    ) -> Result<Self, CodecError> {
        let contract = ContractId::new(address, contract_name)
            .map_err(|e| CodecError::SerializeError(e.to_string()))?;
        TransactionContractCall::new(contract, function_name, args).map(Self::ContractCall)
    }
}

fn read_principal<R: Read>(fd: &mut R) -> Result<PrincipalData, CodecError> {
    match read_next::<ClarityValue, _>(fd)? {
        ClarityValue::Principal(p) => Ok(p),
        other => Err(CodecError::DeserializeError(format!(
            "expected principal, found {}",
            other.type_name()
        ))),
    }
}

impl StacksMessageCodec for TransactionPayload {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        match self {
            Self::TokenTransfer { recipient, amount, memo } => {
                write_next(fd, &PAYLOAD_TOKEN_TRANSFER)?;
                write_next(fd, &ClarityValue::Principal(recipient.clone()))?;
                write_next(fd, amount)?;
                write_next(fd, memo)?;
            }
            Self::SmartContract(sc) => match sc.clarity_version {
                Some(version) => {
                    write_next(fd, &PAYLOAD_VERSIONED_SMART_CONTRACT)?;
                    write_next(fd, &version)?;
                    sc.serialize_body(fd)?;
                }
                None => {
                    write_next(fd, &PAYLOAD_SMART_CONTRACT)?;
                    sc.serialize_body(fd)?;
                }
            },
            Self::ContractCall(cc) => {
                write_next(fd, &PAYLOAD_CONTRACT_CALL)?;
                write_next(fd, cc)?;
            }
            Self::PoisonMicroblock(h1, h2) => {
                write_next(fd, &PAYLOAD_POISON_MICROBLOCK)?;
                write_next(fd, h1)?;
                write_next(fd, h2)?;
            }
            Self::Coinbase { payload, alt_recipient, vrf_proof } => match (alt_recipient, vrf_proof) {
                (recipient, Some(proof)) => {
                    write_next(fd, &PAYLOAD_NAKAMOTO_COINBASE)?;
                    write_next(fd, payload)?;
                    let recipient = recipient.clone().map(ClarityValue::Principal);
                    write_next(fd, &ClarityValue::from_option(recipient))?;
                    write_next(fd, proof)?;
                }
                (Some(recipient), None) => {
                    write_next(fd, &PAYLOAD_COINBASE_TO_ALT_RECIPIENT)?;
                    write_next(fd, payload)?;
                    write_next(fd, &ClarityValue::Principal(recipient.clone()))?;
                }
                (None, None) => {
                    write_next(fd, &PAYLOAD_COINBASE)?;
                    write_next(fd, payload)?;
                }
            },
            Self::TenureChange(tc) => {
                write_next(fd, &PAYLOAD_TENURE_CHANGE)?;
                write_next(fd, tc)?;
            }
        }
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let type_id: u8 = read_next(fd)?;
        let payload = match type_id {
            PAYLOAD_TOKEN_TRANSFER => Self::TokenTransfer {
                recipient: read_principal(fd)?,
                amount: read_next(fd)?,
                memo: read_next(fd)?,
            },
            PAYLOAD_SMART_CONTRACT => Self::SmartContract(TransactionSmartContract::deserialize_body(fd, None)?),
            PAYLOAD_VERSIONED_SMART_CONTRACT => {
                let version: u8 = read_next(fd)?;
                Self::SmartContract(TransactionSmartContract::deserialize_body(fd, Some(version))?)
            }
            PAYLOAD_CONTRACT_CALL => Self::ContractCall(read_next(fd)?),
            PAYLOAD_POISON_MICROBLOCK => Self::PoisonMicroblock(read_next(fd)?, read_next(fd)?),
            PAYLOAD_COINBASE => Self::Coinbase {
                payload: read_next(fd)?,
                alt_recipient: None,
                vrf_proof: None,
            },
            PAYLOAD_COINBASE_TO_ALT_RECIPIENT => Self::Coinbase {
                payload: read_next(fd)?,
                alt_recipient: Some(read_principal(fd)?),
                vrf_proof: None,
            },
            PAYLOAD_NAKAMOTO_COINBASE => {
                let payload = read_next(fd)?;
                let alt_recipient = match read_next::<ClarityValue, _>(fd)? {
                    ClarityValue::OptionalNone => None,
                    ClarityValue::OptionalSome(inner) => match *inner {
                        ClarityValue::Principal(p) => Some(p),
                        other => {
                            return Err(CodecError::DeserializeError(format!(
                                "coinbase recipient must be a principal, found {}",
                                other.type_name()
                            )))
                        }
                    },
                    other => {
                        return Err(CodecError::DeserializeError(format!(
                            "coinbase recipient must be optional, found {}",
                            other.type_name()
                        )))
                    }
                };
                Self::Coinbase {
                    payload,
                    alt_recipient,
                    vrf_proof: Some(read_next(fd)?),
                }
            }
            PAYLOAD_TENURE_CHANGE => Self::TenureChange(read_next(fd)?),
            other => {
                return Err(CodecError::DeserializeError(format!(
                    "unknown payload type {other:#04x}"
                )))
            }
        };
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::deserialize_exact;

    fn addr() -> StacksAddress {
        "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM".parse().unwrap()
    }

    fn roundtrip(payload: &TransactionPayload) -> Vec<u8> {
        let bytes = payload.serialize_to_vec().unwrap();
        assert_eq!(&deserialize_exact::<TransactionPayload>(&bytes).unwrap(), payload);
        bytes
    }

    #[test]
    fn token_transfer_layout() {
        let payload = TransactionPayload::token_transfer(
            addr().into(),
            500_000,
            TokenTransferMemo::empty(),
        );
        let bytes = roundtrip(&payload);
        // id + principal value (1 + 1 + 20) + amount + memo
        assert_eq!(bytes.len(), 1 + 22 + 8 + 34);
        assert_eq!(&bytes[..3], &[0x00, 0x05, 26]);
    }

    #[test]
    fn contract_call_roundtrip() {
        let payload = TransactionPayload::contract_call(
            "ST000000000000000000002AMW42H".parse().unwrap(),
            "pox-4",
            "stack-stx",
            vec![ClarityValue::UInt(1), ClarityValue::OptionalNone],
        )
        .unwrap();
        roundtrip(&payload);
        if let TransactionPayload::ContractCall(cc) = &payload {
            assert_eq!(
                cc.to_string(),
                "ST000000000000000000002AMW42H.pox-4::stack-stx(u1, none)"
            );
        }
    }

    #[test]
    fn contract_call_rejects_bad_function_name() {
        assert!(TransactionPayload::contract_call(addr(), "c", "has space", vec![]).is_err());
        assert!(TransactionPayload::contract_call(addr(), "c", "", vec![]).is_err());
    }

    #[test]
    fn smart_contract_versions() {
        let deploy = |clarity_version| {
            TransactionPayload::SmartContract(TransactionSmartContract {
                name: "hello".into(),
                code_body: "(define-public (hi) (ok u1))".into(),
                clarity_version,
            })
        };
        assert_eq!(roundtrip(&deploy(None))[0], PAYLOAD_SMART_CONTRACT);

        let bytes = roundtrip(&deploy(Some(2)));
        assert_eq!(bytes[..2], [PAYLOAD_VERSIONED_SMART_CONTRACT, 2]);
    }

    #[test]
    fn coinbase_variants() {
        let plain = TransactionPayload::Coinbase {
            payload: [1; 32],
            alt_recipient: None,
            vrf_proof: None,
        };
        assert_eq!(roundtrip(&plain).len(), 33);

        let alt = TransactionPayload::Coinbase {
            payload: [1; 32],
            alt_recipient: Some(addr().into()),
            vrf_proof: None,
        };
        assert_eq!(roundtrip(&alt)[0], PAYLOAD_COINBASE_TO_ALT_RECIPIENT);

        let nakamoto = TransactionPayload::Coinbase {
            payload: [1; 32],
            alt_recipient: None,
            vrf_proof: Some([7; 80]),
        };
        let bytes = roundtrip(&nakamoto);
        assert_eq!(bytes[0], PAYLOAD_NAKAMOTO_COINBASE);
        assert_eq!(bytes[33], 0x09);
        assert_eq!(bytes.len(), 1 + 32 + 1 + 80);
    }

    #[test]
    fn poison_microblock_and_tenure_change() {
        let header = MicroblockHeader {
            version: 0,
            sequence: 3,
            prev_block: [2; 32],
            tx_merkle_root: [3; 32],
            signature: [4; 65],
        };
        roundtrip(&TransactionPayload::PoisonMicroblock(header.clone(), header));

        roundtrip(&TransactionPayload::TenureChange(TenureChangePayload {
            tenure_consensus_hash: [1; 20],
            prev_tenure_consensus_hash: [2; 20],
            burn_view_consensus_hash: [3; 20],
            previous_tenure_end: [4; 32],
            previous_tenure_blocks: 12,
            cause: TenureChangeCause::Extended,
            pubkey_hash: [5; 20],
        }));
    }

    #[test]
    fn unknown_payload_rejected() {
        assert!(deserialize_exact::<TransactionPayload>(&[0x09]).is_err());
    }
}
