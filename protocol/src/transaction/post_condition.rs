//! Post-conditions: assertions about asset movement checked after the
//! payload runs.
//!
//! The construction API always emits an empty list in `deny` mode, but any
//! transaction handed to `parse`, `hash` or `combine` may carry them, so
//! they have to survive a decode/encode round trip byte for byte.

use std::io::{Read, Write};

use crate::address::{ContractId, StacksAddress};
use crate::clarity::{read_address, write_address, ClarityValue};
use crate::codec::{read_name, read_next, write_next, write_u8_prefixed, CodecError, StacksMessageCodec};

const ASSET_INFO_STX: u8 = 0x00;
const ASSET_INFO_FUNGIBLE: u8 = 0x01;
const ASSET_INFO_NONFUNGIBLE: u8 = 0x02;

const PRINCIPAL_ORIGIN: u8 = 0x01;
const PRINCIPAL_STANDARD: u8 = 0x02;
const PRINCIPAL_CONTRACT: u8 = 0x03;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostConditionPrincipal {
    /// Whoever signed as origin.
    Origin,
    Standard(StacksAddress),
    Contract(ContractId),
}

impl StacksMessageCodec for PostConditionPrincipal {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        match self {
            Self::Origin => write_next(fd, &PRINCIPAL_ORIGIN),
            Self::Standard(addr) => {
                write_next(fd, &PRINCIPAL_STANDARD)?;
                write_address(fd, addr)
            }
            Self::Contract(id) => {
                write_next(fd, &PRINCIPAL_CONTRACT)?;
                write_address(fd, &id.issuer)?;
                write_u8_prefixed(fd, id.name.as_bytes())
            }
        }
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let id: u8 = read_next(fd)?;
        match id {
            PRINCIPAL_ORIGIN => Ok(Self::Origin),
            PRINCIPAL_STANDARD => Ok(Self::Standard(read_address(fd)?)),
            PRINCIPAL_CONTRACT => {
                let issuer = read_address(fd)?;
                let name = read_name(fd, "contract name")?;
                ContractId::new(issuer, name)
                    .map(Self::Contract)
                    .map_err(|e| CodecError::DeserializeError(e.to_string()))
            }
            other => Err(CodecError::DeserializeError(format!(
                "unknown post-condition principal {other:#04x}"
            ))),
        }
    }
}

/// `<contract>::<asset-name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub contract: ContractId,
    pub asset_name: String,
}

impl StacksMessageCodec for AssetInfo {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_address(fd, &self.contract.issuer)?;
        write_u8_prefixed(fd, self.contract.name.as_bytes())?;
        write_u8_prefixed(fd, self.asset_name.as_bytes())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let issuer = read_address(fd)?;
        let name = read_name(fd, "contract name")?;
        let asset_name = read_name(fd, "asset name")?;
        let contract =
            ContractId::new(issuer, name).map_err(|e| CodecError::DeserializeError(e.to_string()))?;
        Ok(Self { contract, asset_name })
    }
}

/// Condition codes are one byte; fungible codes compare amounts and
/// non-fungible codes assert whether the token left the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionCode(pub u8);

impl ConditionCode {
    pub const SENT_EQ: Self = Self(0x01);
    pub const SENT_GT: Self = Self(0x02);
    pub const SENT_GE: Self = Self(0x03);
    pub const SENT_LT: Self = Self(0x04);
    pub const SENT_LE: Self = Self(0x05);
    pub const NFT_SENT: Self = Self(0x10);
    pub const NFT_NOT_SENT: Self = Self(0x11);

    fn is_fungible(&self) -> bool {
        (0x01..=0x05).contains(&self.0)
    }

    fn is_nonfungible(&self) -> bool {
        matches!(self.0, 0x10 | 0x11)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCondition {
    Stx {
        principal: PostConditionPrincipal,
        code: ConditionCode,
        amount: u64,
    },
    Fungible {
        principal: PostConditionPrincipal,
        asset: AssetInfo,
        code: ConditionCode,
        amount: u64,
    },
    Nonfungible {
        principal: PostConditionPrincipal,
        asset: AssetInfo,
        asset_value: ClarityValue,
        code: ConditionCode,
    },
}

fn read_code<R: Read>(fd: &mut R, fungible: bool) -> Result<ConditionCode, CodecError> {
    let code = ConditionCode(read_next(fd)?);
    let valid = if fungible { code.is_fungible() } else { code.is_nonfungible() };
    if !valid {
        return Err(CodecError::DeserializeError(format!(
            "invalid condition code {:#04x}",
            code.0
        )));
    }
    Ok(code)
}

impl StacksMessageCodec for PostCondition {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        match self {
            Self::Stx { principal, code, amount } => {
                write_next(fd, &ASSET_INFO_STX)?;
                write_next(fd, principal)?;
                write_next(fd, &code.0)?;
                write_next(fd, amount)
            }
            Self::Fungible { principal, asset, code, amount } => {
                write_next(fd, &ASSET_INFO_FUNGIBLE)?;
                write_next(fd, principal)?;
                write_next(fd, asset)?;
                write_next(fd, &code.0)?;
                write_next(fd, amount)
            }
            Self::Nonfungible { principal, asset, asset_value, code } => {
                write_next(fd, &ASSET_INFO_NONFUNGIBLE)?;
                write_next(fd, principal)?;
                write_next(fd, asset)?;
                write_next(fd, asset_value)?;
                write_next(fd, &code.0)
            }
        }
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let asset_info_id: u8 = read_next(fd)?;
        match asset_info_id {
            ASSET_INFO_STX => Ok(Self::Stx {
                principal: read_next(fd)?,
                code: read_code(fd, true)?,
                amount: read_next(fd)?,
            }),
            ASSET_INFO_FUNGIBLE => Ok(Self::Fungible {
                principal: read_next(fd)?,
                asset: read_next(fd)?,
                code: read_code(fd, true)?,
                amount: read_next(fd)?,
            }),
            ASSET_INFO_NONFUNGIBLE => Ok(Self::Nonfungible {
                principal: read_next(fd)?,
                asset: read_next(fd)?,
                asset_value: read_next(fd)?,
                code: read_code(fd, false)?,
            }),
            other => Err(CodecError::DeserializeError(format!(
                "unknown asset info id {other:#04x}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::deserialize_exact;

    fn token() -> AssetInfo {
        AssetInfo {
            contract: "SP3FBR2AGK5H9QBDH3EEN6DF8EK8JY7RX8QJ5SVTE.my-token".parse().unwrap(),
            asset_name: "token".to_string(),
        }
    }

    #[test]
    fn stx_condition_layout() {
        let pc = PostCondition::Stx {
            principal: PostConditionPrincipal::Origin,
            code: ConditionCode::SENT_LE,
            amount: 1000,
        };
        let bytes = pc.serialize_to_vec().unwrap();
        assert_eq!(bytes[..3], [ASSET_INFO_STX, PRINCIPAL_ORIGIN, 0x05]);
        assert_eq!(&bytes[3..], &1000u64.to_be_bytes());
        assert_eq!(deserialize_exact::<PostCondition>(&bytes).unwrap(), pc);
    }

    #[test]
    fn fungible_and_nft_conditions_roundtrip() {
        let ft = PostCondition::Fungible {
            principal: PostConditionPrincipal::Standard(
                "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM".parse().unwrap(),
            ),
            asset: token(),
            code: ConditionCode::SENT_GE,
            amount: 5,
        };
        let nft = PostCondition::Nonfungible {
            principal: PostConditionPrincipal::Contract(token().contract),
            asset: token(),
            asset_value: ClarityValue::UInt(42),
            code: ConditionCode::NFT_NOT_SENT,
        };
        for pc in [ft, nft] {
            let bytes = pc.serialize_to_vec().unwrap();
            assert_eq!(deserialize_exact::<PostCondition>(&bytes).unwrap(), pc);
        }
    }

    #[test]
    fn mismatched_condition_code_rejected() {
        // STX condition carrying an NFT code.
        let bytes = [ASSET_INFO_STX, PRINCIPAL_ORIGIN, 0x10, 0, 0, 0, 0, 0, 0, 0, 1];
        assert!(deserialize_exact::<PostCondition>(&bytes).is_err());
    }
}
