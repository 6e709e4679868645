//! Options to unsigned transaction.
//!
//! `preprocess` builds a placeholder with a zero signer, nonce and fee so
//! it can measure the serialized size; `payloads` builds the real thing.
//! Both go through [`build_transaction`], so the measured size matches
//! what is eventually signed.

use std::str::FromStr;

use crate::address::{ContractId, PrincipalData, StacksAddress};
use crate::config::{StacksNetwork, POX_4_CONTRACT_NAME};
use crate::crypto::Secp256k1PublicKey;
use crate::pox::{
    requires_signer_key, DelegateStxArgs, PoxAddress, SignerAuthorization, StackStxArgs, FN_DELEGATE_STX,
    FN_STACK_STX,
};
use crate::rosetta::{ConstructionOptions, OperationIntent, RosettaError, RosettaErrorKind};
use crate::transaction::{SpendingCondition, StacksTransaction, TokenTransferMemo, TransactionBuilder, TransactionPayload};

/// Chain context a stacking call needs on top of its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PoxContext {
    pub contract: ContractId,
    pub start_burn_height: u64,
    /// Required when `contract` is pox-4, ignored otherwise.
    pub signer: Option<SignerAuthorization>,
}

impl PoxContext {
    /// Worst-case stand-in used while measuring size: pox-4 with a
    /// signature present.
    pub fn placeholder(network: StacksNetwork) -> Result<Self, RosettaError> {
        let boot: StacksAddress = network
            .boot_address()
            .parse()
            .map_err(|e| RosettaError::with_message(RosettaErrorKind::UnknownError, e))?;
        let contract = ContractId::new(boot, POX_4_CONTRACT_NAME)
            .map_err(|e| RosettaError::with_message(RosettaErrorKind::UnknownError, e))?;
        Ok(Self {
            contract,
            start_burn_height: 0,
            signer: Some(SignerAuthorization {
                signer_signature: Some([0u8; 65]),
                signer_key: [0u8; 33],
                max_amount: 0,
                auth_id: 0,
            }),
        })
    }
}

pub(crate) fn parse_amount<T: FromStr>(value: &str) -> Result<T, RosettaError> {
    value
        .parse()
        .map_err(|_| RosettaError::with_message(RosettaErrorKind::InvalidAmount, format!("invalid amount '{value}'")))
}

/// A sender address that must belong to `network`.
pub(crate) fn parse_sender(address: &str, network: StacksNetwork) -> Result<StacksAddress, RosettaError> {
    StacksAddress::parse_for_network(address, network)
        .map_err(|e| RosettaError::with_message(RosettaErrorKind::InvalidSender, e))
}

/// A standard or contract principal whose address belongs to `network`.
pub(crate) fn parse_principal(
    value: &str,
    network: StacksNetwork,
    kind: RosettaErrorKind,
) -> Result<PrincipalData, RosettaError> {
    let principal: PrincipalData = value.parse().map_err(|e| RosettaError::with_message(kind, e))?;
    if !network.accepts_address_version(principal.address().version()) {
        return Err(RosettaError::with_message(
            kind,
            format!("'{value}' is not a {} address", network.as_str()),
        ));
    }
    Ok(principal)
}

pub(crate) fn parse_pox_address(value: &str, network: StacksNetwork) -> Result<PoxAddress, RosettaError> {
    PoxAddress::from_btc_address(value, network)
        .map_err(|e| RosettaError::with_message(RosettaErrorKind::InvalidParams, format!("pox_addr: {e}")))
}

/// A compressed signer public key, as the 33 bytes pox-4 stores.
pub(crate) fn parse_signer_key(value: &str) -> Result<[u8; 33], RosettaError> {
    let invalid = |reason: String| RosettaError::with_message(RosettaErrorKind::InvalidPublicKey, reason);
    let key = Secp256k1PublicKey::from_hex(value).map_err(|e| invalid(format!("signer_key: {e}")))?;
    key.to_bytes()
        .try_into()
        .map_err(|_| invalid("signer_key must be compressed".to_string()))
}

pub(crate) fn parse_signer_signature(value: &str) -> Result<[u8; 65], RosettaError> {
    hex::decode(value.trim_start_matches("0x"))
        .ok()
        .and_then(|bytes| <[u8; 65]>::try_from(bytes).ok())
        .ok_or_else(|| {
            RosettaError::with_message(
                RosettaErrorKind::InvalidSignature,
                "signer_signature must be 65 bytes of hex",
            )
        })
}

fn payload_for(
    network: StacksNetwork,
    options: &ConstructionOptions,
    pox: Option<&PoxContext>,
) -> Result<TransactionPayload, RosettaError> {
    let codec = |e: crate::codec::CodecError| RosettaError::with_message(RosettaErrorKind::InvalidParams, e);

    match &options.intent {
        OperationIntent::TokenTransfer {
            token_transfer_recipient_address,
            amount,
        } => {
            let recipient = parse_principal(
                token_transfer_recipient_address,
                network,
                RosettaErrorKind::InvalidRecipient,
            )?;
            let memo = match options.memo.as_deref() {
                Some(text) => TokenTransferMemo::from_text(text).ok_or_else(|| {
                    RosettaError::with_message(RosettaErrorKind::InvalidParams, "memo is longer than 34 bytes")
                })?,
                None => TokenTransferMemo::empty(),
            };
            Ok(TransactionPayload::token_transfer(recipient, parse_amount(amount)?, memo))
        }
        OperationIntent::StackStx {
            amount,
            number_of_cycles,
            pox_addr,
            ..
        } => {
            let pox = pox.ok_or(RosettaErrorKind::MissingContractAddress)?;
            let signer = if requires_signer_key(&pox.contract.name) {
                Some(pox.signer.clone().ok_or(RosettaErrorKind::MissingSignerKey)?)
            } else {
                None
            };
            let args = StackStxArgs {
                amount_ustx: parse_amount(amount)?,
                pox_addr: parse_pox_address(pox_addr, network)?,
                start_burn_height: u128::from(pox.start_burn_height),
                lock_period: u128::from(*number_of_cycles),
                signer,
            };
            TransactionPayload::contract_call(
                pox.contract.issuer.clone(),
                &pox.contract.name,
                FN_STACK_STX,
                args.to_clarity_args(),
            )
            .map_err(codec)
        }
        OperationIntent::DelegateStx {
            amount,
            delegate_to,
            pox_addr,
            until_burn_height,
        } => {
            let pox = pox.ok_or(RosettaErrorKind::MissingContractAddress)?;
            let args = DelegateStxArgs {
                amount_ustx: parse_amount(amount)?,
                delegate_to: parse_principal(delegate_to, network, RosettaErrorKind::InvalidParams)?,
                until_burn_height: until_burn_height.map(u128::from),
                pox_addr: pox_addr
                    .as_deref()
                    .map(|addr| parse_pox_address(addr, network))
                    .transpose()?,
            };
            TransactionPayload::contract_call(
                pox.contract.issuer.clone(),
                &pox.contract.name,
                FN_DELEGATE_STX,
                args.to_clarity_args(),
            )
            .map_err(codec)
        }
    }
}

/// Builds the unsigned transaction `options` describe.
pub(crate) fn build_transaction(
    network: StacksNetwork,
    options: &ConstructionOptions,
    origin: SpendingCondition,
    nonce: u64,
    fee: u64,
    pox: Option<&PoxContext>,
) -> Result<StacksTransaction, RosettaError> {
    let payload = payload_for(network, options, pox)?;
    TransactionBuilder::new(network)
        .origin(origin)
        .nonce(nonce)
        .fee(fee)
        .payload(payload)
        .build()
        .map_err(|e| RosettaError::with_message(RosettaErrorKind::UnknownError, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: &str = "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM";
    const RECIPIENT: &str = "STDE7Y8HV3RX8VBM2TZVWJTS7ZA1XB0SSC3NEVH0";

    fn transfer(amount: &str) -> ConstructionOptions {
        ConstructionOptions::new(
            SENDER,
            OperationIntent::TokenTransfer {
                token_transfer_recipient_address: RECIPIENT.into(),
                amount: amount.into(),
            },
        )
    }

    fn placeholder_origin() -> SpendingCondition {
        SpendingCondition::new_single_sig_from_hash([0u8; 20])
    }

    #[test]
    fn transfer_placeholder_has_fixed_size() {
        let tx = build_transaction(
            StacksNetwork::Testnet,
            &transfer("500000"),
            placeholder_origin(),
            0,
            0,
            None,
        )
        .unwrap();
        assert_eq!(tx.size().unwrap(), 180);
        assert_eq!(tx.nonce(), 0);
        assert_eq!(tx.tx_fee(), 0);
    }

    #[test]
    fn memo_must_fit() {
        let mut options = transfer("1");
        options.memo = Some("x".repeat(35));
        let err = build_transaction(StacksNetwork::Testnet, &options, placeholder_origin(), 0, 0, None).unwrap_err();
        assert_eq!(err.kind, RosettaErrorKind::InvalidParams);
    }

    #[test]
    fn recipient_on_other_network_is_rejected() {
        let options = ConstructionOptions::new(
            SENDER,
            OperationIntent::TokenTransfer {
                token_transfer_recipient_address: "SP19SH1QSCR8VMEX6SVWP33WCF08RPDY5QR4KH85G".into(),
                amount: "1".into(),
            },
        );
        let err = build_transaction(StacksNetwork::Testnet, &options, placeholder_origin(), 0, 0, None).unwrap_err();
        assert_eq!(err.kind, RosettaErrorKind::InvalidRecipient);
    }

    #[test]
    fn bad_amount_is_invalid_amount() {
        let err = build_transaction(
            StacksNetwork::Testnet,
            &transfer("lots"),
            placeholder_origin(),
            0,
            0,
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind, RosettaErrorKind::InvalidAmount);
    }

    #[test]
    fn stack_stx_needs_pox_context_and_signer() {
        let options = ConstructionOptions::new(
            SENDER,
            OperationIntent::StackStx {
                amount: "100000000000".into(),
                number_of_cycles: 2,
                pox_addr: "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r".into(),
                signer_key: None,
                signer_private_key: None,
                signer_signature: None,
                pox_max_amount: None,
                pox_auth_id: None,
            },
        );
        let err = build_transaction(StacksNetwork::Testnet, &options, placeholder_origin(), 0, 0, None).unwrap_err();
        assert_eq!(err.kind, RosettaErrorKind::MissingContractAddress);

        let mut pox = PoxContext::placeholder(StacksNetwork::Testnet).unwrap();
        let tx = build_transaction(StacksNetwork::Testnet, &options, placeholder_origin(), 0, 0, Some(&pox)).unwrap();
        match &tx.payload {
            TransactionPayload::ContractCall(call) => {
                assert_eq!(call.function_name, FN_STACK_STX);
                assert_eq!(call.function_args.len(), 8);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        pox.signer = None;
        let err = build_transaction(StacksNetwork::Testnet, &options, placeholder_origin(), 0, 0, Some(&pox)).unwrap_err();
        assert_eq!(err.kind, RosettaErrorKind::MissingSignerKey);
    }
}
