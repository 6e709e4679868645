//! A transaction reduced to the fields the translator reads.
//!
//! [`BaseTx`] is built straight from a decoded [`StacksTransaction`] (what
//! `construction/parse` and `construction/hash` see) or filled in by an
//! indexer that already knows the call result and confirmation status.

use crate::address::ContractId;
use crate::clarity::ClarityValue;
use crate::rosetta::OperationStatus;
use crate::transaction::{is_signed, StacksTransaction, TransactionPayload};

use super::TranslateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseTxPayload {
    TokenTransfer {
        recipient: String,
        amount: u64,
        /// Memo text, trailing zero bytes stripped. `None` when empty.
        memo: Option<String>,
    },
    ContractCall {
        contract: ContractId,
        function_name: String,
        function_args: Vec<ClarityValue>,
        /// Known once the transaction has executed.
        result: Option<ClarityValue>,
    },
    SmartContract {
        contract_id: String,
    },
    Coinbase {
        alt_recipient: Option<String>,
    },
    PoisonMicroblock,
    TenureChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTx {
    /// `0x`-prefixed txid.
    pub tx_id: String,
    pub sender_address: String,
    pub sponsor_address: Option<String>,
    pub sponsored: bool,
    pub fee: u64,
    pub nonce: u64,
    pub signed: bool,
    /// `None` until the transaction has been mined.
    pub status: Option<OperationStatus>,
    pub payload: BaseTxPayload,
}

impl BaseTx {
    pub fn from_transaction(tx: &StacksTransaction) -> Result<Self, TranslateError> {
        let sender = tx.origin_address();
        let payload = match &tx.payload {
            TransactionPayload::TokenTransfer {
                recipient,
                amount,
                memo,
            } => BaseTxPayload::TokenTransfer {
                recipient: recipient.to_string(),
                amount: *amount,
                memo: memo.to_text(),
            },
            TransactionPayload::ContractCall(call) => BaseTxPayload::ContractCall {
                contract: call.contract.clone(),
                function_name: call.function_name.clone(),
                function_args: call.function_args.clone(),
                result: None,
            },
            TransactionPayload::SmartContract(deploy) => BaseTxPayload::SmartContract {
                contract_id: format!("{sender}.{}", deploy.name),
            },
            TransactionPayload::Coinbase { alt_recipient, .. } => BaseTxPayload::Coinbase {
                alt_recipient: alt_recipient.as_ref().map(ToString::to_string),
            },
            TransactionPayload::PoisonMicroblock(..) => BaseTxPayload::PoisonMicroblock,
            TransactionPayload::TenureChange(_) => BaseTxPayload::TenureChange,
        };

        Ok(Self {
            tx_id: tx.txid()?.to_hex_prefixed(),
            sender_address: sender.to_string(),
            sponsor_address: tx.sponsor_address().map(|a| a.to_string()),
            sponsored: tx.is_sponsored(),
            fee: tx.tx_fee(),
            nonce: tx.nonce(),
            signed: is_signed(tx),
            status: None,
            payload,
        })
    }

    /// Account that pays the fee.
    pub fn fee_payer(&self) -> &str {
        match (&self.sponsor_address, self.sponsored) {
            (Some(sponsor), true) => sponsor,
            _ => &self.sender_address,
        }
    }

    pub fn is_token_transfer(&self) -> bool {
        matches!(self.payload, BaseTxPayload::TokenTransfer { .. })
    }
}

/// Decodes raw transaction hex (with or without `0x`).
pub fn decode(raw: &str) -> Result<BaseTx, TranslateError> {
    let tx = StacksTransaction::from_hex(raw)?;
    BaseTx::from_transaction(&tx)
}
