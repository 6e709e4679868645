//! The context threaded between construction steps.
//!
//! `preprocess` emits [`ConstructionOptions`], the client passes them to
//! `metadata` unchanged, and `metadata` returns [`ConstructionMetadata`]
//! (the options plus everything read from the chain) for `payloads`. The
//! server keeps nothing between calls.
//!
//! The options are a sum type keyed by `type`:
//!
//! ```json
//! { "type": "token_transfer", "sender_address": "ST..",
//!   "token_transfer_recipient_address": "ST..", "amount": "1000", "size": 180 }
//! ```

use serde::{Deserialize, Serialize};

use super::models::OperationType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationIntent {
    TokenTransfer {
        token_transfer_recipient_address: String,
        /// Positive µSTX amount.
        amount: String,
    },
    StackStx {
        amount: String,
        number_of_cycles: u32,
        /// Bitcoin reward address.
        pox_addr: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signer_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signer_private_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signer_signature: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pox_max_amount: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pox_auth_id: Option<String>,
    },
    DelegateStx {
        amount: String,
        delegate_to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pox_addr: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        until_burn_height: Option<u64>,
    },
}

impl OperationIntent {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::TokenTransfer { .. } => OperationType::TokenTransfer,
            Self::StackStx { .. } => OperationType::StackStx,
            Self::DelegateStx { .. } => OperationType::DelegateStx,
        }
    }

    pub fn amount(&self) -> &str {
        match self {
            Self::TokenTransfer { amount, .. }
            | Self::StackStx { amount, .. }
            | Self::DelegateStx { amount, .. } => amount,
        }
    }

    pub fn is_stacking(&self) -> bool {
        matches!(self, Self::StackStx { .. } | Self::DelegateStx { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionOptions {
    pub sender_address: String,
    #[serde(flatten)]
    pub intent: OperationIntent,
    /// Fee from a `fee` operation, as a positive µSTX string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee: Option<String>,
    /// Serialized size of the placeholder transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fee_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl ConstructionOptions {
    pub fn new(sender_address: impl Into<String>, intent: OperationIntent) -> Self {
        Self {
            sender_address: sender_address.into(),
            intent,
            fee: None,
            max_fee: None,
            size: None,
            symbol: None,
            decimals: None,
            suggested_fee_multiplier: None,
            memo: None,
        }
    }
}

/// Output of `metadata`, input of `payloads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionMetadata {
    pub options: ConstructionOptions,
    pub account_sequence: u64,
    pub recent_block_hash: String,
    /// Suggested fee in µSTX.
    pub fee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn_block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_cycle_id: Option<u64>,
    /// RSV hex of the pox-4 signer authorization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pox_auth_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pox_max_amount: Option<String>,
}
