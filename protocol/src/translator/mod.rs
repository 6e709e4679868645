//! # Operation Translator
//!
//! Native transactions to portable Rosetta operations and back.
//!
//! ```text
//!   StacksTransaction ──► BaseTx ──► to_operations ──► [Operation]
//!                                      ▲ events, miner rewards, unlocks
//!
//!   [Operation] ──► from_operations ──► ConstructionOptions
//! ```
//!
//! Operation lists are ordered: the fee (if any) is index 0, every index is
//! one more than the previous, and `related_operations` only ever point
//! backwards.

mod base_tx;
mod events;
mod from_operations;
mod to_operations;

pub use base_tx::{decode, BaseTx, BaseTxPayload};
pub use events::{MinerReward, StxUnlockEvent, TxContext, TxEvent};
pub use from_operations::{from_operations, validate_operation_graph};
pub use to_operations::OperationTranslator;

use thiserror::Error;

use crate::codec::CodecError;
use crate::rosetta::OperationType;
use crate::transaction::TransactionError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid operations: {0}")]
    InvalidOperations(String),

    #[error("unsupported operation type '{}'", .0.as_str())]
    UnsupportedOperation(OperationType),

    #[error("amount {0} does not fit a signed 128-bit value")]
    AmountOverflow(u128),

    #[error("token metadata for {asset} unavailable: {reason}")]
    TokenMetadata { asset: String, reason: String },
}
