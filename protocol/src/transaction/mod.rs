//! # Transaction Module
//!
//! The Stacks transaction wire format, plus the unsigned-build, presign,
//! splice and verify steps the construction API is made of.
//!
//! ## Architecture
//!
//! ```text
//! types.rs         : one-byte wire enums, Txid, MessageSignature, memo
//! auth.rs          : spending conditions and standard/sponsored auth
//! post_condition.rs: STX / fungible / non-fungible post-conditions
//! payload.rs       : token transfer, contract call, deploy, coinbase, ...
//! builder.rs       : StacksTransaction and the fluent TransactionBuilder
//! signing.rs       : presign digest, signature splicing, local signing
//! verification.rs  : TransactionError and origin signature recovery
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] assembles an unsigned transaction
//!    with an empty origin signature.
//! 2. **Digest**: [`presign_digest`] yields the 32 bytes the key holder
//!    signs offline.
//! 3. **Splice**: [`splice_origin_signature`] writes the VRS signature in.
//! 4. **Verify**: [`verify_origin`] recovers the signer and checks it
//!    against the origin's HASH160.
//!
//! The txid is SHA-512/256 of the full serialized transaction, signature
//! included, so it changes when the transaction is signed.

pub mod auth;
pub mod builder;
pub mod payload;
pub mod post_condition;
pub mod signing;
pub mod types;
pub mod verification;

pub use auth::{SpendingCondition, TransactionAuth};
pub use builder::{StacksTransaction, TransactionBuilder};
pub use payload::{TransactionContractCall, TransactionPayload};
pub use post_condition::PostCondition;
pub use signing::{is_signed, presign_digest, sign_origin, splice_origin_signature};
pub use types::{AnchorMode, MessageSignature, PostConditionMode, TokenTransferMemo, Txid};
pub use verification::{verify_origin, TransactionError};
