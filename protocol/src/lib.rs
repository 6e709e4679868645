// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Stacks Rosetta: Construction Core
//!
//! A stateless implementation of the Rosetta construction API for the
//! Stacks blockchain. A client turns a list of portable operations into a
//! signed, broadcast transaction without ever handing its private keys to
//! this service:
//!
//! ```text
//!   derive → preprocess → metadata → payloads → (sign offline)
//!          → combine → parse → hash → submit
//! ```
//!
//! ## Architecture
//!
//! - **codec**: the consensus (de)serialization traits.
//! - **clarity**: Clarity values and their wire encoding.
//! - **address**: c32check addresses, principals, contract ids.
//! - **crypto**: hashes, secp256k1 keys, recoverable ECDSA.
//! - **transaction**: the SIP-005 transaction, sighash and signing.
//! - **pox**: stacking contract calls and SIP-018 signer authorizations.
//! - **rosetta**: wire models, the error table, request validation.
//! - **translator**: transactions to operations and back.
//! - **backend**: the collaborator traits the pipeline reads chain
//!   state through.
//! - **service**: the construction and network endpoints.
//! - **config**: protocol constants and deployment settings.
//!
//! ## Ground rules
//!
//! 1. No state is kept between requests.
//! 2. Every collaborator call is time-bounded.
//! 3. Operation lists are ordered and only reference earlier entries.
//! 4. If it touches a signature, it has a fixed test vector.

pub mod address;
pub mod backend;
pub mod clarity;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod pox;
pub mod rosetta;
pub mod service;
pub mod transaction;
pub mod translator;

pub use config::{RosettaConfig, StacksNetwork};
pub use rosetta::{RosettaError, RosettaErrorKind};
pub use service::RosettaService;
