//! # Construction Service
//!
//! [`RosettaService`] runs the eight construction steps and the three
//! network endpoints. It holds no per-request state: everything a later
//! step needs travels through the client as `options` or `metadata`.
//!
//! ```text
//!   derive ─► preprocess ─► metadata ─► payloads ─► (client signs)
//!                              │
//!                    store + node RPC
//!
//!   combine ─► hash ─► submit ──► node RPC
//!      parse: any time, signed or unsigned
//! ```
//!
//! Module errors (`TranslateError`, `CollaboratorError`) become
//! [`RosettaError`]s here, at the step boundary.

mod build;
mod construction;
mod fees;
mod network;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::backend::{with_timeout, CollaboratorError, NodeRpc, TokenMetadataResolver, TransactionStore};
use crate::config::RosettaConfig;
use crate::rosetta::{NetworkIdentifier, RosettaError, RosettaErrorKind};
use crate::translator::{OperationTranslator, TranslateError};

impl From<TranslateError> for RosettaError {
    fn from(err: TranslateError) -> Self {
        let kind = match &err {
            TranslateError::InvalidOperations(_) | TranslateError::UnsupportedOperation(_) => {
                RosettaErrorKind::InvalidOperation
            }
            TranslateError::Transaction(_) | TranslateError::Codec(_) => RosettaErrorKind::InvalidTransactionString,
            TranslateError::AmountOverflow(_) => RosettaErrorKind::InvalidAmount,
            TranslateError::TokenMetadata { .. } => RosettaErrorKind::UnknownError,
        };
        RosettaError::with_message(kind, err)
    }
}

impl From<CollaboratorError> for RosettaError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            // The node's own words are the most useful detail a client can get.
            CollaboratorError::Rejected(reason) => {
                RosettaError::with_message(RosettaErrorKind::InvalidTransactionString, reason)
            }
            other => RosettaError::with_message(RosettaErrorKind::UnknownError, other),
        }
    }
}

/// The construction API over a pair of collaborators.
#[derive(Clone)]
pub struct RosettaService {
    config: RosettaConfig,
    store: Arc<dyn TransactionStore>,
    rpc: Arc<dyn NodeRpc>,
    translator: OperationTranslator,
}

impl fmt::Debug for RosettaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosettaService")
            .field("config", &self.config)
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

impl RosettaService {
    pub fn new(config: RosettaConfig, store: Arc<dyn TransactionStore>, rpc: Arc<dyn NodeRpc>) -> Self {
        let translator = OperationTranslator::new(&config);
        Self {
            config,
            store,
            rpc,
            translator,
        }
    }

    /// Resolves fungible-token currencies in `parse` output.
    pub fn with_token_metadata(mut self, resolver: Arc<dyn TokenMetadataResolver>) -> Self {
        self.translator = self.translator.with_token_metadata(resolver);
        self
    }

    pub fn config(&self) -> &RosettaConfig {
        &self.config
    }

    pub fn translator(&self) -> &OperationTranslator {
        &self.translator
    }

    /// Typed counterpart of the network check in request validation, for
    /// callers that skip the JSON layer.
    fn check_network(&self, id: &NetworkIdentifier) -> Result<(), RosettaError> {
        if id.blockchain != self.config.blockchain() {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidBlockchain,
                format!("expected '{}', got '{}'", self.config.blockchain(), id.blockchain),
            ));
        }
        if id.network != self.config.network.as_str() {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidNetwork,
                format!("expected '{}', got '{}'", self.config.network.as_str(), id.network),
            ));
        }
        Ok(())
    }

    /// Runs a collaborator call under the configured timeout.
    async fn call<T, F>(&self, fut: F) -> Result<T, RosettaError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        with_timeout(self.config.collaborator_timeout, fut)
            .await
            .map_err(RosettaError::from)
    }
}
