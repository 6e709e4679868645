//! # External Collaborators
//!
//! The construction pipeline reads chain state through three narrow
//! traits and never talks to a network or database directly:
//!
//! - [`TransactionStore`]: account nonces and the recent block hash.
//! - [`NodeRpc`]: PoX parameters, fee rate, node status, broadcast.
//! - [`TokenMetadataResolver`]: symbol/decimals for fungible tokens.
//!
//! Every call made by the pipeline is wrapped in [`with_timeout`]; an
//! elapsed timer surfaces as [`CollaboratorError::Timeout`], which the
//! pipeline reports as a retriable unknown error.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::DEFAULT_FEE_RATE;
use crate::rosetta::Currency;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("collaborator call timed out after {0:?}")]
    Timeout(Duration),

    /// The node refused a broadcast. Carries the node's reason verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("malformed collaborator response: {0}")]
    Malformed(String),
}

/// Bounds `fut` by `timeout`.
pub async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(timeout)),
    }
}

// ---------------------------------------------------------------------------
// Chain data
// ---------------------------------------------------------------------------

/// The PoX parameters `metadata` needs for stacking operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoxInfo {
    /// `{boot address}.{pox contract name}` of the active contract.
    pub contract_id: String,
    pub current_burnchain_block_height: u64,
    pub reward_cycle_id: u64,
    pub reward_cycle_length: u64,
    /// Smallest amount that can be stacked solo this cycle.
    pub min_amount_ustx: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub server_version: String,
    pub stacks_tip_height: u64,
    /// `0x`-prefixed block hash of the tip.
    pub stacks_tip: String,
    pub burn_block_height: u64,
    pub genesis_chainstate_hash: String,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Next nonce the account should use.
    async fn get_nonce(&self, address: &str) -> Result<u64, CollaboratorError>;

    /// Hash of a recent block, `0x`-prefixed.
    async fn get_recent_block_hash(&self) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn get_pox_info(&self) -> Result<PoxInfo, CollaboratorError>;

    /// Fee rate in µSTX per serialized byte.
    async fn get_fee_rate(&self) -> Result<u64, CollaboratorError> {
        Ok(DEFAULT_FEE_RATE)
    }

    async fn get_node_info(&self) -> Result<NodeInfo, CollaboratorError>;

    /// Broadcasts raw transaction bytes and returns the node's txid.
    async fn broadcast(&self, tx: &[u8]) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait TokenMetadataResolver: Send + Sync {
    /// Currency of the fungible token `asset_identifier`
    /// (`{contract}::{token}`).
    async fn resolve(&self, asset_identifier: &str) -> Result<Currency, CollaboratorError>;
}

// ---------------------------------------------------------------------------
// CachedTokenMetadata
// ---------------------------------------------------------------------------

/// Read-through cache in front of a [`TokenMetadataResolver`].
///
/// Lookups never hold a lock across the inner call, so two concurrent
/// misses on the same asset may both reach the inner resolver. The
/// second insert overwrites the first with an equal value.
pub struct CachedTokenMetadata<R> {
    inner: R,
    cache: DashMap<String, Currency>,
}

impl<R: TokenMetadataResolver> CachedTokenMetadata<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[async_trait]
impl<R: TokenMetadataResolver> TokenMetadataResolver for CachedTokenMetadata<R> {
    async fn resolve(&self, asset_identifier: &str) -> Result<Currency, CollaboratorError> {
        if let Some(hit) = self.cache.get(asset_identifier) {
            return Ok(hit.clone());
        }
        let currency = self.inner.resolve(asset_identifier).await?;
        debug!(asset = asset_identifier, symbol = %currency.symbol, "cached token metadata");
        self.cache.insert(asset_identifier.to_string(), currency.clone());
        Ok(currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingResolver {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TokenMetadataResolver for CountingResolver {
        async fn resolve(&self, asset_identifier: &str) -> Result<Currency, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if asset_identifier.ends_with("::missing") {
                return Err(CollaboratorError::NotFound(asset_identifier.to_string()));
            }
            Ok(Currency {
                symbol: "USDA".to_string(),
                decimals: 6,
                metadata: None,
            })
        }
    }

    #[tokio::test]
    async fn cache_hits_skip_the_inner_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedTokenMetadata::new(CountingResolver { calls: calls.clone() });

        let asset = "SP2C2YFP12AJZB4MABJBAJ55XECVS7E4PMMZ89YZR.usda-token::usda";
        assert_eq!(cached.resolve(asset).await.unwrap().symbol, "USDA");
        assert_eq!(cached.resolve(asset).await.unwrap().decimals, 6);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedTokenMetadata::new(CountingResolver { calls: calls.clone() });

        assert!(cached.resolve("SP000.token::missing").await.is_err());
        assert!(cached.resolve("SP000.token::missing").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, CollaboratorError>(1u64)
        };
        let err = with_timeout(Duration::from_secs(1), slow).await.unwrap_err();
        assert_eq!(err, CollaboratorError::Timeout(Duration::from_secs(1)));

        let fast = async { Ok::<_, CollaboratorError>(7u64) };
        assert_eq!(with_timeout(Duration::from_secs(1), fast).await.unwrap(), 7);
    }
}
