//! Chain events that can accompany a transaction.
//!
//! An indexer supplies these when it has them. `construction/parse` never
//! does: it only sees the raw transaction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TxEvent {
    StxTransfer {
        sender: String,
        recipient: String,
        amount: u128,
    },
    StxMint {
        recipient: String,
        amount: u128,
    },
    StxBurn {
        sender: String,
        amount: u128,
    },
    StxLock {
        locked_address: String,
        locked_amount: u128,
        unlock_height: u64,
    },
    FtTransfer {
        asset_identifier: String,
        sender: String,
        recipient: String,
        amount: u128,
    },
    FtMint {
        asset_identifier: String,
        recipient: String,
        amount: u128,
    },
    FtBurn {
        asset_identifier: String,
        sender: String,
        amount: u128,
    },
    NftTransfer {
        asset_identifier: String,
        sender: String,
        recipient: String,
        /// Hex of the serialized Clarity identifier.
        value: String,
    },
    NftMint {
        asset_identifier: String,
        recipient: String,
        value: String,
    },
    NftBurn {
        asset_identifier: String,
        sender: String,
        value: String,
    },
    ContractLog {
        contract_id: String,
        topic: String,
        value: String,
    },
}

impl TxEvent {
    /// NFT movements and contract logs do not change any balance.
    pub fn affects_balances(&self) -> bool {
        !matches!(
            self,
            Self::NftTransfer { .. } | Self::NftMint { .. } | Self::NftBurn { .. } | Self::ContractLog { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerReward {
    pub recipient: String,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StxUnlockEvent {
    pub address: String,
    pub amount: u128,
}

/// Everything known about a transaction beyond its own bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxContext<'a> {
    pub events: &'a [TxEvent],
    pub miner_rewards: &'a [MinerReward],
    pub unlock_events: &'a [StxUnlockEvent],
}

impl<'a> TxContext<'a> {
    pub fn with_events(events: &'a [TxEvent]) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }
}
