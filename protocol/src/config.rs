//! # Chain Constants & Runtime Configuration
//!
//! Every magic number the construction API depends on lives here: chain
//! ids, address versions, the native currency, boot contract locations and
//! fee floors. Runtime knobs that differ between deployments (which
//! network, how strict to be about token metadata, how long to wait on the
//! node) are grouped in [`RosettaConfig`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Rosetta Identity
// ---------------------------------------------------------------------------

/// `network_identifier.blockchain` for every request and response.
pub const BLOCKCHAIN: &str = "stacks";

/// Rosetta API version implemented by this crate.
pub const ROSETTA_VERSION: &str = "1.4.6";

/// Version reported as `middleware_version` in `/network/options`.
pub const MIDDLEWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Wire-format Versions
// ---------------------------------------------------------------------------

pub const TX_VERSION_MAINNET: u8 = 0x00;
pub const TX_VERSION_TESTNET: u8 = 0x80;

pub const CHAIN_ID_MAINNET: u32 = 0x0000_0001;
pub const CHAIN_ID_TESTNET: u32 = 0x8000_0000;

/// c32 address versions. The leading character of an address after `S`
/// is the c32 digit of the version: `P`/`M` on mainnet, `T`/`N` on testnet.
pub const ADDRESS_VERSION_MAINNET_SINGLESIG: u8 = 22;
pub const ADDRESS_VERSION_MAINNET_MULTISIG: u8 = 20;
pub const ADDRESS_VERSION_TESTNET_SINGLESIG: u8 = 26;
pub const ADDRESS_VERSION_TESTNET_MULTISIG: u8 = 21;

/// Base58check versions for PoX reward addresses.
pub const BTC_P2PKH_VERSION_MAINNET: u8 = 0x00;
pub const BTC_P2SH_VERSION_MAINNET: u8 = 0x05;
pub const BTC_P2PKH_VERSION_TESTNET: u8 = 0x6f;
pub const BTC_P2SH_VERSION_TESTNET: u8 = 0xc4;

// ---------------------------------------------------------------------------
// Native Currency
// ---------------------------------------------------------------------------

pub const STX_SYMBOL: &str = "STX";

/// 1 STX = 1,000,000 µSTX.
pub const STX_DECIMALS: u32 = 6;

// ---------------------------------------------------------------------------
// Fees & Limits
// ---------------------------------------------------------------------------

/// Lowest fee, in µSTX, that a suggested fee is ever allowed to reach.
pub const MIN_TX_FEE: u64 = 180;

/// Fee rate (µSTX per byte) assumed when the node does not report one.
pub const DEFAULT_FEE_RATE: u64 = 1;

/// `preprocess` accepts at most this many operations (fee, debit, credit).
pub const MAX_CONSTRUCTION_OPERATIONS: usize = 3;

/// Token-transfer memos are fixed-width on the wire.
pub const TOKEN_TRANSFER_MEMO_LENGTH: usize = 34;

/// Collaborator calls that run longer than this fail as retriable errors.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Boot Contracts
// ---------------------------------------------------------------------------

pub const BOOT_ADDRESS_MAINNET: &str = "SP000000000000000000002Q6VF78";
pub const BOOT_ADDRESS_TESTNET: &str = "ST000000000000000000002AMW42H";

/// Every PoX contract generation deployed under the boot address.
pub const POX_CONTRACT_NAMES: [&str; 4] = ["pox", "pox-2", "pox-3", "pox-4"];

/// The generation that takes signer authorizations.
pub const POX_4_CONTRACT_NAME: &str = "pox-4";

pub const SEND_MANY_MEMO_MAINNET: &str = "SP3FBR2AGK5H9QBDH3EEN6DF8EK8JY7RX8QJ5SVTE.send-many-memo";
pub const SEND_MANY_MEMO_TESTNET: &str = "ST3F1X4QGV2SM8XD96X45M6RTQXKA1PZJZZCQAB4B.send-many-memo";

// ---------------------------------------------------------------------------
// SIP-018 Signer Authorizations
// ---------------------------------------------------------------------------

/// Prefix hashed in front of every SIP-018 structured-data message.
pub const SIP018_PREFIX: &[u8] = b"SIP018";

pub const POX_4_SIGNER_DOMAIN_NAME: &str = "pox-4-signer";
pub const POX_4_SIGNER_DOMAIN_VERSION: &str = "1.0.0";

/// Topic string for `stack-stx` signer authorizations.
pub const POX_4_TOPIC_STACK_STX: &str = "stack-stx";

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// The single network a deployment serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StacksNetwork {
    Mainnet,
    Testnet,
}

impl StacksNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, Self::Mainnet)
    }

    pub fn transaction_version(&self) -> u8 {
        match self {
            Self::Mainnet => TX_VERSION_MAINNET,
            Self::Testnet => TX_VERSION_TESTNET,
        }
    }

    pub fn chain_id(&self) -> u32 {
        match self {
            Self::Mainnet => CHAIN_ID_MAINNET,
            Self::Testnet => CHAIN_ID_TESTNET,
        }
    }

    pub fn single_sig_address_version(&self) -> u8 {
        match self {
            Self::Mainnet => ADDRESS_VERSION_MAINNET_SINGLESIG,
            Self::Testnet => ADDRESS_VERSION_TESTNET_SINGLESIG,
        }
    }

    pub fn multi_sig_address_version(&self) -> u8 {
        match self {
            Self::Mainnet => ADDRESS_VERSION_MAINNET_MULTISIG,
            Self::Testnet => ADDRESS_VERSION_TESTNET_MULTISIG,
        }
    }

    /// Whether `version` is one of this network's address versions.
    pub fn accepts_address_version(&self, version: u8) -> bool {
        version == self.single_sig_address_version() || version == self.multi_sig_address_version()
    }

    /// Network whose transactions carry this version byte.
    pub fn from_transaction_version(version: u8) -> Option<Self> {
        match version {
            TX_VERSION_MAINNET => Some(Self::Mainnet),
            TX_VERSION_TESTNET => Some(Self::Testnet),
            _ => None,
        }
    }

    pub fn boot_address(&self) -> &'static str {
        match self {
            Self::Mainnet => BOOT_ADDRESS_MAINNET,
            Self::Testnet => BOOT_ADDRESS_TESTNET,
        }
    }

    pub fn send_many_memo_contract(&self) -> &'static str {
        match self {
            Self::Mainnet => SEND_MANY_MEMO_MAINNET,
            Self::Testnet => SEND_MANY_MEMO_TESTNET,
        }
    }

    pub fn btc_p2pkh_version(&self) -> u8 {
        match self {
            Self::Mainnet => BTC_P2PKH_VERSION_MAINNET,
            Self::Testnet => BTC_P2PKH_VERSION_TESTNET,
        }
    }

    pub fn btc_p2sh_version(&self) -> u8 {
        match self {
            Self::Mainnet => BTC_P2SH_VERSION_MAINNET,
            Self::Testnet => BTC_P2SH_VERSION_TESTNET,
        }
    }
}

impl fmt::Display for StacksNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StacksNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(format!("unknown network '{other}' (expected mainnet or testnet)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// What to do with a fungible-token event whose metadata cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FtMetadataMode {
    /// Drop the event and log a warning.
    #[default]
    Warn,
    /// Fail the whole translation.
    Strict,
}

impl FromStr for FtMetadataMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown ft metadata mode '{other}' (expected warn or strict)")),
        }
    }
}

/// Deployment-specific settings shared by every construction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosettaConfig {
    pub network: StacksNetwork,
    pub ft_metadata_mode: FtMetadataMode,
    pub collaborator_timeout: Duration,
}

impl RosettaConfig {
    pub fn new(network: StacksNetwork) -> Self {
        Self {
            network,
            ft_metadata_mode: FtMetadataMode::default(),
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    pub fn with_ft_metadata_mode(mut self, mode: FtMetadataMode) -> Self {
        self.ft_metadata_mode = mode;
        self
    }

    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }

    pub fn blockchain(&self) -> &'static str {
        BLOCKCHAIN
    }
}

impl Default for RosettaConfig {
    fn default() -> Self {
        Self::new(StacksNetwork::Testnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_versions_are_distinct() {
        let versions = [
            ADDRESS_VERSION_MAINNET_SINGLESIG,
            ADDRESS_VERSION_MAINNET_MULTISIG,
            ADDRESS_VERSION_TESTNET_SINGLESIG,
            ADDRESS_VERSION_TESTNET_MULTISIG,
        ];
        for (i, a) in versions.iter().enumerate() {
            for b in &versions[i + 1..] {
                assert_ne!(a, b);
            }
            // c32 digits only go up to 31.
            assert!(*a < 32);
        }
    }

    #[test]
    fn test_network_parsing() {
        assert_eq!("mainnet".parse::<StacksNetwork>().unwrap(), StacksNetwork::Mainnet);
        assert_eq!("TESTNET".parse::<StacksNetwork>().unwrap(), StacksNetwork::Testnet);
        assert!("devnet".parse::<StacksNetwork>().is_err());
        assert_eq!(StacksNetwork::Testnet.to_string(), "testnet");
    }

    #[test]
    fn test_transaction_version_roundtrip() {
        for net in [StacksNetwork::Mainnet, StacksNetwork::Testnet] {
            assert_eq!(
                StacksNetwork::from_transaction_version(net.transaction_version()),
                Some(net)
            );
        }
        assert_eq!(StacksNetwork::from_transaction_version(0x01), None);
    }

    #[test]
    fn test_address_version_acceptance() {
        assert!(StacksNetwork::Mainnet.accepts_address_version(22));
        assert!(StacksNetwork::Mainnet.accepts_address_version(20));
        assert!(!StacksNetwork::Mainnet.accepts_address_version(26));
        assert!(StacksNetwork::Testnet.accepts_address_version(21));
    }

    #[test]
    fn test_boot_contracts_match_network_prefix() {
        assert!(BOOT_ADDRESS_MAINNET.starts_with("SP"));
        assert!(BOOT_ADDRESS_TESTNET.starts_with("ST"));
        assert!(SEND_MANY_MEMO_MAINNET.starts_with("SP"));
        assert!(SEND_MANY_MEMO_TESTNET.starts_with("ST"));
        assert!(POX_CONTRACT_NAMES.contains(&POX_4_CONTRACT_NAME));
    }

    #[test]
    fn test_config_builder() {
        let config = RosettaConfig::new(StacksNetwork::Mainnet)
            .with_ft_metadata_mode(FtMetadataMode::Strict)
            .with_collaborator_timeout(Duration::from_secs(3));
        assert_eq!(config.ft_metadata_mode, FtMetadataMode::Strict);
        assert_eq!(config.collaborator_timeout, Duration::from_secs(3));
        assert_eq!(config.blockchain(), "stacks");
        assert_eq!("STRICT".parse::<FtMetadataMode>().unwrap(), FtMetadataMode::Strict);
    }
}
