//! Rosetta v1.4.6 request and response types.
//!
//! Field names follow the Rosetta JSON exactly. Optional fields are
//! skipped when empty so responses stay byte-compatible with what existing
//! Rosetta clients expect.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{STX_DECIMALS, STX_SYMBOL};

use super::errors::RosettaErrorBody;
use super::options::{ConstructionMetadata, ConstructionOptions};

pub type Metadata = Map<String, Value>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentifier {
    pub blockchain: String,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_network_identifier: Option<SubNetworkIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubNetworkIdentifier {
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIdentifier {
    pub index: u64,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIdentifier {
    pub hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationIdentifier {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_index: Option<i64>,
}

impl OperationIdentifier {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            network_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentifier {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_account: Option<SubAccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AccountIdentifier {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            sub_account: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAccountIdentifier {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinIdentifier {
    /// `"{txid}:{operation index}"`.
    pub identifier: String,
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Currency {
    /// The native currency, STX with 6 decimals.
    pub fn stx() -> Self {
        Self {
            symbol: STX_SYMBOL.to_string(),
            decimals: STX_DECIMALS,
            metadata: None,
        }
    }

    pub fn is_stx(&self) -> bool {
        self.symbol == STX_SYMBOL && self.decimals == STX_DECIMALS
    }
}

/// A signed atomic-unit amount. `value` is a decimal integer string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Amount {
    pub fn new(value: i128, currency: Currency) -> Self {
        Self {
            value: value.to_string(),
            currency,
            metadata: None,
        }
    }

    pub fn stx(value: i128) -> Self {
        Self::new(value, Currency::stx())
    }

    /// `None` if `value` is not a decimal integer.
    pub fn parsed(&self) -> Option<i128> {
        self.value.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinAction {
    CoinCreated,
    CoinSpent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinChange {
    pub coin_identifier: CoinIdentifier,
    pub coin_action: CoinAction,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Fee,
    TokenTransfer,
    ContractCall,
    SmartContract,
    Coinbase,
    PoisonMicroblock,
    TenureChange,
    Minted,
    Burned,
    MinerReward,
    StxLock,
    StxUnlock,
    StackStx,
    DelegateStx,
    RevokeDelegateStx,
}

impl OperationType {
    pub const ALL: [OperationType; 15] = [
        Self::Fee,
        Self::TokenTransfer,
        Self::ContractCall,
        Self::SmartContract,
        Self::Coinbase,
        Self::PoisonMicroblock,
        Self::TenureChange,
        Self::Minted,
        Self::Burned,
        Self::MinerReward,
        Self::StxLock,
        Self::StxUnlock,
        Self::StackStx,
        Self::DelegateStx,
        Self::RevokeDelegateStx,
    ];

    /// Wire names, in the order of [`OperationType::ALL`].
    pub const NAMES: [&'static str; 15] = [
        "fee",
        "token_transfer",
        "contract_call",
        "smart_contract",
        "coinbase",
        "poison_microblock",
        "tenure_change",
        "minted",
        "burned",
        "miner_reward",
        "stx_lock",
        "stx_unlock",
        "stack_stx",
        "delegate_stx",
        "revoke_delegate_stx",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fee => "fee",
            Self::TokenTransfer => "token_transfer",
            Self::ContractCall => "contract_call",
            Self::SmartContract => "smart_contract",
            Self::Coinbase => "coinbase",
            Self::PoisonMicroblock => "poison_microblock",
            Self::TenureChange => "tenure_change",
            Self::Minted => "minted",
            Self::Burned => "burned",
            Self::MinerReward => "miner_reward",
            Self::StxLock => "stx_lock",
            Self::StxUnlock => "stx_unlock",
            Self::StackStx => "stack_stx",
            Self::DelegateStx => "delegate_stx",
            Self::RevokeDelegateStx => "revoke_delegate_stx",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Success,
    Pending,
    AbortByResponse,
    AbortByPostCondition,
}

impl OperationStatus {
    pub const ALL: [OperationStatus; 4] = [
        Self::Success,
        Self::Pending,
        Self::AbortByResponse,
        Self::AbortByPostCondition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Pending => "pending",
            Self::AbortByResponse => "abort_by_response",
            Self::AbortByPostCondition => "abort_by_post_condition",
        }
    }

    /// Whether balances changed.
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    /// Indices strictly smaller than this operation's own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_operations: Option<Vec<OperationIdentifier>>,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_change: Option<CoinChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Operation {
    pub fn new(index: u32, op_type: OperationType) -> Self {
        Self {
            operation_identifier: OperationIdentifier::new(index),
            related_operations: None,
            op_type,
            status: None,
            account: None,
            amount: None,
            coin_change: None,
            metadata: None,
        }
    }

    pub fn index(&self) -> u32 {
        self.operation_identifier.index
    }

    /// Signed amount value, if present and numeric.
    pub fn amount_value(&self) -> Option<i128> {
        self.amount.as_ref().and_then(Amount::parsed)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

// ---------------------------------------------------------------------------
// Keys & signatures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    Secp256k1,
    Secp256r1,
    Edwards25519,
    Tweedle,
    Pallas,
}

impl CurveType {
    pub const NAMES: [&'static str; 5] = ["secp256k1", "secp256r1", "edwards25519", "tweedle", "pallas"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    Ecdsa,
    EcdsaRecovery,
    Ed25519,
    #[serde(rename = "schnorr_1")]
    Schnorr1,
    SchnorrPoseidon,
}

impl SignatureType {
    pub const NAMES: [&'static str; 5] = ["ecdsa", "ecdsa_recovery", "ed25519", "schnorr_1", "schnorr_poseidon"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub hex_bytes: String,
    pub curve_type: CurveType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_identifier: Option<AccountIdentifier>,
    pub hex_bytes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<SignatureType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signing_payload: SigningPayload,
    pub public_key: PublicKey,
    pub signature_type: SignatureType,
    pub hex_bytes: String,
}

// ---------------------------------------------------------------------------
// Construction requests & responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionDeriveRequest {
    pub network_identifier: NetworkIdentifier,
    pub public_key: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionDeriveResponse {
    pub account_identifier: AccountIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPreprocessRequest {
    pub network_identifier: NetworkIdentifier,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee: Option<Vec<Amount>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fee_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPreprocessResponse {
    pub options: ConstructionOptions,
    pub required_public_keys: Vec<AccountIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionMetadataRequest {
    pub network_identifier: NetworkIdentifier,
    pub options: ConstructionOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<Vec<PublicKey>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionMetadataResponse {
    pub metadata: ConstructionMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fee: Option<Vec<Amount>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPayloadsRequest {
    pub network_identifier: NetworkIdentifier,
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConstructionMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_keys: Option<Vec<PublicKey>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPayloadsResponse {
    pub unsigned_transaction: String,
    pub payloads: Vec<SigningPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionCombineRequest {
    pub network_identifier: NetworkIdentifier,
    pub unsigned_transaction: String,
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionCombineResponse {
    pub signed_transaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionHashRequest {
    pub network_identifier: NetworkIdentifier,
    pub signed_transaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionParseRequest {
    pub network_identifier: NetworkIdentifier,
    pub signed: bool,
    pub transaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionParseResponse {
    pub operations: Vec<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_identifier_signers: Option<Vec<AccountIdentifier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionSubmitRequest {
    pub network_identifier: NetworkIdentifier,
    pub signed_transaction: String,
}

/// Returned by both `/construction/hash` and `/construction/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionIdentifierResponse {
    pub transaction_identifier: TransactionIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub network_identifier: NetworkIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkListResponse {
    pub network_identifiers: Vec<NetworkIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub rosetta_version: String,
    pub node_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middleware_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStatusInfo {
    pub status: String,
    pub successful: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allow {
    pub operation_statuses: Vec<OperationStatusInfo>,
    pub operation_types: Vec<String>,
    pub errors: Vec<RosettaErrorBody>,
    pub historical_balance_lookup: bool,
    pub call_methods: Vec<String>,
    pub mempool_coins: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkOptionsResponse {
    pub version: Version,
    pub allow: Allow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Peer {
    pub peer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub current_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_index: Option<u64>,
    pub synced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatusResponse {
    pub current_block_identifier: BlockIdentifier,
    /// Milliseconds since the epoch.
    pub current_block_timestamp: i64,
    pub genesis_block_identifier: BlockIdentifier,
    pub peers: Vec<Peer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_status: Option<SyncStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_json_shape() {
        let mut op = Operation::new(1, OperationType::TokenTransfer);
        op.status = Some(OperationStatus::Success);
        op.related_operations = Some(vec![OperationIdentifier::new(0)]);
        op.amount = Some(Amount::stx(-1000));

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "token_transfer");
        assert_eq!(value["status"], "success");
        assert_eq!(value["operation_identifier"], json!({ "index": 1 }));
        assert_eq!(value["amount"]["value"], "-1000");
        assert_eq!(value["amount"]["currency"], json!({ "symbol": "STX", "decimals": 6 }));
        assert!(value.get("coin_change").is_none());
    }

    #[test]
    fn enum_names_match_serde() {
        for (ty, name) in OperationType::ALL.iter().zip(OperationType::NAMES) {
            assert_eq!(serde_json::to_value(ty).unwrap(), ty.as_str());
            assert_eq!(ty.as_str(), name);
        }
        for status in OperationStatus::ALL {
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        assert_eq!(serde_json::to_value(SignatureType::Schnorr1).unwrap(), "schnorr_1");
        assert_eq!(serde_json::to_value(CurveType::Edwards25519).unwrap(), "edwards25519");
    }

    #[test]
    fn amount_parsing() {
        assert_eq!(Amount::stx(-180).parsed(), Some(-180));
        let bad = Amount {
            value: "12abc".to_string(),
            currency: Currency::stx(),
            metadata: None,
        };
        assert_eq!(bad.parsed(), None);
        assert!(Currency::stx().is_stx());
    }
}
