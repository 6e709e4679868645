//! End-to-end tests of the construction flow through the public API.
//!
//! Each test drives `derive → preprocess → metadata → payloads → (sign) →
//! combine → parse → hash → submit` against in-memory collaborators,
//! signing the payload locally the way an offline wallet would.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use stacks_rosetta::backend::{CollaboratorError, NodeInfo, NodeRpc, PoxInfo, TransactionStore};
use stacks_rosetta::crypto::signatures::{sign_digest_rsv, vrs_to_rsv};
use stacks_rosetta::crypto::Secp256k1PrivateKey;
use stacks_rosetta::rosetta::{
    AccountIdentifier, Amount, ConstructionCombineRequest, ConstructionDeriveRequest, ConstructionHashRequest,
    ConstructionMetadataRequest, ConstructionParseRequest, ConstructionPayloadsRequest,
    ConstructionPreprocessRequest, ConstructionSubmitRequest, CurveType, NetworkIdentifier, Operation,
    OperationIntent, OperationType, PublicKey, Signature, SignatureType,
};
use stacks_rosetta::translator::from_operations;
use stacks_rosetta::transaction::{presign_digest, sign_origin, SpendingCondition, StacksTransaction};
use stacks_rosetta::{RosettaConfig, RosettaErrorKind, RosettaService, StacksNetwork};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const RECIPIENT: &str = "STDE7Y8HV3RX8VBM2TZVWJTS7ZA1XB0SSC3NEVH0";
const BTC_ADDR: &str = "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r";
const TIP: &str = "0x969bb9ad7a0f8b8e4b5a2c6f6e2d3a1c0b9f8e7d6c5b4a392817161514131211";

/// A chain that hands out nonce 7 and accepts every broadcast.
#[derive(Default)]
struct FakeChain {
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl TransactionStore for FakeChain {
    async fn get_nonce(&self, _address: &str) -> Result<u64, CollaboratorError> {
        Ok(7)
    }

    async fn get_recent_block_hash(&self) -> Result<String, CollaboratorError> {
        Ok(TIP.into())
    }
}

#[async_trait]
impl NodeRpc for FakeChain {
    async fn get_pox_info(&self) -> Result<PoxInfo, CollaboratorError> {
        Ok(PoxInfo {
            contract_id: "ST000000000000000000002AMW42H.pox-4".into(),
            current_burnchain_block_height: 2_000,
            reward_cycle_id: 12,
            reward_cycle_length: 1050,
            min_amount_ustx: 90_000_000_000,
        })
    }

    async fn get_fee_rate(&self) -> Result<u64, CollaboratorError> {
        Ok(2)
    }

    async fn get_node_info(&self) -> Result<NodeInfo, CollaboratorError> {
        Ok(NodeInfo {
            server_version: "stacks-node 2.5.0".into(),
            stacks_tip_height: 42,
            stacks_tip: TIP.into(),
            burn_block_height: 2_000,
            genesis_chainstate_hash: "0x74237aa39aa50a83de11a4f53e9d3bb7d43461d1de9873f402e5453ae60bc59b".into(),
        })
    }

    async fn broadcast(&self, tx: &[u8]) -> Result<String, CollaboratorError> {
        let txid = StacksTransaction::from_bytes(tx)
            .and_then(|tx| tx.txid())
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        self.broadcasts.lock().unwrap().push(tx.to_vec());
        Ok(txid.to_string())
    }
}

fn setup() -> (RosettaService, Arc<FakeChain>) {
    let chain = Arc::new(FakeChain::default());
    let service = RosettaService::new(RosettaConfig::new(StacksNetwork::Testnet), chain.clone(), chain.clone());
    (service, chain)
}

fn testnet() -> NetworkIdentifier {
    NetworkIdentifier {
        blockchain: "stacks".into(),
        network: "testnet".into(),
        sub_network_identifier: None,
    }
}

fn secp(key: &Secp256k1PrivateKey) -> PublicKey {
    PublicKey {
        hex_bytes: key.public_key().to_hex(),
        curve_type: CurveType::Secp256k1,
    }
}

fn op(index: u32, op_type: OperationType, address: &str, value: i128) -> Operation {
    let mut op = Operation::new(index, op_type);
    op.account = Some(AccountIdentifier::new(address));
    op.amount = Some(Amount::stx(value));
    op
}

/// Runs every step for `operations` signed by `key` and returns the
/// signed transaction hex.
async fn construct(service: &RosettaService, key: &Secp256k1PrivateKey, operations: Vec<Operation>) -> String {
    let pre = service
        .preprocess(ConstructionPreprocessRequest {
            network_identifier: testnet(),
            operations: operations.clone(),
            metadata: None,
            max_fee: None,
            suggested_fee_multiplier: None,
        })
        .expect("preprocess");

    let meta = service
        .metadata(ConstructionMetadataRequest {
            network_identifier: testnet(),
            options: pre.options,
            public_keys: Some(vec![secp(key)]),
        })
        .await
        .expect("metadata");
    assert_eq!(meta.metadata.account_sequence, 7);

    let payloads = service
        .payloads(ConstructionPayloadsRequest {
            network_identifier: testnet(),
            operations,
            metadata: Some(meta.metadata),
            public_keys: Some(vec![secp(key)]),
        })
        .expect("payloads");
    assert_eq!(payloads.payloads.len(), 1);

    let unsigned = service
        .parse(ConstructionParseRequest {
            network_identifier: testnet(),
            signed: false,
            transaction: payloads.unsigned_transaction.clone(),
        })
        .await
        .expect("parse unsigned");
    assert!(unsigned.account_identifier_signers.is_none());

    // Offline signing: the wallet signs its own copy of the unsigned
    // transaction and hands back the origin signature in RSV order.
    let payload = payloads.payloads[0].clone();
    let mut offline = StacksTransaction::from_hex(&payloads.unsigned_transaction).unwrap();
    assert_eq!(hex::encode(presign_digest(&offline).unwrap()), payload.hex_bytes);
    sign_origin(&mut offline, key).unwrap();
    let rsv = match offline.auth.origin() {
        SpendingCondition::SingleSig(cond) => vrs_to_rsv(&cond.signature.0),
        SpendingCondition::MultiSig(_) => panic!("expected a single-sig origin"),
    };

    let signed = service
        .combine(ConstructionCombineRequest {
            network_identifier: testnet(),
            unsigned_transaction: payloads.unsigned_transaction,
            signatures: vec![Signature {
                signing_payload: payload,
                public_key: secp(key),
                signature_type: SignatureType::EcdsaRecovery,
                hex_bytes: hex::encode(rsv),
            }],
        })
        .expect("combine")
        .signed_transaction;
    assert_eq!(signed, offline.to_hex().unwrap());
    signed
}

async fn derive(service: &RosettaService, key: &Secp256k1PrivateKey) -> String {
    service
        .derive(ConstructionDeriveRequest {
            network_identifier: testnet(),
            public_key: secp(key),
            metadata: None,
        })
        .expect("derive")
        .account_identifier
        .address
}

fn amounts(ops: &[Operation]) -> Vec<(OperationType, Option<i128>)> {
    ops.iter().map(|op| (op.op_type, op.amount_value())).collect()
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_transfer_lifecycle() {
    let (service, chain) = setup();
    let key = Secp256k1PrivateKey::random();
    let sender = derive(&service, &key).await;
    assert!(sender.starts_with("ST"));

    let ops = vec![
        op(0, OperationType::Fee, &sender, -400),
        op(1, OperationType::TokenTransfer, &sender, -2_500_000),
        op(2, OperationType::TokenTransfer, RECIPIENT, 2_500_000),
    ];
    let signed = construct(&service, &key, ops).await;

    let parsed = service
        .parse(ConstructionParseRequest {
            network_identifier: testnet(),
            signed: true,
            transaction: signed.clone(),
        })
        .await
        .unwrap();
    assert_eq!(
        amounts(&parsed.operations),
        vec![
            (OperationType::Fee, Some(-400)),
            (OperationType::TokenTransfer, Some(-2_500_000)),
            (OperationType::TokenTransfer, Some(2_500_000)),
        ]
    );
    let signers = parsed.account_identifier_signers.unwrap();
    assert_eq!(signers[0].address, sender);

    let hashed = service
        .hash(ConstructionHashRequest {
            network_identifier: testnet(),
            signed_transaction: signed.clone(),
        })
        .unwrap();
    let submitted = service
        .submit(ConstructionSubmitRequest {
            network_identifier: testnet(),
            signed_transaction: signed,
        })
        .await
        .unwrap();
    assert_eq!(submitted.transaction_identifier, hashed.transaction_identifier);
    assert!(hashed.transaction_identifier.hash.starts_with("0x"));
    assert_eq!(chain.broadcasts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn memo_survives_the_round_trip() {
    let (service, _) = setup();
    let key = Secp256k1PrivateKey::random();
    let sender = derive(&service, &key).await;

    let mut debit = op(0, OperationType::TokenTransfer, &sender, -1_000);
    debit.metadata = serde_json::from_value(json!({ "memo": "invoice 42" })).unwrap();
    let credit = op(1, OperationType::TokenTransfer, RECIPIENT, 1_000);
    let signed = construct(&service, &key, vec![debit, credit]).await;

    let parsed = service
        .parse(ConstructionParseRequest {
            network_identifier: testnet(),
            signed: true,
            transaction: signed,
        })
        .await
        .unwrap();
    let transfer = parsed
        .operations
        .iter()
        .find(|op| op.op_type == OperationType::TokenTransfer)
        .unwrap();
    let memo = transfer.metadata.as_ref().and_then(|m| m.get("memo")).unwrap();
    assert_eq!(memo, "invoice 42");
}

#[tokio::test]
async fn pox4_stack_stx_lifecycle() {
    let (service, _) = setup();
    let key = Secp256k1PrivateKey::random();
    let signer = Secp256k1PrivateKey::random();
    let sender = derive(&service, &key).await;

    let mut stack = op(0, OperationType::StackStx, &sender, -100_000_000_000);
    stack.metadata = serde_json::from_value(json!({
        "number_of_cycles": 6,
        "pox_addr": BTC_ADDR,
        "signer_key": signer.public_key().to_hex(),
        "signer_private_key": hex::encode(signer.signing_key().to_bytes()),
    }))
    .unwrap();
    let signed = construct(&service, &key, vec![stack]).await;

    let parsed = service
        .parse(ConstructionParseRequest {
            network_identifier: testnet(),
            signed: true,
            transaction: signed,
        })
        .await
        .unwrap();
    let stacking = parsed
        .operations
        .iter()
        .find(|op| op.op_type == OperationType::StackStx)
        .expect("stack_stx operation");
    assert_eq!(stacking.amount_value(), Some(-100_000_000_000));
    assert_eq!(stacking.account.as_ref().unwrap().address, sender);

    // The parsed operations rebuild the options that produced them.
    let fee = parsed
        .operations
        .iter()
        .find(|op| op.op_type == OperationType::Fee)
        .and_then(|op| op.amount_value())
        .expect("fee operation");
    let options = from_operations(&parsed.operations).unwrap();
    assert_eq!(options.sender_address, sender);
    assert_eq!(options.fee, Some((-fee).to_string()));
    match options.intent {
        OperationIntent::StackStx {
            amount,
            number_of_cycles,
            pox_addr,
            signer_key,
            signer_private_key,
            signer_signature,
            pox_max_amount,
            pox_auth_id,
        } => {
            assert_eq!(amount, "100000000000");
            assert_eq!(number_of_cycles, 6);
            assert_eq!(pox_addr, BTC_ADDR);
            assert_eq!(signer_key, Some(signer.public_key().to_hex()));
            assert!(signer_private_key.is_none());
            assert!(signer_signature.is_some());
            assert_eq!(pox_max_amount.as_deref(), Some("100000000000"));
            assert!(pox_auth_id.expect("pox_auth_id").parse::<u32>().is_ok());
        }
        other => panic!("expected stack_stx options, got {other:?}"),
    }
}

#[tokio::test]
async fn delegate_stx_lifecycle() {
    let (service, _) = setup();
    let key = Secp256k1PrivateKey::random();
    let sender = derive(&service, &key).await;

    let mut delegate = op(0, OperationType::DelegateStx, &sender, -5_000_000);
    delegate.metadata = serde_json::from_value(json!({ "delegate_to": RECIPIENT })).unwrap();
    let signed = construct(&service, &key, vec![delegate]).await;

    let parsed = service
        .parse(ConstructionParseRequest {
            network_identifier: testnet(),
            signed: true,
            transaction: signed,
        })
        .await
        .unwrap();
    assert!(amounts(&parsed.operations).contains(&(OperationType::DelegateStx, Some(-5_000_000))));

    let options = from_operations(&parsed.operations).unwrap();
    assert_eq!(options.sender_address, sender);
    assert!(options.fee.is_some());
    assert_eq!(
        options.intent,
        OperationIntent::DelegateStx {
            amount: "5000000".into(),
            delegate_to: RECIPIENT.into(),
            pox_addr: None,
            until_burn_height: None,
        }
    );
}

#[tokio::test]
async fn stacking_below_minimum_is_refused() {
    let (service, _) = setup();
    let key = Secp256k1PrivateKey::random();
    let sender = derive(&service, &key).await;

    let mut stack = op(0, OperationType::StackStx, &sender, -1_000);
    stack.metadata = serde_json::from_value(json!({ "number_of_cycles": 1, "pox_addr": BTC_ADDR })).unwrap();
    let pre = service
        .preprocess(ConstructionPreprocessRequest {
            network_identifier: testnet(),
            operations: vec![stack],
            metadata: None,
            max_fee: None,
            suggested_fee_multiplier: None,
        })
        .unwrap();
    let err = service
        .metadata(ConstructionMetadataRequest {
            network_identifier: testnet(),
            options: pre.options,
            public_keys: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, RosettaErrorKind::StackingEligibilityError);
}

#[tokio::test]
async fn signature_from_another_key_is_not_verified() {
    let (service, _) = setup();
    let key = Secp256k1PrivateKey::random();
    let sender = derive(&service, &key).await;

    let ops = vec![
        op(0, OperationType::TokenTransfer, &sender, -1_000),
        op(1, OperationType::TokenTransfer, RECIPIENT, 1_000),
    ];
    let pre = service
        .preprocess(ConstructionPreprocessRequest {
            network_identifier: testnet(),
            operations: ops.clone(),
            metadata: None,
            max_fee: None,
            suggested_fee_multiplier: None,
        })
        .unwrap();
    let meta = service
        .metadata(ConstructionMetadataRequest {
            network_identifier: testnet(),
            options: pre.options,
            public_keys: None,
        })
        .await
        .unwrap();
    let payloads = service
        .payloads(ConstructionPayloadsRequest {
            network_identifier: testnet(),
            operations: ops,
            metadata: Some(meta.metadata),
            public_keys: Some(vec![secp(&key)]),
        })
        .unwrap();

    let intruder = Secp256k1PrivateKey::random();
    let digest: [u8; 32] = hex::decode(&payloads.payloads[0].hex_bytes).unwrap().try_into().unwrap();
    let rsv = sign_digest_rsv(&intruder, &digest).unwrap();
    let err = service
        .combine(ConstructionCombineRequest {
            network_identifier: testnet(),
            unsigned_transaction: payloads.unsigned_transaction,
            signatures: vec![Signature {
                signing_payload: payloads.payloads[0].clone(),
                public_key: secp(&intruder),
                signature_type: SignatureType::EcdsaRecovery,
                hex_bytes: hex::encode(rsv),
            }],
        })
        .unwrap_err();
    assert_eq!(err.kind, RosettaErrorKind::SignatureNotVerified);
}
