//! Transaction → operations.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::address::ContractId;
use crate::backend::TokenMetadataResolver;
use crate::clarity::ClarityValue;
use crate::codec::CodecError;
use crate::config::{FtMetadataMode, RosettaConfig, StacksNetwork};
use crate::pox::{
    self, DelegateStxArgs, PoxError, StackStxArgs, StackStxResult, FN_DELEGATE_STX, FN_REVOKE_DELEGATE_STX,
    FN_STACK_STX,
};
use crate::rosetta::{
    AccountIdentifier, Amount, CoinAction, CoinChange, CoinIdentifier, Currency, Metadata, Operation,
    OperationIdentifier, OperationType,
};

use super::{BaseTx, BaseTxPayload, TranslateError, TxContext, TxEvent};

const FN_SEND_MANY: &str = "send-many";
const FN_SEND_STX_WITH_MEMO: &str = "send-stx-with-memo";

fn signed(amount: u128) -> Result<i128, TranslateError> {
    i128::try_from(amount).map_err(|_| TranslateError::AmountOverflow(amount))
}

/// JSON number when it fits, decimal string otherwise.
fn number(value: u128) -> Value {
    match u64::try_from(value) {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(value.to_string()),
    }
}

fn memo_metadata(memo: &str) -> Metadata {
    let mut metadata = Map::new();
    metadata.insert("memo".into(), json!(memo));
    metadata
}

/// Memo buffer with trailing zero bytes removed. Empty memos yield `None`.
fn memo_text(value: &ClarityValue) -> Option<String> {
    let bytes = value.as_buffer()?;
    let end = bytes.iter().rposition(|b| *b != 0)? + 1;
    Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

// ---------------------------------------------------------------------------
// OperationList
// ---------------------------------------------------------------------------

/// Operations of one transaction, indexed in push order.
struct OperationList<'a> {
    tx: &'a BaseTx,
    ops: Vec<Operation>,
}

impl<'a> OperationList<'a> {
    fn new(tx: &'a BaseTx) -> Self {
        Self { tx, ops: Vec::new() }
    }

    fn next_index(&self) -> u32 {
        self.ops.len() as u32
    }

    fn push(&mut self, op_type: OperationType, account: &str, amount: Option<Amount>) -> &mut Operation {
        let mut op = Operation::new(self.next_index(), op_type);
        op.status = self.tx.status;
        op.account = Some(AccountIdentifier::new(account));
        op.amount = amount;

        let at = self.ops.len();
        self.ops.push(op);
        &mut self.ops[at]
    }

    fn coin(&self, index: u32, coin_action: CoinAction) -> CoinChange {
        CoinChange {
            coin_identifier: CoinIdentifier {
                identifier: format!("{}:{index}", self.tx.tx_id),
            },
            coin_action,
        }
    }

    /// Debit of `sender` followed by a credit of `recipient` that relates
    /// back to it. STX pairs carry coin changes.
    fn push_transfer(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: i128,
        currency: Currency,
        memo: Option<&str>,
    ) {
        let native = currency.is_stx();

        let debit_index = self.next_index();
        let spent = native.then(|| self.coin(debit_index, CoinAction::CoinSpent));
        let debit = self.push(OperationType::TokenTransfer, sender, Some(Amount::new(-amount, currency.clone())));
        debit.coin_change = spent;
        debit.metadata = memo.map(memo_metadata);

        let credit_index = self.next_index();
        let created = native.then(|| self.coin(credit_index, CoinAction::CoinCreated));
        let credit = self.push(OperationType::TokenTransfer, recipient, Some(Amount::new(amount, currency)));
        credit.related_operations = Some(vec![OperationIdentifier::new(debit_index)]);
        credit.coin_change = created;
        credit.metadata = memo.map(memo_metadata);
    }
}

// ---------------------------------------------------------------------------
// OperationTranslator
// ---------------------------------------------------------------------------

/// Turns a [`BaseTx`] (plus whatever events are known) into operations.
#[derive(Clone)]
pub struct OperationTranslator {
    network: StacksNetwork,
    ft_metadata_mode: FtMetadataMode,
    token_metadata: Option<Arc<dyn TokenMetadataResolver>>,
}

impl fmt::Debug for OperationTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTranslator")
            .field("network", &self.network)
            .field("ft_metadata_mode", &self.ft_metadata_mode)
            .field("token_metadata", &self.token_metadata.is_some())
            .finish()
    }
}

impl OperationTranslator {
    pub fn new(config: &RosettaConfig) -> Self {
        Self {
            network: config.network,
            ft_metadata_mode: config.ft_metadata_mode,
            token_metadata: None,
        }
    }

    pub fn with_token_metadata(mut self, resolver: Arc<dyn TokenMetadataResolver>) -> Self {
        self.token_metadata = Some(resolver);
        self
    }

    /// Fee first (when non-zero), then the payload's operations, then one
    /// or two operations per balance-affecting event in event order.
    pub async fn to_operations(&self, tx: &BaseTx, ctx: TxContext<'_>) -> Result<Vec<Operation>, TranslateError> {
        let mut list = OperationList::new(tx);
        let sender = tx.sender_address.as_str();

        if tx.fee > 0 {
            list.push(OperationType::Fee, tx.fee_payer(), Some(Amount::stx(-i128::from(tx.fee))));
        }

        let mut memos: Vec<Option<String>> = Vec::new();
        match &tx.payload {
            BaseTxPayload::TokenTransfer {
                recipient,
                amount,
                memo,
            } => {
                list.push_transfer(sender, recipient, i128::from(*amount), Currency::stx(), memo.as_deref());
            }
            BaseTxPayload::ContractCall {
                contract,
                function_name,
                function_args,
                result,
            } => {
                memos = self.send_many_memos(contract, function_name, function_args);
                self.push_contract_call(&mut list, contract, function_name, function_args, result.as_ref())?;
            }
            BaseTxPayload::SmartContract { contract_id } => {
                let op = list.push(OperationType::SmartContract, sender, None);
                let mut metadata = Map::new();
                metadata.insert("contract_id".into(), json!(contract_id));
                op.metadata = Some(metadata);
            }
            BaseTxPayload::Coinbase { alt_recipient } => {
                let op = list.push(OperationType::Coinbase, sender, None);
                if let Some(recipient) = alt_recipient {
                    let mut metadata = Map::new();
                    metadata.insert("alt_recipient".into(), json!(recipient));
                    op.metadata = Some(metadata);
                }
                for reward in ctx.miner_rewards {
                    list.push(
                        OperationType::MinerReward,
                        &reward.recipient,
                        Some(Amount::stx(signed(reward.amount)?)),
                    );
                }
                for unlock in ctx.unlock_events {
                    list.push(
                        OperationType::StxUnlock,
                        &unlock.address,
                        Some(Amount::stx(signed(unlock.amount)?)),
                    );
                }
            }
            BaseTxPayload::PoisonMicroblock => {
                list.push(OperationType::PoisonMicroblock, sender, None);
            }
            BaseTxPayload::TenureChange => {
                list.push(OperationType::TenureChange, sender, None);
            }
        }

        let mut transfers_seen = 0usize;
        for event in ctx.events.iter().filter(|e| e.affects_balances()) {
            match event {
                TxEvent::StxTransfer {
                    sender,
                    recipient,
                    amount,
                } => {
                    // A plain transfer already produced its pair above.
                    if tx.is_token_transfer() {
                        continue;
                    }
                    let memo = memos.get(transfers_seen).cloned().flatten();
                    transfers_seen += 1;
                    list.push_transfer(sender, recipient, signed(*amount)?, Currency::stx(), memo.as_deref());
                }
                TxEvent::StxMint { recipient, amount } => {
                    list.push(OperationType::Minted, recipient, Some(Amount::stx(signed(*amount)?)));
                }
                TxEvent::StxBurn { sender, amount } => {
                    list.push(OperationType::Burned, sender, Some(Amount::stx(-signed(*amount)?)));
                }
                TxEvent::StxLock {
                    locked_address,
                    locked_amount,
                    unlock_height,
                } => {
                    let op = list.push(
                        OperationType::StxLock,
                        locked_address,
                        Some(Amount::stx(-signed(*locked_amount)?)),
                    );
                    let mut metadata = Map::new();
                    metadata.insert("locked".into(), number(*locked_amount));
                    metadata.insert("unlock_height".into(), json!(unlock_height));
                    op.metadata = Some(metadata);
                }
                TxEvent::FtTransfer {
                    asset_identifier,
                    sender,
                    recipient,
                    amount,
                } => {
                    if let Some(currency) = self.token_currency(asset_identifier).await? {
                        list.push_transfer(sender, recipient, signed(*amount)?, currency, None);
                    }
                }
                TxEvent::FtMint {
                    asset_identifier,
                    recipient,
                    amount,
                } => {
                    if let Some(currency) = self.token_currency(asset_identifier).await? {
                        list.push(OperationType::Minted, recipient, Some(Amount::new(signed(*amount)?, currency)));
                    }
                }
                TxEvent::FtBurn {
                    asset_identifier,
                    sender,
                    amount,
                } => {
                    if let Some(currency) = self.token_currency(asset_identifier).await? {
                        list.push(OperationType::Burned, sender, Some(Amount::new(-signed(*amount)?, currency)));
                    }
                }
                TxEvent::NftTransfer { .. }
                | TxEvent::NftMint { .. }
                | TxEvent::NftBurn { .. }
                | TxEvent::ContractLog { .. } => {}
            }
        }

        Ok(list.ops)
    }

    async fn token_currency(&self, asset: &str) -> Result<Option<Currency>, TranslateError> {
        let resolved = match &self.token_metadata {
            Some(resolver) => resolver.resolve(asset).await.map_err(|e| e.to_string()),
            None => Err("no token metadata resolver configured".to_string()),
        };
        match (resolved, self.ft_metadata_mode) {
            (Ok(currency), _) => Ok(Some(currency)),
            (Err(reason), FtMetadataMode::Warn) => {
                warn!(asset, %reason, "dropping fungible token event without metadata");
                Ok(None)
            }
            (Err(reason), FtMetadataMode::Strict) => Err(TranslateError::TokenMetadata {
                asset: asset.to_string(),
                reason,
            }),
        }
    }

    /// Memos of a send-many-memo call, one per transfer in call order.
    fn send_many_memos(&self, contract: &ContractId, function_name: &str, args: &[ClarityValue]) -> Vec<Option<String>> {
        if contract.to_string() != self.network.send_many_memo_contract() {
            return Vec::new();
        }
        match function_name {
            FN_SEND_MANY => args
                .first()
                .and_then(ClarityValue::as_list)
                .map(|recipients| {
                    recipients
                        .iter()
                        .map(|r| r.tuple_get("memo").and_then(memo_text))
                        .collect()
                })
                .unwrap_or_default(),
            FN_SEND_STX_WITH_MEMO => vec![args.get(2).and_then(memo_text)],
            _ => Vec::new(),
        }
    }

    fn push_contract_call(
        &self,
        list: &mut OperationList<'_>,
        contract: &ContractId,
        function_name: &str,
        args: &[ClarityValue],
        result: Option<&ClarityValue>,
    ) -> Result<(), TranslateError> {
        let tx = list.tx;
        let sender = tx.sender_address.as_str();

        if pox::is_pox_contract(contract, self.network) {
            match self.decode_pox_call(function_name, args, result) {
                Ok(Some((op_type, amount, metadata))) => {
                    let op = list.push(op_type, sender, amount.map(Amount::stx));
                    op.metadata = (!metadata.is_empty()).then_some(metadata);
                    return Ok(());
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(%contract, function = function_name, error = %e, "undecodable PoX call, emitting contract_call")
                }
            }
        }

        let function_args = args
            .iter()
            .map(|arg| Ok(json!({ "hex": arg.to_hex()?, "repr": arg.repr() })))
            .collect::<Result<Vec<Value>, CodecError>>()?;

        let mut metadata = Map::new();
        metadata.insert("contract_id".into(), json!(contract.to_string()));
        metadata.insert("function_name".into(), json!(function_name));
        metadata.insert("function_args".into(), Value::Array(function_args));
        if let Some(result) = result {
            metadata.insert("result".into(), json!(result.repr()));
        }

        let op = list.push(OperationType::ContractCall, sender, None);
        op.metadata = Some(metadata);
        Ok(())
    }

    /// `Ok(None)` when `function_name` is not one of the specialized PoX
    /// functions.
    fn decode_pox_call(
        &self,
        function_name: &str,
        args: &[ClarityValue],
        result: Option<&ClarityValue>,
    ) -> Result<Option<(OperationType, Option<i128>, Metadata)>, PoxError> {
        let to_signed = |v: u128| i128::try_from(v).map_err(|_| PoxError::InvalidValue(format!("amount {v} overflows")));
        let mut metadata = Map::new();

        match function_name {
            FN_STACK_STX => {
                let call = StackStxArgs::from_clarity_args(args)?;
                metadata.insert("number_of_cycles".into(), number(call.lock_period));
                metadata.insert("pox_addr".into(), json!(call.pox_addr.to_btc_address(self.network)?));
                metadata.insert("start_burn_height".into(), number(call.start_burn_height));
                if let Some(auth) = &call.signer {
                    metadata.insert("signer_key".into(), json!(hex::encode(auth.signer_key)));
                    if let Some(sig) = auth.signer_signature {
                        metadata.insert("signer_signature".into(), json!(hex::encode(sig)));
                    }
                    metadata.insert("pox_max_amount".into(), json!(auth.max_amount.to_string()));
                    metadata.insert("pox_auth_id".into(), json!(auth.auth_id.to_string()));
                }
                if let Some(outcome) = result.and_then(StackStxResult::from_clarity) {
                    metadata.insert("lock_amount".into(), json!(outcome.lock_amount.to_string()));
                    metadata.insert("stacker".into(), json!(outcome.stacker.to_string()));
                    metadata.insert("unlock_burn_height".into(), number(outcome.unlock_burn_height));
                }
                Ok(Some((OperationType::StackStx, Some(-to_signed(call.amount_ustx)?), metadata)))
            }
            FN_DELEGATE_STX => {
                let call = DelegateStxArgs::from_clarity_args(args)?;
                metadata.insert("delegate_to".into(), json!(call.delegate_to.to_string()));
                if let Some(height) = call.until_burn_height {
                    metadata.insert("until_burn_height".into(), number(height));
                }
                if let Some(pox_addr) = &call.pox_addr {
                    metadata.insert("pox_addr".into(), json!(pox_addr.to_btc_address(self.network)?));
                }
                Ok(Some((OperationType::DelegateStx, Some(-to_signed(call.amount_ustx)?), metadata)))
            }
            FN_REVOKE_DELEGATE_STX => Ok(Some((OperationType::RevokeDelegateStx, None, metadata))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::PrincipalData;
    use crate::backend::CollaboratorError;
    use crate::pox::{PoxAddress, SignerAuthorization, POX_ADDRESS_P2PKH};
    use crate::rosetta::OperationStatus;
    use crate::translator::{MinerReward, StxUnlockEvent};
    use async_trait::async_trait;

    const SENDER: &str = "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM";
    const RECIPIENT: &str = "STDE7Y8HV3RX8VBM2TZVWJTS7ZA1XB0SSC3NEVH0";
    const OTHER: &str = "ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ";
    const TXID: &str = "0xf3b054a5fbae98f7f35e5e917b65759fc365a3e073f8af1c3b8d211b286fa74a";

    fn base(payload: BaseTxPayload) -> BaseTx {
        BaseTx {
            tx_id: TXID.to_string(),
            sender_address: SENDER.to_string(),
            sponsor_address: None,
            sponsored: false,
            fee: 180,
            nonce: 3,
            signed: true,
            status: None,
            payload,
        }
    }

    fn translator() -> OperationTranslator {
        OperationTranslator::new(&RosettaConfig::default())
    }

    fn values(ops: &[Operation]) -> Vec<(OperationType, Option<i128>)> {
        ops.iter().map(|op| (op.op_type, op.amount_value())).collect()
    }

    fn pox4() -> ContractId {
        "ST000000000000000000002AMW42H.pox-4".parse().unwrap()
    }

    fn pox_addr() -> PoxAddress {
        PoxAddress::new(
            POX_ADDRESS_P2PKH,
            hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap(),
        )
        .unwrap()
    }

    struct FixedResolver;

    #[async_trait]
    impl TokenMetadataResolver for FixedResolver {
        async fn resolve(&self, asset_identifier: &str) -> Result<Currency, CollaboratorError> {
            if asset_identifier.ends_with("::usda") {
                Ok(Currency {
                    symbol: "USDA".into(),
                    decimals: 6,
                    metadata: None,
                })
            } else {
                Err(CollaboratorError::NotFound(asset_identifier.into()))
            }
        }
    }

    #[tokio::test]
    async fn token_transfer_yields_fee_debit_credit() {
        let tx = base(BaseTxPayload::TokenTransfer {
            recipient: RECIPIENT.into(),
            amount: 1000,
            memo: Some("invoice 7".into()),
        });
        let ops = translator().to_operations(&tx, TxContext::default()).await.unwrap();

        assert_eq!(
            values(&ops),
            vec![
                (OperationType::Fee, Some(-180)),
                (OperationType::TokenTransfer, Some(-1000)),
                (OperationType::TokenTransfer, Some(1000)),
            ]
        );
        assert_eq!(ops[0].account.as_ref().unwrap().address, SENDER);
        assert_eq!(ops[2].account.as_ref().unwrap().address, RECIPIENT);
        assert_eq!(ops[2].related_operations, Some(vec![OperationIdentifier::new(1)]));
        assert_eq!(ops[1].coin_change.as_ref().unwrap().coin_identifier.identifier, format!("{TXID}:1"));
        assert_eq!(ops[2].coin_change.as_ref().unwrap().coin_action, CoinAction::CoinCreated);
        assert_eq!(ops[1].metadata_str("memo"), Some("invoice 7"));
        assert!(ops.iter().enumerate().all(|(i, op)| op.index() as usize == i));
        assert!(ops.iter().all(|op| op.status.is_none()));
    }

    #[tokio::test]
    async fn sponsored_fee_is_paid_by_sponsor() {
        let mut tx = base(BaseTxPayload::PoisonMicroblock);
        tx.sponsored = true;
        tx.sponsor_address = Some(OTHER.into());
        tx.status = Some(OperationStatus::Success);

        let ops = translator().to_operations(&tx, TxContext::default()).await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].account.as_ref().unwrap().address, OTHER);
        assert_eq!(ops[1].op_type, OperationType::PoisonMicroblock);
        assert_eq!(ops[1].amount, None);
        assert_eq!(ops[1].status, Some(OperationStatus::Success));
    }

    #[tokio::test]
    async fn pox4_stack_stx_is_specialized() {
        let key = crate::crypto::Secp256k1PrivateKey::random().public_key();
        let args = StackStxArgs {
            amount_ustx: 50_000_000,
            pox_addr: pox_addr(),
            start_burn_height: 900,
            lock_period: 3,
            signer: Some(SignerAuthorization {
                signer_signature: None,
                signer_key: key.to_bytes().try_into().unwrap(),
                max_amount: 60_000_000,
                auth_id: 42,
            }),
        };
        let result = ClarityValue::ok(ClarityValue::tuple([
            ("lock-amount", ClarityValue::UInt(50_000_000)),
            ("stacker", ClarityValue::principal(SENDER.parse::<PrincipalData>().unwrap())),
            ("unlock-burn-height", ClarityValue::UInt(1_500)),
        ]));
        let tx = base(BaseTxPayload::ContractCall {
            contract: pox4(),
            function_name: FN_STACK_STX.into(),
            function_args: args.to_clarity_args(),
            result: Some(result),
        });

        let ops = translator().to_operations(&tx, TxContext::default()).await.unwrap();
        assert_eq!(values(&ops)[1], (OperationType::StackStx, Some(-50_000_000)));
        let metadata = ops[1].metadata.as_ref().unwrap();
        assert_eq!(metadata["number_of_cycles"], json!(3));
        assert_eq!(metadata["pox_addr"], json!("mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r"));
        assert_eq!(metadata["signer_key"], json!(key.to_hex()));
        assert_eq!(metadata["pox_auth_id"], json!("42"));
        assert_eq!(metadata["unlock_burn_height"], json!(1500));
        assert_eq!(metadata["stacker"], json!(SENDER));
        assert!(metadata.get("signer_signature").is_none());
    }

    #[tokio::test]
    async fn delegate_and_revoke() {
        let args = DelegateStxArgs {
            amount_ustx: 7_000,
            delegate_to: OTHER.parse().unwrap(),
            until_burn_height: Some(2_000),
            pox_addr: None,
        };
        let delegate = base(BaseTxPayload::ContractCall {
            contract: pox4(),
            function_name: FN_DELEGATE_STX.into(),
            function_args: args.to_clarity_args(),
            result: None,
        });
        let ops = translator().to_operations(&delegate, TxContext::default()).await.unwrap();
        assert_eq!(values(&ops)[1], (OperationType::DelegateStx, Some(-7_000)));
        assert_eq!(ops[1].metadata_str("delegate_to"), Some(OTHER));
        assert_eq!(ops[1].metadata.as_ref().unwrap()["until_burn_height"], json!(2000));

        let revoke = base(BaseTxPayload::ContractCall {
            contract: pox4(),
            function_name: FN_REVOKE_DELEGATE_STX.into(),
            function_args: vec![],
            result: None,
        });
        let ops = translator().to_operations(&revoke, TxContext::default()).await.unwrap();
        assert_eq!(values(&ops)[1], (OperationType::RevokeDelegateStx, None));
        assert!(ops[1].metadata.is_none());
    }

    #[tokio::test]
    async fn malformed_pox_args_fall_back_to_contract_call() {
        let tx = base(BaseTxPayload::ContractCall {
            contract: pox4(),
            function_name: FN_STACK_STX.into(),
            function_args: vec![ClarityValue::UInt(1)],
            result: None,
        });
        let ops = translator().to_operations(&tx, TxContext::default()).await.unwrap();
        assert_eq!(ops[1].op_type, OperationType::ContractCall);
        let metadata = ops[1].metadata.as_ref().unwrap();
        assert_eq!(metadata["contract_id"], json!("ST000000000000000000002AMW42H.pox-4"));
        assert_eq!(metadata["function_args"][0]["repr"], json!("u1"));
        assert_eq!(metadata["function_args"][0]["hex"], json!(ClarityValue::UInt(1).to_hex().unwrap()));
    }

    #[tokio::test]
    async fn coinbase_with_rewards_and_unlocks() {
        let mut tx = base(BaseTxPayload::Coinbase { alt_recipient: None });
        tx.fee = 0;
        let rewards = [MinerReward {
            recipient: SENDER.into(),
            amount: 1_000_000,
        }];
        let unlocks = [StxUnlockEvent {
            address: OTHER.into(),
            amount: 25,
        }];
        let ctx = TxContext {
            miner_rewards: &rewards,
            unlock_events: &unlocks,
            ..TxContext::default()
        };

        let ops = translator().to_operations(&tx, ctx).await.unwrap();
        assert_eq!(
            values(&ops),
            vec![
                (OperationType::Coinbase, None),
                (OperationType::MinerReward, Some(1_000_000)),
                (OperationType::StxUnlock, Some(25)),
            ]
        );
    }

    #[tokio::test]
    async fn events_follow_the_payload() {
        let tx = base(BaseTxPayload::SmartContract {
            contract_id: format!("{SENDER}.market"),
        });
        let events = [
            TxEvent::NftMint {
                asset_identifier: format!("{SENDER}.market::ticket"),
                recipient: OTHER.into(),
                value: "0x0100000000000000000000000000000001".into(),
            },
            TxEvent::StxTransfer {
                sender: SENDER.into(),
                recipient: OTHER.into(),
                amount: 10,
            },
            TxEvent::StxLock {
                locked_address: SENDER.into(),
                locked_amount: 500,
                unlock_height: 1200,
            },
            TxEvent::StxBurn {
                sender: SENDER.into(),
                amount: 3,
            },
        ];

        let ops = translator().to_operations(&tx, TxContext::with_events(&events)).await.unwrap();
        assert_eq!(
            values(&ops),
            vec![
                (OperationType::Fee, Some(-180)),
                (OperationType::SmartContract, None),
                (OperationType::TokenTransfer, Some(-10)),
                (OperationType::TokenTransfer, Some(10)),
                (OperationType::StxLock, Some(-500)),
                (OperationType::Burned, Some(-3)),
            ]
        );
        assert_eq!(ops[4].metadata.as_ref().unwrap()["unlock_height"], json!(1200));
        assert_eq!(ops[3].related_operations, Some(vec![OperationIdentifier::new(2)]));
    }

    #[tokio::test]
    async fn transfer_events_are_not_duplicated_for_plain_transfers() {
        let tx = base(BaseTxPayload::TokenTransfer {
            recipient: RECIPIENT.into(),
            amount: 1000,
            memo: None,
        });
        let events = [TxEvent::StxTransfer {
            sender: SENDER.into(),
            recipient: RECIPIENT.into(),
            amount: 1000,
        }];
        let ops = translator().to_operations(&tx, TxContext::with_events(&events)).await.unwrap();
        assert_eq!(ops.len(), 3);
    }

    #[tokio::test]
    async fn send_many_memos_match_transfer_order() {
        let contract: ContractId = crate::config::SEND_MANY_MEMO_TESTNET.parse().unwrap();
        let recipient = |to: &str, ustx: u128, memo: &[u8]| {
            ClarityValue::tuple([
                ("to", ClarityValue::principal(to.parse::<PrincipalData>().unwrap())),
                ("ustx", ClarityValue::UInt(ustx)),
                ("memo", ClarityValue::Buffer(memo.to_vec())),
            ])
        };
        let tx = base(BaseTxPayload::ContractCall {
            contract,
            function_name: "send-many".into(),
            function_args: vec![ClarityValue::List(vec![
                recipient(RECIPIENT, 5, b"first\0\0"),
                recipient(OTHER, 6, b""),
            ])],
            result: None,
        });
        let events = [
            TxEvent::StxTransfer {
                sender: SENDER.into(),
                recipient: RECIPIENT.into(),
                amount: 5,
            },
            TxEvent::StxTransfer {
                sender: SENDER.into(),
                recipient: OTHER.into(),
                amount: 6,
            },
        ];

        let ops = translator().to_operations(&tx, TxContext::with_events(&events)).await.unwrap();
        assert_eq!(ops[1].op_type, OperationType::ContractCall);
        assert_eq!(ops[2].metadata_str("memo"), Some("first"));
        assert_eq!(ops[3].metadata_str("memo"), Some("first"));
        assert!(ops[4].metadata.is_none());
        assert!(ops[5].metadata.is_none());
    }

    #[tokio::test]
    async fn fungible_tokens_use_resolved_currency() {
        let tx = base(BaseTxPayload::SmartContract {
            contract_id: format!("{SENDER}.token"),
        });
        let events = [
            TxEvent::FtMint {
                asset_identifier: format!("{SENDER}.token::usda"),
                recipient: OTHER.into(),
                amount: 99,
            },
            TxEvent::FtTransfer {
                asset_identifier: format!("{SENDER}.token::unknown"),
                sender: OTHER.into(),
                recipient: SENDER.into(),
                amount: 1,
            },
        ];

        let warn = translator().with_token_metadata(Arc::new(FixedResolver));
        let ops = warn.to_operations(&tx, TxContext::with_events(&events)).await.unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[2].op_type, OperationType::Minted);
        assert_eq!(ops[2].amount.as_ref().unwrap().currency.symbol, "USDA");

        let strict = OperationTranslator::new(
            &RosettaConfig::default().with_ft_metadata_mode(FtMetadataMode::Strict),
        )
        .with_token_metadata(Arc::new(FixedResolver));
        let err = strict.to_operations(&tx, TxContext::with_events(&events)).await.unwrap_err();
        assert!(matches!(err, TranslateError::TokenMetadata { .. }));
    }
}
