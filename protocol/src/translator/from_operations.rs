//! Operations → construction options.
//!
//! Only `fee`, `token_transfer`, `stack_stx` and `delegate_stx` may appear
//! in a construction request. The sender is whichever operation debits an
//! account; for a transfer the positive operation is the recipient and the
//! two amounts must balance.

use serde_json::Value;

use crate::rosetta::{ConstructionOptions, Operation, OperationIntent, OperationType};

use super::TranslateError;

fn invalid(reason: impl Into<String>) -> TranslateError {
    TranslateError::InvalidOperations(reason.into())
}

/// Indices run 0, 1, 2, … in list order and every related operation is an
/// earlier one.
pub fn validate_operation_graph(ops: &[Operation]) -> Result<(), TranslateError> {
    for (position, op) in ops.iter().enumerate() {
        let index = op.index();
        if index as usize != position {
            return Err(invalid(format!("operation at position {position} has index {index}")));
        }
        for related in op.related_operations.iter().flatten() {
            if related.index >= index {
                return Err(invalid(format!(
                    "operation {index} relates to operation {}, which does not precede it",
                    related.index
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Metadata accessors
// ---------------------------------------------------------------------------

fn meta<'a>(op: &'a Operation, key: &str) -> Option<&'a Value> {
    op.metadata.as_ref()?.get(key).filter(|v| !v.is_null())
}

fn meta_text(op: &Operation, key: &str) -> Result<Option<String>, TranslateError> {
    match meta(op, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(format!("metadata.{key} must be a string"))),
    }
}

/// Like [`meta_text`], but numbers are accepted and rendered in decimal.
fn meta_string(op: &Operation, key: &str) -> Result<Option<String>, TranslateError> {
    match meta(op, key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(invalid(format!("metadata.{key} must be a string"))),
    }
}

fn meta_u64(op: &Operation, key: &str) -> Result<Option<u64>, TranslateError> {
    let parsed = match meta(op, key) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        Some(_) => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| invalid(format!("metadata.{key} must be a non-negative integer")))
}

fn require<T>(value: Option<T>, what: &str) -> Result<T, TranslateError> {
    value.ok_or_else(|| invalid(format!("missing {what}")))
}

/// The operation's amount as a signed integer. An absent amount and one
/// that is not a base-10 integer are reported differently.
fn amount_of(op: &Operation, what: &str) -> Result<i128, TranslateError> {
    let amount = require(op.amount.as_ref(), what)?;
    amount
        .parsed()
        .ok_or_else(|| invalid(format!("{what} '{}' is not an integer", amount.value)))
}

// ---------------------------------------------------------------------------
// from_operations
// ---------------------------------------------------------------------------

/// Recovers the options `preprocess` hands to `metadata`.
pub fn from_operations(ops: &[Operation]) -> Result<ConstructionOptions, TranslateError> {
    validate_operation_graph(ops)?;

    let mut fee: Option<u128> = None;
    let mut kind: Option<OperationType> = None;
    let mut sender: Option<String> = None;
    let mut recipient: Option<String> = None;
    let mut debit: Option<u128> = None;
    let mut credit: Option<u128> = None;
    let mut memo: Option<String> = None;
    let mut primary: Option<&Operation> = None;

    for op in ops {
        match op.op_type {
            OperationType::Fee => {
                if fee.is_some() {
                    return Err(invalid("more than one fee operation"));
                }
                let value = amount_of(op, "fee amount")?;
                if value > 0 {
                    return Err(invalid("fee amount must not be positive"));
                }
                fee = Some(value.unsigned_abs());
            }
            op_type @ (OperationType::TokenTransfer | OperationType::StackStx | OperationType::DelegateStx) => {
                if let Some(existing) = kind.filter(|k| *k != op_type) {
                    return Err(invalid(format!(
                        "ambiguous operation types '{}' and '{}'",
                        existing.as_str(),
                        op_type.as_str()
                    )));
                }
                kind = Some(op_type);

                let address = op
                    .account
                    .as_ref()
                    .map(|a| a.address.clone())
                    .ok_or_else(|| invalid(format!("operation {} has no account", op.index())))?;
                let value = amount_of(op, "amount")?;
                if value == 0 {
                    return Err(invalid("amount must be non-zero"));
                }
                if memo.is_none() {
                    memo = meta_text(op, "memo")?;
                }

                // Stacking operations name the stacker whatever the sign.
                if value < 0 || op_type != OperationType::TokenTransfer {
                    if sender.is_some() {
                        return Err(invalid("more than one sending operation"));
                    }
                    sender = Some(address);
                    debit = Some(value.unsigned_abs());
                    primary = Some(op);
                } else {
                    if recipient.is_some() {
                        return Err(invalid("more than one receiving operation"));
                    }
                    recipient = Some(address);
                    credit = Some(value.unsigned_abs());
                }
            }
            other => return Err(TranslateError::UnsupportedOperation(other)),
        }
    }

    let kind = require(kind, "token_transfer, stack_stx or delegate_stx operation")?;
    let sender = require(sender, "sender operation")?;
    let amount = require(debit, "sender amount")?;
    let primary = require(primary, "sender operation")?;

    let intent = match kind {
        OperationType::TokenTransfer => {
            let recipient = require(recipient, "recipient operation")?;
            if credit != Some(amount) {
                return Err(invalid("sender and recipient amounts do not balance"));
            }
            OperationIntent::TokenTransfer {
                token_transfer_recipient_address: recipient,
                amount: amount.to_string(),
            }
        }
        OperationType::StackStx => {
            let cycles = require(meta_u64(primary, "number_of_cycles")?, "metadata.number_of_cycles")?;
            OperationIntent::StackStx {
                amount: amount.to_string(),
                number_of_cycles: u32::try_from(cycles)
                    .map_err(|_| invalid("metadata.number_of_cycles is out of range"))?,
                pox_addr: require(meta_text(primary, "pox_addr")?, "metadata.pox_addr")?,
                signer_key: meta_text(primary, "signer_key")?,
                signer_private_key: meta_text(primary, "signer_private_key")?,
                signer_signature: meta_text(primary, "signer_signature")?,
                pox_max_amount: meta_string(primary, "pox_max_amount")?,
                pox_auth_id: meta_string(primary, "pox_auth_id")?,
            }
        }
        OperationType::DelegateStx => OperationIntent::DelegateStx {
            amount: amount.to_string(),
            delegate_to: require(meta_text(primary, "delegate_to")?, "metadata.delegate_to")?,
            pox_addr: meta_text(primary, "pox_addr")?,
            until_burn_height: meta_u64(primary, "until_burn_height")?,
        },
        other => return Err(TranslateError::UnsupportedOperation(other)),
    };

    let mut options = ConstructionOptions::new(sender, intent);
    options.fee = fee.map(|f| f.to_string());
    options.memo = memo;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosettaConfig;
    use crate::rosetta::{AccountIdentifier, Amount, Currency, OperationIdentifier};
    use crate::translator::{BaseTx, BaseTxPayload, OperationTranslator, TxContext};
    use serde_json::json;

    const SENDER: &str = "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM";
    const RECIPIENT: &str = "STDE7Y8HV3RX8VBM2TZVWJTS7ZA1XB0SSC3NEVH0";

    fn op(index: u32, op_type: OperationType, address: &str, value: Option<i128>) -> Operation {
        let mut op = Operation::new(index, op_type);
        op.account = Some(AccountIdentifier::new(address));
        op.amount = value.map(Amount::stx);
        op
    }

    fn transfer_ops() -> Vec<Operation> {
        let mut credit = op(2, OperationType::TokenTransfer, RECIPIENT, Some(1000));
        credit.related_operations = Some(vec![OperationIdentifier::new(1)]);
        vec![
            op(0, OperationType::Fee, SENDER, Some(-180)),
            op(1, OperationType::TokenTransfer, SENDER, Some(-1000)),
            credit,
        ]
    }

    #[test]
    fn transfer_options() {
        let options = from_operations(&transfer_ops()).unwrap();
        assert_eq!(options.sender_address, SENDER);
        assert_eq!(options.fee.as_deref(), Some("180"));
        assert_eq!(
            options.intent,
            OperationIntent::TokenTransfer {
                token_transfer_recipient_address: RECIPIENT.into(),
                amount: "1000".into(),
            }
        );
    }

    #[test]
    fn stacking_options_read_metadata() {
        let mut stack = op(0, OperationType::StackStx, SENDER, Some(-5_000));
        stack.metadata = json!({
            "number_of_cycles": "2",
            "pox_addr": "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r",
            "pox_auth_id": 7,
        })
        .as_object()
        .cloned();
        let options = from_operations(&[stack]).unwrap();
        match options.intent {
            OperationIntent::StackStx {
                amount,
                number_of_cycles,
                pox_auth_id,
                signer_key,
                ..
            } => {
                assert_eq!(amount, "5000");
                assert_eq!(number_of_cycles, 2);
                assert_eq!(pox_auth_id.as_deref(), Some("7"));
                assert_eq!(signer_key, None);
            }
            other => panic!("unexpected intent {other:?}"),
        }
        assert_eq!(options.fee, None);
    }

    #[test]
    fn stacking_requires_its_metadata() {
        let mut stack = op(0, OperationType::StackStx, SENDER, Some(-5_000));
        stack.metadata = json!({ "pox_addr": "mrCDrCybB6J1vRfbwM5hemdJz73FwDBC8r" }).as_object().cloned();
        assert!(from_operations(&[stack.clone()]).is_err());

        stack.metadata = json!({ "number_of_cycles": 2, "pox_addr": 12 }).as_object().cloned();
        assert!(from_operations(&[stack]).is_err());

        let delegate = op(0, OperationType::DelegateStx, SENDER, Some(-5_000));
        assert!(from_operations(&[delegate]).is_err());
    }

    #[test]
    fn rejects_mixed_and_unsupported_types() {
        let mut ops = transfer_ops();
        ops[2].op_type = OperationType::DelegateStx;
        assert!(matches!(from_operations(&ops), Err(TranslateError::InvalidOperations(_))));

        let coinbase = op(0, OperationType::Coinbase, SENDER, None);
        assert_eq!(
            from_operations(&[coinbase]),
            Err(TranslateError::UnsupportedOperation(OperationType::Coinbase))
        );
    }

    #[test]
    fn non_numeric_amount_is_not_reported_as_missing() {
        let mut ops = transfer_ops();
        ops[1].amount = Some(Amount {
            value: "abc".to_string(),
            currency: Currency::stx(),
            metadata: None,
        });
        assert_eq!(
            from_operations(&ops),
            Err(TranslateError::InvalidOperations("amount 'abc' is not an integer".into()))
        );

        ops[1].amount = None;
        assert_eq!(
            from_operations(&ops),
            Err(TranslateError::InvalidOperations("missing amount".into()))
        );

        let mut ops = transfer_ops();
        ops[0].amount = Some(Amount {
            value: "1.5".to_string(),
            currency: Currency::stx(),
            metadata: None,
        });
        assert_eq!(
            from_operations(&ops),
            Err(TranslateError::InvalidOperations("fee amount '1.5' is not an integer".into()))
        );
    }

    #[test]
    fn rejects_unbalanced_transfers() {
        let mut ops = transfer_ops();
        ops[2].amount = Some(Amount::stx(999));
        assert!(from_operations(&ops).is_err());
    }

    #[test]
    fn related_operations_must_point_backwards() {
        let mut ops = transfer_ops();
        ops[1].related_operations = Some(vec![OperationIdentifier::new(2)]);
        assert!(validate_operation_graph(&ops).is_err());

        let mut ops = transfer_ops();
        ops[2].related_operations = Some(vec![OperationIdentifier::new(2)]);
        assert!(validate_operation_graph(&ops).is_err());

        let mut ops = transfer_ops();
        ops[2].operation_identifier.index = 5;
        assert!(from_operations(&ops).is_err());

        assert!(validate_operation_graph(&transfer_ops()).is_ok());
    }

    #[tokio::test]
    async fn round_trips_through_to_operations() {
        let tx = BaseTx {
            tx_id: "0x00".into(),
            sender_address: SENDER.into(),
            sponsor_address: None,
            sponsored: false,
            fee: 250,
            nonce: 0,
            signed: false,
            status: None,
            payload: BaseTxPayload::TokenTransfer {
                recipient: RECIPIENT.into(),
                amount: 12_345,
                memo: Some("hi".into()),
            },
        };
        let ops = OperationTranslator::new(&RosettaConfig::default())
            .to_operations(&tx, TxContext::default())
            .await
            .unwrap();
        let options = from_operations(&ops).unwrap();

        assert_eq!(options.sender_address, SENDER);
        assert_eq!(options.fee.as_deref(), Some("250"));
        assert_eq!(options.memo.as_deref(), Some("hi"));
        assert_eq!(options.intent.amount(), "12345");
    }
}
