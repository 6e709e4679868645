//! The eight `/construction/*` steps.

use rand::Rng;
use tracing::{debug, info};

use crate::address::{ContractId, StacksAddress};
use crate::backend::PoxInfo;
use crate::config::{MAX_CONSTRUCTION_OPERATIONS, STX_DECIMALS, STX_SYMBOL};
use crate::crypto::signatures::to_recoverable_rsv;
use crate::crypto::{rsv_to_vrs, CryptoError, Secp256k1PrivateKey, Secp256k1PublicKey};
use crate::pox::signer::{sign_signer_message, SignerKeyMessage};
use crate::pox::{requires_signer_key, SignerAuthorization};
use crate::rosetta::{
    AccountIdentifier, Amount, ConstructionCombineRequest, ConstructionCombineResponse, ConstructionDeriveRequest,
    ConstructionDeriveResponse, ConstructionHashRequest, ConstructionMetadata, ConstructionMetadataRequest,
    ConstructionMetadataResponse, ConstructionOptions, ConstructionParseRequest, ConstructionParseResponse,
    ConstructionPayloadsRequest, ConstructionPayloadsResponse, ConstructionPreprocessRequest,
    ConstructionPreprocessResponse, ConstructionSubmitRequest, Currency, CurveType, OperationIntent, PublicKey,
    RosettaError, RosettaErrorKind, SignatureType, SigningPayload, TransactionIdentifier,
    TransactionIdentifierResponse,
};
use crate::transaction::{
    is_signed, presign_digest, splice_origin_signature, verify_origin, MessageSignature, SpendingCondition,
    StacksTransaction, TransactionError,
};
use crate::translator::{from_operations, BaseTx, TxContext};

use super::build::{
    build_transaction, parse_amount, parse_pox_address, parse_principal, parse_sender, parse_signer_key,
    parse_signer_signature, PoxContext,
};
use super::fees::{check_max_fee, suggested_fee};
use super::RosettaService;

fn invalid_transaction(err: TransactionError) -> RosettaError {
    RosettaError::with_message(RosettaErrorKind::InvalidTransactionString, err)
}

fn internal(err: impl std::fmt::Display) -> RosettaError {
    RosettaError::with_message(RosettaErrorKind::UnknownError, err)
}

fn parse_public_key(key: &PublicKey) -> Result<Secp256k1PublicKey, RosettaError> {
    if key.curve_type != CurveType::Secp256k1 {
        return Err(RosettaError::with_message(
            RosettaErrorKind::InvalidCurveType,
            "only secp256k1 keys are supported",
        ));
    }
    Secp256k1PublicKey::from_hex(&key.hex_bytes)
        .map_err(|e| RosettaError::with_message(RosettaErrorKind::InvalidPublicKey, e))
}

/// Exactly one key, for a single-sig origin.
fn single_public_key(keys: Option<&[PublicKey]>) -> Result<Secp256k1PublicKey, RosettaError> {
    match keys.unwrap_or_default() {
        [] => Err(RosettaErrorKind::EmptyPublicKey.into()),
        [key] => parse_public_key(key),
        _ => Err(RosettaErrorKind::NeedOnePublicKey.into()),
    }
}

fn check_currency(currency: &Currency) -> Result<(), RosettaError> {
    if currency.symbol != STX_SYMBOL {
        return Err(RosettaError::with_message(
            RosettaErrorKind::InvalidCurrencySymbol,
            format!("expected {STX_SYMBOL}, got '{}'", currency.symbol),
        ));
    }
    if currency.decimals != STX_DECIMALS {
        return Err(RosettaError::with_message(
            RosettaErrorKind::InvalidCurrencyDecimals,
            format!("expected {STX_DECIMALS}, got {}", currency.decimals),
        ));
    }
    Ok(())
}

fn max_fee_value(amounts: &[Amount]) -> Result<Option<String>, RosettaError> {
    let Some(amount) = amounts.first() else {
        return Ok(None);
    };
    check_currency(&amount.currency)?;
    match amount.parsed() {
        Some(value) if value >= 0 => Ok(Some(value.to_string())),
        _ => Err(RosettaError::with_message(
            RosettaErrorKind::InvalidFee,
            format!("invalid max_fee '{}'", amount.value),
        )),
    }
}

fn strip_hex(s: &str) -> String {
    s.trim_start_matches("0x").to_ascii_lowercase()
}

/// The pox-4 fields `metadata` hands on to `payloads`.
struct SignerFields {
    signer_key: String,
    signer_signature: String,
    pox_max_amount: String,
    pox_auth_id: String,
}

impl RosettaService {
    // -----------------------------------------------------------------------
    // derive
    // -----------------------------------------------------------------------

    pub fn derive(&self, req: ConstructionDeriveRequest) -> Result<ConstructionDeriveResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let key = parse_public_key(&req.public_key)?;
        let address = StacksAddress::from_public_key(self.config.network, &key);
        debug!(%address, "derived account");
        Ok(ConstructionDeriveResponse {
            account_identifier: AccountIdentifier::new(address.to_string()),
            metadata: None,
        })
    }

    // -----------------------------------------------------------------------
    // preprocess
    // -----------------------------------------------------------------------

    pub fn preprocess(
        &self,
        req: ConstructionPreprocessRequest,
    ) -> Result<ConstructionPreprocessResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        if req.operations.len() > MAX_CONSTRUCTION_OPERATIONS {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidOperation,
                format!(
                    "at most {MAX_CONSTRUCTION_OPERATIONS} operations are allowed, got {}",
                    req.operations.len()
                ),
            ));
        }
        for amount in req.operations.iter().filter_map(|op| op.amount.as_ref()) {
            check_currency(&amount.currency)?;
        }

        let network = self.config.network;
        let mut options = from_operations(&req.operations)?;
        options.max_fee = max_fee_value(req.max_fee.as_deref().unwrap_or_default())?;
        options.suggested_fee_multiplier = req.suggested_fee_multiplier;
        options.symbol = Some(STX_SYMBOL.to_string());
        options.decimals = Some(STX_DECIMALS);

        let pox = if options.intent.is_stacking() {
            Some(PoxContext::placeholder(network)?)
        } else {
            None
        };
        let placeholder = build_transaction(
            network,
            &options,
            SpendingCondition::new_single_sig_from_hash([0u8; 20]),
            0,
            0,
            pox.as_ref(),
        )?;
        let size = placeholder.size().map_err(internal)?;
        options.size = Some(size as u64);

        debug!(
            sender = %options.sender_address,
            kind = options.intent.operation_type().as_str(),
            size,
            "preprocessed operations"
        );
        let required_public_keys = vec![AccountIdentifier::new(options.sender_address.clone())];
        Ok(ConstructionPreprocessResponse {
            options,
            required_public_keys,
        })
    }

    // -----------------------------------------------------------------------
    // metadata
    // -----------------------------------------------------------------------

    pub async fn metadata(
        &self,
        req: ConstructionMetadataRequest,
    ) -> Result<ConstructionMetadataResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let network = self.config.network;
        let options = req.options;

        // Address checks come before any collaborator call.
        parse_sender(&options.sender_address, network)?;
        if let OperationIntent::TokenTransfer {
            token_transfer_recipient_address,
            ..
        } = &options.intent
        {
            parse_principal(token_transfer_recipient_address, network, RosettaErrorKind::InvalidRecipient)?;
        }
        let size = options.size.ok_or(RosettaErrorKind::MissingTransactionSize)?;

        let (nonce, recent_block_hash, fee_rate) = tokio::join!(
            self.call(self.store.get_nonce(&options.sender_address)),
            self.call(self.store.get_recent_block_hash()),
            self.call(self.rpc.get_fee_rate()),
        );
        let (nonce, recent_block_hash, fee_rate) = (nonce?, recent_block_hash?, fee_rate?);

        let fee = suggested_fee(size, fee_rate, options.suggested_fee_multiplier)?;
        check_max_fee(fee, options.max_fee.as_deref())?;

        let mut metadata = ConstructionMetadata {
            options,
            account_sequence: nonce,
            recent_block_hash,
            fee: fee.to_string(),
            contract_address: None,
            contract_name: None,
            burn_block_height: None,
            reward_cycle_id: None,
            signer_signature: None,
            signer_key: None,
            pox_auth_id: None,
            pox_max_amount: None,
        };
        if metadata.options.intent.is_stacking() {
            let pox = self.call(self.rpc.get_pox_info()).await?;
            self.fill_stacking_metadata(&mut metadata, &pox)?;
        }

        debug!(
            sender = %metadata.options.sender_address,
            nonce,
            fee,
            fee_rate,
            "resolved construction metadata"
        );
        Ok(ConstructionMetadataResponse {
            metadata,
            suggested_fee: Some(vec![Amount::stx(i128::from(fee))]),
        })
    }

    fn fill_stacking_metadata(&self, metadata: &mut ConstructionMetadata, pox: &PoxInfo) -> Result<(), RosettaError> {
        let contract: ContractId = pox
            .contract_id
            .parse()
            .map_err(|e| internal(format!("node reported PoX contract '{}': {e}", pox.contract_id)))?;
        metadata.contract_address = Some(contract.issuer.to_string());
        metadata.contract_name = Some(contract.name.clone());
        metadata.burn_block_height = Some(pox.current_burnchain_block_height);
        metadata.reward_cycle_id = Some(pox.reward_cycle_id);

        let intent = metadata.options.intent.clone();
        let OperationIntent::StackStx { amount, .. } = &intent else {
            return Ok(());
        };
        let amount: u128 = parse_amount(amount)?;
        if amount < pox.min_amount_ustx {
            return Err(RosettaError::with_message(
                RosettaErrorKind::StackingEligibilityError,
                format!("{amount} µSTX is below the minimum of {}", pox.min_amount_ustx),
            ));
        }
        if requires_signer_key(&contract.name) {
            let fields = self.signer_fields(&intent, amount, pox.reward_cycle_id)?;
            metadata.signer_key = Some(fields.signer_key);
            metadata.signer_signature = Some(fields.signer_signature);
            metadata.pox_max_amount = Some(fields.pox_max_amount);
            metadata.pox_auth_id = Some(fields.pox_auth_id);
            // The private key was only needed to sign; never echo it back.
            if let OperationIntent::StackStx {
                signer_private_key, ..
            } = &mut metadata.options.intent
            {
                *signer_private_key = None;
            }
        }
        Ok(())
    }

    fn signer_fields(&self, intent: &OperationIntent, amount: u128, reward_cycle: u64) -> Result<SignerFields, RosettaError> {
        let OperationIntent::StackStx {
            number_of_cycles,
            pox_addr,
            signer_key,
            signer_private_key,
            signer_signature,
            pox_max_amount,
            pox_auth_id,
            ..
        } = intent
        else {
            return Err(internal("signer fields requested for a non stack_stx intent"));
        };

        let signer_key = signer_key.as_deref().ok_or_else(|| {
            RosettaError::with_message(RosettaErrorKind::MissingSignerKey, "pox-4 stack_stx requires signer_key")
        })?;
        let key_bytes = parse_signer_key(signer_key)?;
        let max_amount = match pox_max_amount {
            Some(value) => parse_amount::<u128>(value)?,
            None => amount,
        };
        let auth_id = match pox_auth_id {
            Some(value) => parse_amount::<u128>(value)?,
            None => u128::from(rand::thread_rng().gen::<u32>()),
        };

        let signature = match (signer_signature, signer_private_key) {
            (Some(signature), _) => {
                parse_signer_signature(signature)?;
                strip_hex(signature)
            }
            (None, Some(private_key)) => {
                let key = Secp256k1PrivateKey::from_hex(private_key)
                    .map_err(|e| RosettaError::with_message(RosettaErrorKind::InvalidParams, format!("signer_private_key: {e}")))?;
                if key.public_key().to_bytes() != key_bytes {
                    return Err(RosettaError::with_message(
                        RosettaErrorKind::InvalidPublicKey,
                        "signer_private_key does not match signer_key",
                    ));
                }
                let message = SignerKeyMessage::stack_stx(
                    parse_pox_address(pox_addr, self.config.network)?,
                    u128::from(reward_cycle),
                    u128::from(*number_of_cycles),
                    auth_id,
                    max_amount,
                );
                let rsv = sign_signer_message(self.config.network, &message, &key).map_err(internal)?;
                hex::encode(rsv)
            }
            (None, None) => {
                return Err(RosettaError::with_message(
                    RosettaErrorKind::MissingSignerKey,
                    "pox-4 stack_stx requires signer_signature or signer_private_key",
                ))
            }
        };

        Ok(SignerFields {
            signer_key: hex::encode(key_bytes),
            signer_signature: signature,
            pox_max_amount: max_amount.to_string(),
            pox_auth_id: auth_id.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // payloads
    // -----------------------------------------------------------------------

    pub fn payloads(&self, req: ConstructionPayloadsRequest) -> Result<ConstructionPayloadsResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let network = self.config.network;

        let mut options = from_operations(&req.operations)?;
        let sender = parse_sender(&options.sender_address, network)?;
        let public_key = single_public_key(req.public_keys.as_deref())?;
        if StacksAddress::from_public_key(network, &public_key) != sender {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidPublicKey,
                format!("public key does not belong to {sender}"),
            ));
        }

        let metadata = req.metadata.ok_or(RosettaErrorKind::MissingNonce)?;
        if options.memo.is_none() {
            options.memo = metadata.options.memo.clone();
        }
        let fee_text = options.fee.clone().unwrap_or_else(|| metadata.fee.clone());
        let fee: u64 = fee_text.parse().map_err(|_| {
            RosettaError::with_message(RosettaErrorKind::InvalidFees, format!("invalid fee '{fee_text}'"))
        })?;

        let pox = if options.intent.is_stacking() {
            Some(payload_pox_context(&options, &metadata)?)
        } else {
            None
        };
        let tx = build_transaction(
            network,
            &options,
            SpendingCondition::new_single_sig_p2pkh(&public_key),
            metadata.account_sequence,
            fee,
            pox.as_ref(),
        )?;
        let digest = presign_digest(&tx).map_err(internal)?;
        let unsigned_transaction = tx.to_hex().map_err(internal)?;

        debug!(
            sender = %sender,
            nonce = metadata.account_sequence,
            fee,
            "built unsigned transaction"
        );
        Ok(ConstructionPayloadsResponse {
            unsigned_transaction,
            payloads: vec![SigningPayload {
                address: Some(sender.to_string()),
                account_identifier: Some(AccountIdentifier::new(sender.to_string())),
                hex_bytes: hex::encode(digest),
                signature_type: Some(SignatureType::EcdsaRecovery),
            }],
        })
    }

    // -----------------------------------------------------------------------
    // combine
    // -----------------------------------------------------------------------

    pub fn combine(&self, req: ConstructionCombineRequest) -> Result<ConstructionCombineResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let tx = StacksTransaction::from_hex(&req.unsigned_transaction).map_err(invalid_transaction)?;

        let signature = match req.signatures.as_slice() {
            [] => return Err(RosettaErrorKind::NoSignatures.into()),
            [one] => one,
            _ => return Err(RosettaErrorKind::NeedOnlyOneSignature.into()),
        };
        if !tx.auth.origin().hash_mode().is_single_sig() {
            return Err(RosettaError::with_message(
                RosettaErrorKind::SignatureTypeNotSupported,
                TransactionError::MultisigUnsupported,
            ));
        }
        let expected_len = match signature.signature_type {
            SignatureType::EcdsaRecovery => 65,
            SignatureType::Ecdsa => 64,
            other => {
                return Err(RosettaError::with_message(
                    RosettaErrorKind::SignatureTypeNotSupported,
                    format!("unsupported signature type {other:?}"),
                ))
            }
        };

        let public_key = parse_public_key(&signature.public_key)?;
        let bytes = hex::decode(strip_hex(&signature.hex_bytes))
            .map_err(|e| RosettaError::with_message(RosettaErrorKind::InvalidSignature, e))?;
        if bytes.len() != expected_len {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidSignature,
                format!("expected {expected_len} signature bytes, got {}", bytes.len()),
            ));
        }

        let digest = presign_digest(&tx).map_err(invalid_transaction)?;
        let payload_hex = strip_hex(&signature.signing_payload.hex_bytes);
        if !payload_hex.is_empty() && payload_hex != hex::encode(digest) {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidSignature,
                "signing payload does not match the transaction",
            ));
        }

        let rsv = to_recoverable_rsv(&digest, &public_key, &bytes).map_err(|e| match e {
            CryptoError::InvalidSignatureLength(_) | CryptoError::MalformedSignature => {
                RosettaError::with_message(RosettaErrorKind::InvalidSignature, e)
            }
            other => RosettaError::with_message(RosettaErrorKind::SignatureNotVerified, other),
        })?;
        let signed =
            splice_origin_signature(&tx, MessageSignature(rsv_to_vrs(&rsv))).map_err(invalid_transaction)?;
        verify_origin(&signed).map_err(|e| RosettaError::with_message(RosettaErrorKind::SignatureNotVerified, e))?;

        Ok(ConstructionCombineResponse {
            signed_transaction: signed.to_hex().map_err(internal)?,
        })
    }

    // -----------------------------------------------------------------------
    // hash / parse / submit
    // -----------------------------------------------------------------------

    pub fn hash(&self, req: ConstructionHashRequest) -> Result<TransactionIdentifierResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let tx = StacksTransaction::from_hex(&req.signed_transaction).map_err(invalid_transaction)?;
        if !is_signed(&tx) {
            return Err(RosettaErrorKind::TransactionNotSigned.into());
        }
        let txid = tx.txid().map_err(invalid_transaction)?;
        Ok(TransactionIdentifierResponse {
            transaction_identifier: TransactionIdentifier {
                hash: txid.to_hex_prefixed(),
            },
            metadata: None,
        })
    }

    pub async fn parse(&self, req: ConstructionParseRequest) -> Result<ConstructionParseResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let tx = StacksTransaction::from_hex(&req.transaction).map_err(invalid_transaction)?;
        let base = BaseTx::from_transaction(&tx)?;
        match (req.signed, base.signed) {
            (true, false) => return Err(RosettaErrorKind::TransactionNotSigned.into()),
            (false, true) => {
                return Err(RosettaError::with_message(
                    RosettaErrorKind::InvalidTransactionString,
                    "transaction is signed but was declared unsigned",
                ))
            }
            _ => {}
        }

        let operations = self.translator.to_operations(&base, TxContext::default()).await?;
        let account_identifier_signers = req.signed.then(|| {
            std::iter::once(&base.sender_address)
                .chain(base.sponsor_address.as_ref())
                .map(|address| AccountIdentifier::new(address.clone()))
                .collect()
        });
        debug!(tx_id = %base.tx_id, operations = operations.len(), "parsed transaction");
        Ok(ConstructionParseResponse {
            operations,
            account_identifier_signers,
            metadata: None,
        })
    }

    pub async fn submit(&self, req: ConstructionSubmitRequest) -> Result<TransactionIdentifierResponse, RosettaError> {
        self.check_network(&req.network_identifier)?;
        let tx = StacksTransaction::from_hex(&req.signed_transaction).map_err(invalid_transaction)?;
        if !is_signed(&tx) {
            return Err(RosettaErrorKind::TransactionNotSigned.into());
        }
        let bytes = tx.to_bytes().map_err(invalid_transaction)?;
        let reported = self.call(self.rpc.broadcast(&bytes)).await?;
        let hash = format!("0x{}", reported.trim_matches('"').trim_start_matches("0x"));
        info!(txid = %hash, bytes = bytes.len(), "submitted transaction");
        Ok(TransactionIdentifierResponse {
            transaction_identifier: TransactionIdentifier { hash },
            metadata: None,
        })
    }
}

/// The PoX contract and signer authorization `metadata` resolved.
fn payload_pox_context(options: &ConstructionOptions, metadata: &ConstructionMetadata) -> Result<PoxContext, RosettaError> {
    let address = metadata
        .contract_address
        .as_deref()
        .ok_or(RosettaErrorKind::MissingContractAddress)?;
    let name = metadata
        .contract_name
        .as_deref()
        .ok_or(RosettaErrorKind::MissingContractName)?;
    let issuer: StacksAddress = address
        .parse()
        .map_err(|e| RosettaError::with_message(RosettaErrorKind::MissingContractAddress, e))?;
    let contract = ContractId::new(issuer, name)
        .map_err(|e| RosettaError::with_message(RosettaErrorKind::MissingContractName, e))?;

    let OperationIntent::StackStx {
        amount,
        signer_key,
        signer_signature,
        pox_max_amount,
        pox_auth_id,
        ..
    } = &options.intent
    else {
        return Ok(PoxContext {
            contract,
            start_burn_height: 0,
            signer: None,
        });
    };

    // Locking starts with the next burn block.
    let start_burn_height = metadata
        .burn_block_height
        .map(|h| h + 1)
        .ok_or_else(|| RosettaError::with_message(RosettaErrorKind::InvalidParams, "missing burn_block_height"))?;

    let signer = if requires_signer_key(name) {
        let key = metadata
            .signer_key
            .as_deref()
            .or(signer_key.as_deref())
            .ok_or(RosettaErrorKind::MissingSignerKey)?;
        let signature = metadata
            .signer_signature
            .as_deref()
            .or(signer_signature.as_deref())
            .map(parse_signer_signature)
            .transpose()?;
        let max_amount = metadata
            .pox_max_amount
            .as_deref()
            .or(pox_max_amount.as_deref())
            .unwrap_or(amount);
        let auth_id = metadata
            .pox_auth_id
            .as_deref()
            .or(pox_auth_id.as_deref())
            .ok_or_else(|| RosettaError::with_message(RosettaErrorKind::InvalidParams, "missing pox_auth_id"))?;
        Some(SignerAuthorization {
            signer_signature: signature,
            signer_key: parse_signer_key(key)?,
            max_amount: parse_amount(max_amount)?,
            auth_id: parse_amount(auth_id)?,
        })
    } else {
        None
    };

    Ok(PoxContext {
        contract,
        start_burn_height,
        signer,
    })
}
