//! The Stacks transaction and its builder.
//!
//! [`TransactionBuilder`] assembles an unsigned [`StacksTransaction`] from
//! an origin spending condition and a payload. Signing is a separate step
//! ([`super::signing`]), so construction never needs key material.
//!
//! # Wire format
//!
//! ```text
//! version u8 | chain_id u32 | auth | anchor_mode u8 | post_condition_mode u8
//!   | u32 n | post_condition*n | payload
//! ```

use std::io::{Read, Write};

use crate::address::StacksAddress;
use crate::codec::{deserialize_exact, read_next, write_next, CodecError, StacksMessageCodec};
use crate::config::StacksNetwork;
use crate::crypto::hash::sha512_256;

use super::auth::{SpendingCondition, TransactionAuth};
use super::payload::TransactionPayload;
use super::post_condition::PostCondition;
use super::types::{AnchorMode, PostConditionMode, Txid};
use super::verification::TransactionError;

// ---------------------------------------------------------------------------
// StacksTransaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StacksTransaction {
    pub network: StacksNetwork,
    pub chain_id: u32,
    pub auth: TransactionAuth,
    pub anchor_mode: AnchorMode,
    pub post_condition_mode: PostConditionMode,
    pub post_conditions: Vec<PostCondition>,
    pub payload: TransactionPayload,
}

impl StacksTransaction {
    /// Decodes raw bytes. The whole input must be consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        Ok(deserialize_exact(bytes)?)
    }

    /// Decodes hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| TransactionError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(self.serialize_to_vec()?)
    }

    /// `0x`-prefixed hex of the serialized transaction.
    pub fn to_hex(&self) -> Result<String, TransactionError> {
        Ok(format!("0x{}", hex::encode(self.to_bytes()?)))
    }

    pub fn txid(&self) -> Result<Txid, TransactionError> {
        Ok(Txid(sha512_256(&self.to_bytes()?)))
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> Result<usize, TransactionError> {
        Ok(self.to_bytes()?.len())
    }

    pub fn origin_address(&self) -> StacksAddress {
        self.auth.origin().address(self.network)
    }

    pub fn sponsor_address(&self) -> Option<StacksAddress> {
        self.auth.sponsor().map(|s| s.address(self.network))
    }

    pub fn is_sponsored(&self) -> bool {
        self.auth.is_sponsored()
    }

    pub fn tx_fee(&self) -> u64 {
        self.auth.tx_fee()
    }

    pub fn nonce(&self) -> u64 {
        self.auth.origin_nonce()
    }

    pub fn set_tx_fee(&mut self, fee: u64) {
        self.auth.set_tx_fee(fee);
    }

    pub fn set_origin_nonce(&mut self, nonce: u64) {
        self.auth.origin_mut().set_nonce(nonce);
    }
}

impl StacksMessageCodec for StacksTransaction {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_next(fd, &self.network.transaction_version())?;
        write_next(fd, &self.chain_id)?;
        write_next(fd, &self.auth)?;
        write_next(fd, &self.anchor_mode)?;
        write_next(fd, &self.post_condition_mode)?;
        write_next(fd, &self.post_conditions)?;
        write_next(fd, &self.payload)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, CodecError> {
        let version: u8 = read_next(fd)?;
        let network = StacksNetwork::from_transaction_version(version).ok_or_else(|| {
            CodecError::DeserializeError(format!("unknown transaction version {version:#04x}"))
        })?;
        Ok(Self {
            network,
            chain_id: read_next(fd)?,
            auth: read_next(fd)?,
            anchor_mode: read_next(fd)?,
            post_condition_mode: read_next(fd)?,
            post_conditions: read_next(fd)?,
            payload: read_next(fd)?,
        })
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`StacksTransaction`]s.
///
/// Defaults: chain id of the network, anchor mode `Any`, post-condition
/// mode `Deny`, no post-conditions, standard (non-sponsored) auth.
///
/// ```
/// use stacks_rosetta::config::StacksNetwork;
/// use stacks_rosetta::crypto::Secp256k1PublicKey;
/// use stacks_rosetta::transaction::{SpendingCondition, TransactionBuilder, TransactionPayload, TokenTransferMemo};
///
/// let pk = Secp256k1PublicKey::from_hex(
///     "025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51",
/// ).unwrap();
/// let recipient = "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM".parse().unwrap();
///
/// let tx = TransactionBuilder::new(StacksNetwork::Testnet)
///     .origin(SpendingCondition::new_single_sig_p2pkh(&pk))
///     .payload(TransactionPayload::token_transfer(recipient, 1000, TokenTransferMemo::empty()))
///     .fee(180)
///     .nonce(0)
///     .build()
///     .unwrap();
/// assert_eq!(tx.tx_fee(), 180);
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    network: StacksNetwork,
    chain_id: u32,
    origin: Option<SpendingCondition>,
    sponsor: Option<SpendingCondition>,
    nonce: u64,
    fee: u64,
    anchor_mode: AnchorMode,
    post_condition_mode: PostConditionMode,
    post_conditions: Vec<PostCondition>,
    payload: Option<TransactionPayload>,
}

impl TransactionBuilder {
    pub fn new(network: StacksNetwork) -> Self {
        Self {
            network,
            chain_id: network.chain_id(),
            origin: None,
            sponsor: None,
            nonce: 0,
            fee: 0,
            anchor_mode: AnchorMode::Any,
            post_condition_mode: PostConditionMode::Deny,
            post_conditions: Vec::new(),
            payload: None,
        }
    }

    pub fn chain_id(mut self, chain_id: u32) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn origin(mut self, condition: SpendingCondition) -> Self {
        self.origin = Some(condition);
        self
    }

    /// Makes the transaction sponsored; the fee is charged to `condition`.
    pub fn sponsor(mut self, condition: SpendingCondition) -> Self {
        self.sponsor = Some(condition);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn anchor_mode(mut self, mode: AnchorMode) -> Self {
        self.anchor_mode = mode;
        self
    }

    pub fn post_condition_mode(mut self, mode: PostConditionMode) -> Self {
        self.post_condition_mode = mode;
        self
    }

    pub fn post_condition(mut self, condition: PostCondition) -> Self {
        self.post_conditions.push(condition);
        self
    }

    pub fn payload(mut self, payload: TransactionPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn build(self) -> Result<StacksTransaction, TransactionError> {
        let mut origin = self.origin.ok_or(TransactionError::MissingOrigin)?;
        let payload = self.payload.ok_or(TransactionError::MissingPayload)?;
        origin.set_nonce(self.nonce);

        let auth = match self.sponsor {
            Some(sponsor) => TransactionAuth::Sponsored(origin, sponsor),
            None => TransactionAuth::Standard(origin),
        };

        let mut tx = StacksTransaction {
            network: self.network,
            chain_id: self.chain_id,
            auth,
            anchor_mode: self.anchor_mode,
            post_condition_mode: self.post_condition_mode,
            post_conditions: self.post_conditions,
            payload,
        };
        tx.set_tx_fee(self.fee);
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::types::TokenTransferMemo;

    /// A signed testnet STX transfer: nonce 0, fee 180, 500000 µSTX.
    pub(crate) const SIGNED_TRANSFER_HEX: &str = "0x80800000000400539886f96611ba3ba6cef9618f8c78118b37c5be000000000000000000000000000000b400017a33a91515ef48608a99c6adecd2eb258e11534a1acf66348f5678c8e2c8f83d243555ed67a0019d3500df98563ca31321c1a675b43ef79f146e322fe08df75103020000000000051a1ae3f911d8f1d46d7416bfbe4b593fd41eac19cb000000000007a12000000000000000000000000000000000000000000000000000000000000000000000";

    #[test]
    fn decodes_known_transfer() {
        let tx = StacksTransaction::from_hex(SIGNED_TRANSFER_HEX).unwrap();
        assert_eq!(tx.network, StacksNetwork::Testnet);
        assert_eq!(tx.chain_id, 0x8000_0000);
        assert_eq!(tx.tx_fee(), 180);
        assert_eq!(tx.nonce(), 0);
        assert_eq!(tx.anchor_mode, AnchorMode::Any);
        assert_eq!(tx.post_condition_mode, PostConditionMode::Deny);
        assert!(tx.post_conditions.is_empty());
        assert_eq!(
            tx.origin_address().to_string(),
            "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM"
        );
        match &tx.payload {
            TransactionPayload::TokenTransfer { amount, memo, .. } => {
                assert_eq!(*amount, 500_000);
                assert_eq!(memo.to_text(), None);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn known_transfer_txid() {
        let tx = StacksTransaction::from_hex(SIGNED_TRANSFER_HEX).unwrap();
        assert_eq!(
            tx.txid().unwrap().to_hex_prefixed(),
            "0xf3b054a5fbae98f7f35e5e917b65759fc365a3e073f8af1c3b8d211b286fa74a"
        );
        assert_eq!(tx.to_hex().unwrap(), SIGNED_TRANSFER_HEX);
        assert_eq!(tx.size().unwrap(), 180);
    }

    #[test]
    fn rejects_trailing_bytes_and_bad_hex() {
        let mut hex = SIGNED_TRANSFER_HEX.to_string();
        hex.push_str("00");
        assert!(StacksTransaction::from_hex(&hex).is_err());
        assert!(matches!(
            StacksTransaction::from_hex("0x808"),
            Err(TransactionError::InvalidHex(_))
        ));
        assert!(StacksTransaction::from_hex("0x").is_err());
    }

    #[test]
    fn builder_sets_fee_on_sponsor() {
        let recipient: StacksAddress = "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM".parse().unwrap();
        let tx = TransactionBuilder::new(StacksNetwork::Mainnet)
            .origin(SpendingCondition::new_single_sig_from_hash([1; 20]))
            .sponsor(SpendingCondition::new_single_sig_from_hash([2; 20]))
            .payload(TransactionPayload::token_transfer(
                recipient.into(),
                10,
                TokenTransferMemo::empty(),
            ))
            .nonce(5)
            .fee(999)
            .build()
            .unwrap();

        assert!(tx.is_sponsored());
        assert_eq!(tx.auth.origin().tx_fee(), 0);
        assert_eq!(tx.tx_fee(), 999);
        assert_eq!(tx.nonce(), 5);
        assert_eq!(tx.chain_id, 1);
        assert_eq!(tx.sponsor_address().unwrap().version(), 22);
    }

    #[test]
    fn builder_requires_origin_and_payload() {
        assert!(matches!(
            TransactionBuilder::new(StacksNetwork::Testnet).build(),
            Err(TransactionError::MissingOrigin)
        ));
        assert!(matches!(
            TransactionBuilder::new(StacksNetwork::Testnet)
                .origin(SpendingCondition::initial_sighash())
                .build(),
            Err(TransactionError::MissingPayload)
        ));
    }
}
