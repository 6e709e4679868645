//! SIP-018 signer authorizations for pox-4 `stack-stx`.
//!
//! ```text
//! domain  = (tuple (name "pox-4-signer") (version "1.0.0") (chain-id u<chain>))
//! message = (tuple (pox-addr ..) (reward-cycle u..) (topic "stack-stx")
//!                  (period u..) (auth-id u..) (max-amount u..))
//! hash    = SHA256("SIP018" || SHA256(domain) || SHA256(message))
//! ```
//!
//! The contract recovers the signer key from an RSV signature over
//! `hash`, so that is the layout produced here.

use crate::clarity::ClarityValue;
use crate::codec::StacksMessageCodec;
use crate::config::{
    StacksNetwork, POX_4_SIGNER_DOMAIN_NAME, POX_4_SIGNER_DOMAIN_VERSION, POX_4_TOPIC_STACK_STX,
    SIP018_PREFIX,
};
use crate::crypto::hash::sha256;
use crate::crypto::signatures::{sign_digest_rsv, verify_digest};
use crate::crypto::{Secp256k1PrivateKey, Secp256k1PublicKey};

use super::{PoxAddress, PoxError};

/// The fields a signer authorizes for one stacking call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerKeyMessage {
    pub pox_addr: PoxAddress,
    pub reward_cycle: u128,
    pub topic: String,
    pub period: u128,
    pub auth_id: u128,
    pub max_amount: u128,
}

impl SignerKeyMessage {
    /// A `stack-stx` authorization.
    pub fn stack_stx(
        pox_addr: PoxAddress,
        reward_cycle: u128,
        period: u128,
        auth_id: u128,
        max_amount: u128,
    ) -> Self {
        Self {
            pox_addr,
            reward_cycle,
            topic: POX_4_TOPIC_STACK_STX.to_string(),
            period,
            auth_id,
            max_amount,
        }
    }

    pub fn to_clarity(&self) -> ClarityValue {
        ClarityValue::tuple([
            ("pox-addr", self.pox_addr.to_clarity()),
            ("reward-cycle", ClarityValue::UInt(self.reward_cycle)),
            ("topic", ClarityValue::ascii(&self.topic)),
            ("period", ClarityValue::UInt(self.period)),
            ("auth-id", ClarityValue::UInt(self.auth_id)),
            ("max-amount", ClarityValue::UInt(self.max_amount)),
        ])
    }
}

pub fn signer_domain(network: StacksNetwork) -> ClarityValue {
    ClarityValue::tuple([
        ("name", ClarityValue::ascii(POX_4_SIGNER_DOMAIN_NAME)),
        ("version", ClarityValue::ascii(POX_4_SIGNER_DOMAIN_VERSION)),
        ("chain-id", ClarityValue::UInt(u128::from(network.chain_id()))),
    ])
}

fn value_hash(value: &ClarityValue) -> Result<[u8; 32], PoxError> {
    let bytes = value
        .serialize_to_vec()
        .map_err(|e| PoxError::InvalidValue(e.to_string()))?;
    Ok(sha256(&bytes))
}

/// SIP-018 structured data hash of `message` under `domain`.
pub fn structured_data_hash(domain: &ClarityValue, message: &ClarityValue) -> Result<[u8; 32], PoxError> {
    let mut preimage = Vec::with_capacity(SIP018_PREFIX.len() + 64);
    preimage.extend_from_slice(SIP018_PREFIX);
    preimage.extend_from_slice(&value_hash(domain)?);
    preimage.extend_from_slice(&value_hash(message)?);
    Ok(sha256(&preimage))
}

pub fn signer_message_hash(network: StacksNetwork, message: &SignerKeyMessage) -> Result<[u8; 32], PoxError> {
    structured_data_hash(&signer_domain(network), &message.to_clarity())
}

/// Signs `message` with the signer's key, returning RSV.
pub fn sign_signer_message(
    network: StacksNetwork,
    message: &SignerKeyMessage,
    key: &Secp256k1PrivateKey,
) -> Result<[u8; 65], PoxError> {
    let digest = signer_message_hash(network, message)?;
    Ok(sign_digest_rsv(key, &digest)?)
}

pub fn verify_signer_signature(
    network: StacksNetwork,
    message: &SignerKeyMessage,
    signer_key: &Secp256k1PublicKey,
    signature: &[u8; 65],
) -> Result<bool, PoxError> {
    let digest = signer_message_hash(network, message)?;
    Ok(verify_digest(&digest, signer_key, &signature[..64])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pox::POX_ADDRESS_P2PKH;

    fn message() -> SignerKeyMessage {
        let pox_addr = PoxAddress::new(
            POX_ADDRESS_P2PKH,
            hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap(),
        )
        .unwrap();
        SignerKeyMessage::stack_stx(pox_addr, 10, 6, 1, 1_000_000_000_000)
    }

    #[test]
    fn testnet_domain_hash() {
        let hash = value_hash(&signer_domain(StacksNetwork::Testnet)).unwrap();
        assert_eq!(
            hex::encode(hash),
            "a95df00e63898fd334ff3c42dadafba323692b272a7b52952ceeb77c3191d739"
        );
    }

    #[test]
    fn stack_stx_message_hash() {
        assert_eq!(
            hex::encode(value_hash(&message().to_clarity()).unwrap()),
            "da857d2a777d682091eb9690d5dc2ee91d44c46891965708a8ffc2fe15a6ac0d"
        );
        assert_eq!(
            hex::encode(signer_message_hash(StacksNetwork::Testnet, &message()).unwrap()),
            "0be26b1d7b4f6d3b5e9519f5c22cdffd795dda9488253d4adecf29258c4035a3"
        );
    }

    #[test]
    fn sign_and_verify_authorization() {
        let key = Secp256k1PrivateKey::random();
        let sig = sign_signer_message(StacksNetwork::Testnet, &message(), &key).unwrap();
        assert!(verify_signer_signature(StacksNetwork::Testnet, &message(), &key.public_key(), &sig).unwrap());
        // Same message on another chain id does not verify.
        assert!(!verify_signer_signature(StacksNetwork::Mainnet, &message(), &key.public_key(), &sig).unwrap());
    }
}
