//! # Stacks Node RPC Client
//!
//! Implements the construction service's collaborator traits over a
//! stacks-node's HTTP RPC:
//!
//! | Trait call               | Node endpoint                              |
//! |--------------------------|--------------------------------------------|
//! | `get_nonce`              | `GET /v2/accounts/{address}?proof=0`       |
//! | `get_recent_block_hash`  | `GET /v2/info` (`stacks_tip`)              |
//! | `get_node_info`          | `GET /v2/info`                             |
//! | `get_pox_info`           | `GET /v2/pox`                              |
//! | `get_fee_rate`           | `GET /v2/fees/transfer`                    |
//! | `broadcast`              | `POST /v2/transactions` (octet-stream)     |
//! | `resolve` (FT metadata)  | `POST /v2/contracts/call-read/...`         |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use stacks_rosetta::backend::{
    CollaboratorError, NodeInfo, NodeRpc, PoxInfo, TokenMetadataResolver, TransactionStore,
};
use stacks_rosetta::clarity::ClarityValue;
use stacks_rosetta::rosetta::Currency;

// ---------------------------------------------------------------------------
// Node response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InfoResponse {
    server_version: String,
    stacks_tip_height: u64,
    stacks_tip: String,
    burn_block_height: u64,
    genesis_chainstate_hash: String,
}

#[derive(Debug, Deserialize)]
struct PoxResponse {
    contract_id: String,
    current_burnchain_block_height: u64,
    reward_cycle_id: u64,
    reward_cycle_length: u64,
    min_amount_ustx: u128,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    nonce: u64,
}

/// Body of a refused `POST /v2/transactions`.
#[derive(Debug, Deserialize)]
struct BroadcastRejection {
    error: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadOnlyResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

fn prefixed(hash: &str) -> String {
    format!("0x{}", hash.trim_start_matches("0x"))
}

/// The node's reason for refusing a transaction, falling back to the raw
/// body when it is not the usual JSON shape.
fn rejection_reason(body: &str) -> String {
    match serde_json::from_str::<BroadcastRejection>(body) {
        Ok(rejection) => rejection.reason.unwrap_or(rejection.error),
        Err(_) => body.trim().to_string(),
    }
}

/// `{address}.{contract}::{token}` into its three parts.
fn split_asset(asset_identifier: &str) -> Option<(&str, &str)> {
    let (contract_id, _token) = asset_identifier.split_once("::")?;
    contract_id.split_once('.')
}

// ---------------------------------------------------------------------------
// StacksNodeClient
// ---------------------------------------------------------------------------

/// HTTP client for one stacks-node.
#[derive(Debug, Clone)]
pub struct StacksNodeClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl StacksNodeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn transport_error(&self, err: reqwest::Error) -> CollaboratorError {
        if err.is_timeout() {
            CollaboratorError::Timeout(self.timeout)
        } else if err.is_decode() {
            CollaboratorError::Malformed(err.to_string())
        } else {
            CollaboratorError::Unavailable(err.to_string())
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CollaboratorError> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        match resp.status() {
            StatusCode::NOT_FOUND => return Err(CollaboratorError::NotFound(path.to_string())),
            status if !status.is_success() => {
                return Err(CollaboratorError::Unavailable(format!("{path} answered {status}")))
            }
            _ => {}
        }
        resp.json().await.map_err(|e| self.transport_error(e))
    }

    async fn info(&self) -> Result<InfoResponse, CollaboratorError> {
        self.get_json("/v2/info").await
    }

    async fn call_read_only(
        &self,
        address: &str,
        contract: &str,
        function: &str,
    ) -> Result<ClarityValue, CollaboratorError> {
        let path = format!("/v2/contracts/call-read/{address}/{contract}/{function}");
        let resp: ReadOnlyResponse = self
            .http
            .post(self.url(&path))
            .json(&json!({ "sender": address, "arguments": [] }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;
        if !resp.okay {
            return Err(CollaboratorError::NotFound(
                resp.cause.unwrap_or_else(|| format!("{contract}.{function} failed")),
            ));
        }
        let hex = resp
            .result
            .ok_or_else(|| CollaboratorError::Malformed(format!("{function}: missing result")))?;
        let value = ClarityValue::from_hex(&hex).map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        // SIP-010 getters answer `(ok value)`.
        match value.as_response() {
            Some(Ok(inner)) => Ok(inner.clone()),
            Some(Err(_)) => Err(CollaboratorError::NotFound(format!("{contract}.{function} returned err"))),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl TransactionStore for StacksNodeClient {
    async fn get_nonce(&self, address: &str) -> Result<u64, CollaboratorError> {
        let account: AccountResponse = self.get_json(&format!("/v2/accounts/{address}?proof=0")).await?;
        Ok(account.nonce)
    }

    async fn get_recent_block_hash(&self) -> Result<String, CollaboratorError> {
        Ok(prefixed(&self.info().await?.stacks_tip))
    }
}

#[async_trait]
impl NodeRpc for StacksNodeClient {
    async fn get_pox_info(&self) -> Result<PoxInfo, CollaboratorError> {
        let pox: PoxResponse = self.get_json("/v2/pox").await?;
        Ok(PoxInfo {
            contract_id: pox.contract_id,
            current_burnchain_block_height: pox.current_burnchain_block_height,
            reward_cycle_id: pox.reward_cycle_id,
            reward_cycle_length: pox.reward_cycle_length,
            min_amount_ustx: pox.min_amount_ustx,
        })
    }

    async fn get_fee_rate(&self) -> Result<u64, CollaboratorError> {
        self.get_json("/v2/fees/transfer").await
    }

    async fn get_node_info(&self) -> Result<NodeInfo, CollaboratorError> {
        let info = self.info().await?;
        Ok(NodeInfo {
            server_version: info.server_version,
            stacks_tip_height: info.stacks_tip_height,
            stacks_tip: prefixed(&info.stacks_tip),
            burn_block_height: info.burn_block_height,
            genesis_chainstate_hash: prefixed(&info.genesis_chainstate_hash),
        })
    }

    async fn broadcast(&self, tx: &[u8]) -> Result<String, CollaboratorError> {
        let resp = self
            .http
            .post(self.url("/v2/transactions"))
            .header("content-type", "application/octet-stream")
            .body(tx.to_vec())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        if status.is_success() {
            let txid: String = serde_json::from_str(&body).unwrap_or_else(|_| body.trim().to_string());
            return Ok(prefixed(&txid));
        }
        if status.is_client_error() {
            return Err(CollaboratorError::Rejected(rejection_reason(&body)));
        }
        Err(CollaboratorError::Unavailable(format!("broadcast answered {status}")))
    }
}

#[async_trait]
impl TokenMetadataResolver for StacksNodeClient {
    async fn resolve(&self, asset_identifier: &str) -> Result<Currency, CollaboratorError> {
        let (address, contract) = split_asset(asset_identifier)
            .ok_or_else(|| CollaboratorError::Malformed(format!("asset identifier '{asset_identifier}'")))?;
        let (symbol, decimals) = tokio::try_join!(
            self.call_read_only(address, contract, "get-symbol"),
            self.call_read_only(address, contract, "get-decimals"),
        )?;
        let symbol = symbol
            .as_text()
            .ok_or_else(|| CollaboratorError::Malformed(format!("get-symbol returned {}", symbol.type_name())))?;
        let decimals = decimals
            .as_uint()
            .and_then(|d| u32::try_from(d).ok())
            .ok_or_else(|| CollaboratorError::Malformed(format!("get-decimals returned {}", decimals.type_name())))?;
        Ok(Currency {
            symbol,
            decimals,
            metadata: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn spawn_node(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fake_node() -> Router {
        Router::new()
            .route(
                "/v2/info",
                get(|| async {
                    Json(json!({
                        "server_version": "stacks-node 2.5.0",
                        "stacks_tip_height": 150000,
                        "stacks_tip": "969bb9ad7a0f8b8e4b5a2c6f6e2d3a1c0b9f8e7d6c5b4a392817161514131211",
                        "burn_block_height": 1000,
                        "genesis_chainstate_hash": "74237aa39aa50a83de11a4f53e9d3bb7d43461d1de9873f402e5453ae60bc59b",
                        "peer_version": 402653189u64
                    }))
                }),
            )
            .route(
                "/v2/pox",
                get(|| async {
                    Json(json!({
                        "contract_id": "ST000000000000000000002AMW42H.pox-4",
                        "current_burnchain_block_height": 1000,
                        "reward_cycle_id": 40,
                        "reward_cycle_length": 1050,
                        "min_amount_ustx": 90000000000u64,
                        "pox_activation_threshold_ustx": 1u64
                    }))
                }),
            )
            .route(
                "/v2/accounts/:address",
                get(|| async { Json(json!({ "balance": "0x00", "locked": "0x00", "nonce": 12 })) }),
            )
            .route("/v2/fees/transfer", get(|| async { Json(json!(3)) }))
            .route(
                "/v2/transactions",
                post(|body: Bytes| async move {
                    if body.first() == Some(&0x80) {
                        (
                            AxumStatus::OK,
                            Json(json!("f3b054a5fbae98f7f35e5e917b65759fc365a3e073f8af1c3b8d211b286fa74a")),
                        )
                    } else {
                        (
                            AxumStatus::BAD_REQUEST,
                            Json(json!({ "error": "transaction rejected", "reason": "BadNonce" })),
                        )
                    }
                }),
            )
            .route(
                "/v2/contracts/call-read/:address/:contract/:function",
                post(
                    |axum::extract::Path((_, _, function)): axum::extract::Path<(String, String, String)>| async move {
                        let value = match function.as_str() {
                            "get-symbol" => ClarityValue::ok(ClarityValue::ascii("USDA")),
                            _ => ClarityValue::ok(ClarityValue::UInt(6)),
                        };
                        Json(json!({ "okay": true, "result": value.to_hex().unwrap() }))
                    },
                ),
            )
    }

    async fn client() -> StacksNodeClient {
        let url = spawn_node(fake_node()).await;
        StacksNodeClient::new(&url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn reads_chain_state() {
        let client = client().await;
        assert_eq!(client.get_nonce("ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM").await.unwrap(), 12);
        assert_eq!(
            client.get_recent_block_hash().await.unwrap(),
            "0x969bb9ad7a0f8b8e4b5a2c6f6e2d3a1c0b9f8e7d6c5b4a392817161514131211"
        );
        assert_eq!(client.get_fee_rate().await.unwrap(), 3);

        let pox = client.get_pox_info().await.unwrap();
        assert_eq!(pox.contract_id, "ST000000000000000000002AMW42H.pox-4");
        assert_eq!(pox.min_amount_ustx, 90_000_000_000);

        let info = client.get_node_info().await.unwrap();
        assert_eq!(info.stacks_tip_height, 150_000);
        assert!(info.genesis_chainstate_hash.starts_with("0x"));
    }

    #[tokio::test]
    async fn broadcast_accepts_and_rejects() {
        let client = client().await;
        let txid = client.broadcast(&[0x80, 0x80]).await.unwrap();
        assert_eq!(txid, "0xf3b054a5fbae98f7f35e5e917b65759fc365a3e073f8af1c3b8d211b286fa74a");

        let err = client.broadcast(&[0x00]).await.unwrap_err();
        assert_eq!(err, CollaboratorError::Rejected("BadNonce".into()));
    }

    #[tokio::test]
    async fn resolves_token_metadata() {
        let client = client().await;
        let currency = client
            .resolve("SP2C2YFP12AJZB4MABJBAJ55XECVS7E4PMMZ89YZR.usda-token::usda")
            .await
            .unwrap();
        assert_eq!(currency.symbol, "USDA");
        assert_eq!(currency.decimals, 6);

        let err = client.resolve("not-an-asset").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_node_is_unavailable() {
        let client = StacksNodeClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.get_node_info().await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable(_) | CollaboratorError::Timeout(_)));
    }

    #[test]
    fn rejection_reason_prefers_reason_field() {
        assert_eq!(
            rejection_reason(r#"{"error":"transaction rejected","reason":"NotEnoughFunds"}"#),
            "NotEnoughFunds"
        );
        assert_eq!(rejection_reason(r#"{"error":"transaction rejected"}"#), "transaction rejected");
        assert_eq!(rejection_reason("plain text\n"), "plain text");
    }
}
