use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Bytes, U256};
use forksync_core::TxHash;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{ChainError, ChainResult};
use crate::limiter::RateLimiter;

/// Minimal JSON-RPC 2.0 client over HTTP.
#[derive(Clone, Debug)]
pub struct JsonRpcClient {
    http: Client,
    url: String,
    limiter: Option<RateLimiter>,
    next_id: Arc<AtomicU64>,
}

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            limiter: None,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Issue a call and decode its `result`. A populated `error` member is
    /// returned as [`ChainError::Rpc`] even when the HTTP status is 200.
    pub async fn request<P, R>(&self, method: &str, params: P) -> ChainResult<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(
            method,
            status = %status,
            body = %truncate(&body, 512),
            "json-rpc response"
        );
        match serde_json::from_str::<RpcResponse>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(ChainError::Transport(format!(
                "{method} responded with status {status}: {}",
                truncate(&body, 256)
            ))),
            Err(err) => Err(ChainError::Decode(format!(
                "failed to parse {method} response: {err} (body snippet: {})",
                truncate(&body, 256)
            ))),
        }
    }

    /// Poll for a receipt until the transaction is mined or the policy is exhausted.
    pub async fn wait_for_receipt(
        &self,
        hash: TxHash,
        policy: &ReceiptPolicy,
    ) -> ChainResult<TxReceipt> {
        for _ in 0..policy.max_polls {
            let receipt: Option<RawReceipt> = self
                .request("eth_getTransactionReceipt", [hash.to_string()])
                .await?;
            if let Some(receipt) = receipt {
                let success = parse_u64(&receipt.status)? == 1;
                if !success {
                    return Err(ChainError::Reverted(hash));
                }
                return Ok(TxReceipt {
                    hash,
                    block_number: receipt.block_number.as_deref().map(parse_u64).transpose()?,
                });
            }
            tokio::time::sleep(policy.poll_interval).await;
        }
        Err(ChainError::ReceiptTimeout {
            hash,
            polls: policy.max_polls,
        })
    }
}

impl RpcResponse {
    fn into_result<R: DeserializeOwned>(self) -> ChainResult<R> {
        if let Some(error) = self.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let value = self.result.unwrap_or(JsonValue::Null);
        serde_json::from_value(value).map_err(|err| ChainError::Decode(err.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    #[serde(default = "default_status")]
    status: String,
    #[serde(default)]
    block_number: Option<String>,
}

fn default_status() -> String {
    "0x1".into()
}

/// Mined transaction that did not revert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block_number: Option<u64>,
}

/// How long to wait for a submitted transaction to be mined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiptPolicy {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_polls: 120,
        }
    }
}

pub(crate) fn parse_u64(value: &str) -> ChainResult<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|err| ChainError::Decode(format!("invalid quantity {value}: {err}")))
}

pub(crate) fn parse_u128(value: &str) -> ChainResult<u128> {
    u128::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|err| ChainError::Decode(format!("invalid quantity {value}: {err}")))
}

pub(crate) fn parse_u256(value: &str) -> ChainResult<U256> {
    U256::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|err| ChainError::Decode(format!("invalid quantity {value}: {err}")))
}

pub(crate) fn parse_bytes(value: &str) -> ChainResult<Bytes> {
    Bytes::from_str(value)
        .map_err(|err| ChainError::Decode(format!("invalid data {value}: {err}")))
}

pub(crate) fn parse_hash(value: &str) -> ChainResult<TxHash> {
    TxHash::from_str(value)
        .map_err(|err| ChainError::Decode(format!("invalid hash {value}: {err}")))
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn fast_policy(max_polls: u32) -> ReceiptPolicy {
        ReceiptPolicy {
            poll_interval: Duration::from_millis(1),
            max_polls,
        }
    }

    async fn receipt_server(result: JsonValue) -> MockServer {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .body_contains("\"method\":\"eth_getTransactionReceipt\"");
                then.status(200)
                    .json_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }));
            })
            .await;
        server
    }

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_u64("0x1").unwrap(), 1);
        assert_eq!(parse_u128("0x3b9aca00").unwrap(), 1_000_000_000);
        assert_eq!(parse_u256("0x0").unwrap(), U256::ZERO);
        assert!(parse_u64("0xzz").is_err());
    }

    #[test]
    fn error_member_wins_over_result() {
        let envelope: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"faucet drained"}}"#,
        )
        .unwrap();
        let outcome: ChainResult<JsonValue> = envelope.into_result();
        assert_eq!(
            outcome,
            Err(ChainError::Rpc {
                code: -32000,
                message: "faucet drained".into()
            })
        );
    }

    #[test]
    fn null_result_decodes_as_none() {
        let envelope: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"result":null}"#).unwrap();
        let receipt: Option<String> = envelope.into_result().unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[tokio::test]
    async fn mined_receipt_carries_block_number() {
        let server = receipt_server(json!({ "status": "0x1", "blockNumber": "0x10" })).await;
        let client = JsonRpcClient::new(server.url("/"));
        let hash = TxHash::repeat_byte(0x11);
        let receipt = client.wait_for_receipt(hash, &fast_policy(3)).await;
        assert_eq!(
            receipt,
            Ok(TxReceipt {
                hash,
                block_number: Some(16)
            })
        );
    }

    #[tokio::test]
    async fn zero_status_receipt_is_a_revert() {
        let server = receipt_server(json!({ "status": "0x0", "blockNumber": "0x10" })).await;
        let client = JsonRpcClient::new(server.url("/"));
        let hash = TxHash::repeat_byte(0x22);
        let outcome = client.wait_for_receipt(hash, &fast_policy(3)).await;
        assert_eq!(outcome, Err(ChainError::Reverted(hash)));
    }

    #[tokio::test]
    async fn pending_receipt_times_out_after_max_polls() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .body_contains("\"method\":\"eth_getTransactionReceipt\"");
                then.status(200)
                    .json_body(json!({ "jsonrpc": "2.0", "id": 1, "result": null }));
            })
            .await;
        let client = JsonRpcClient::new(server.url("/"));
        let hash = TxHash::repeat_byte(0x33);
        let outcome = client.wait_for_receipt(hash, &fast_policy(3)).await;
        assert_eq!(outcome, Err(ChainError::ReceiptTimeout { hash, polls: 3 }));
        assert_eq!(mock.hits_async().await, 3);
    }

    #[tokio::test]
    async fn non_json_error_status_is_a_transport_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(502).body("bad gateway");
            })
            .await;
        let client = JsonRpcClient::new(server.url("/"));
        let outcome: ChainResult<JsonValue> = client.request("eth_chainId", json!([])).await;
        assert!(matches!(
            outcome,
            Err(ChainError::Transport(message)) if message.contains("502")
        ));
    }
}
