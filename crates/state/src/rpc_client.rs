//! Thin async JSON-RPC client for Ethereum nodes.
//!
//! Every request is pinned to one block. Transient failures are retried with
//! exponential backoff, and HTTP 429 honors the `Retry-After` header.

use std::time::Duration;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::errors::RpcError;

/// Configuration for RPC client behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-request timeout (default: 30s).
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// TCP connect timeout (default: 10s).
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    /// Maximum retry attempts for transient errors (default: 3).
    pub max_retries: u32,
    /// Base backoff, doubled on every retry (default: 1s).
    #[serde(with = "secs")]
    pub base_backoff: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(d: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

pub struct EthRpcClient {
    http: reqwest::Client,
    url: String,
    block_number: u64,
    config: RpcConfig,
}

impl EthRpcClient {
    pub fn new(url: &str, block_number: u64) -> Self {
        Self::with_config(url, block_number, RpcConfig::default())
    }

    pub fn with_config(url: &str, block_number: u64, config: RpcConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            url: url.to_string(),
            block_number,
            config,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn block_tag(&self) -> String {
        format!("0x{:x}", self.block_number)
    }

    pub async fn eth_get_balance(&self, addr: Address) -> Result<U256, RpcError> {
        let method = "eth_getBalance";
        let result = self
            .rpc_call(method, json!([format!("{addr:#x}"), self.block_tag()]))
            .await?;
        parse_u256(method, &result)
    }

    pub async fn eth_get_code(&self, addr: Address) -> Result<Bytes, RpcError> {
        let method = "eth_getCode";
        let result = self
            .rpc_call(method, json!([format!("{addr:#x}"), self.block_tag()]))
            .await?;
        parse_bytes(method, &result)
    }

    pub async fn eth_get_transaction_count(&self, addr: Address) -> Result<u64, RpcError> {
        let method = "eth_getTransactionCount";
        let result = self
            .rpc_call(method, json!([format!("{addr:#x}"), self.block_tag()]))
            .await?;
        parse_u64(method, &result)
    }

    /// Raw storage word as returned by the node.
    pub async fn eth_get_storage_at(&self, addr: Address, slot: U256) -> Result<Bytes, RpcError> {
        let method = "eth_getStorageAt";
        let result = self
            .rpc_call(
                method,
                json!([format!("{addr:#x}"), format!("{slot:#x}"), self.block_tag()]),
            )
            .await?;
        parse_bytes(method, &result)
    }

    pub async fn eth_get_block_hash(&self, block_number: u64) -> Result<H256, RpcError> {
        let method = "eth_getBlockByNumber";
        let result = self
            .rpc_call(method, json!([format!("0x{block_number:x}"), false]))
            .await?;
        if result.is_null() {
            return Err(RpcError::parse(method, "result", "block not found"));
        }
        let hash = result
            .get("hash")
            .ok_or_else(|| RpcError::parse(method, "hash", "missing"))?;
        parse_h256(method, hash)
    }

    pub async fn eth_chain_id(&self) -> Result<u64, RpcError> {
        let method = "eth_chainId";
        let result = self.rpc_call(method, json!([])).await?;
        parse_u64(method, &result)
    }

    /// Execute a JSON-RPC call with retry and backoff.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut last_error: Option<RpcError> = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let exponential = backoff_delay(self.config.base_backoff, attempt);
                let backoff = last_error
                    .as_ref()
                    .and_then(RpcError::retry_after_secs)
                    .map(Duration::from_secs)
                    .unwrap_or(exponential);
                warn!(method, attempt, ?backoff, "Retrying RPC request");
                tokio::time::sleep(backoff).await;
            }

            match self.rpc_call_once(method, &body).await {
                Ok(val) => return Ok(val),
                Err(err) => {
                    if !err.is_retryable() || attempt + 1 >= max_attempts {
                        if attempt > 0 {
                            return Err(RpcError::RetryExhausted {
                                method: method.into(),
                                attempts: attempt + 1,
                                last_error: Box::new(err),
                            });
                        }
                        return Err(err);
                    }
                    debug!(method, %err, "Transient RPC failure");
                    last_error = Some(err);
                }
            }
        }

        Err(RpcError::RetryExhausted {
            method: method.into(),
            attempts: max_attempts,
            last_error: Box::new(last_error.unwrap_or_else(|| {
                RpcError::parse(method, "response", "no attempt was made")
            })),
        })
    }

    /// Single attempt at an RPC call (no retry).
    async fn rpc_call_once(&self, method: &str, body: &Value) -> Result<Value, RpcError> {
        let response = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout {
                        method: method.into(),
                        elapsed_ms: u64::try_from(self.config.timeout.as_millis())
                            .unwrap_or(u64::MAX),
                    }
                } else {
                    RpcError::ConnectionFailed {
                        url: self.url.clone(),
                        cause: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("retry-after:{v}"));
            let body = match retry_after {
                Some(hint) => hint,
                None => response.text().await.unwrap_or_default(),
            };
            return Err(RpcError::HttpError {
                method: method.into(),
                status: status.as_u16(),
                body,
            });
        }

        let json_response: Value = response
            .json()
            .await
            .map_err(|e| RpcError::parse(method, "response_body", e))?;
        extract_result(method, json_response)
    }
}

/// Split a JSON-RPC envelope into its `result` or its `error`.
/// Exponential delay before retry `attempt` (1-based), saturating at `Duration::MAX`.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        .unwrap_or(Duration::MAX)
}

fn extract_result(method: &str, mut envelope: Value) -> Result<Value, RpcError> {
    if let Some(error) = envelope.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        return Err(RpcError::JsonRpcError {
            method: method.into(),
            code,
            message,
        });
    }
    envelope
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| RpcError::parse(method, "result", "missing result field"))
}

// --- Parsing helpers ---

fn as_hex_str<'a>(method: &str, field: &str, val: &'a Value) -> Result<&'a str, RpcError> {
    val.as_str()
        .ok_or_else(|| RpcError::parse(method, field, "expected hex string"))
}

fn parse_bytes(method: &str, val: &Value) -> Result<Bytes, RpcError> {
    let s = as_hex_str(method, "bytes", val)?;
    ethsim_common::decode_hex(s)
        .map(Bytes::from)
        .map_err(|e| RpcError::parse(method, "bytes", e))
}

fn parse_u64(method: &str, val: &Value) -> Result<u64, RpcError> {
    let s = as_hex_str(method, "u64", val)?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| RpcError::parse(method, "u64", e))
}

fn parse_u256(method: &str, val: &Value) -> Result<U256, RpcError> {
    let s = as_hex_str(method, "U256", val)?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(digits, 16).map_err(|e| RpcError::parse(method, "U256", e))
}

fn parse_h256(method: &str, val: &Value) -> Result<H256, RpcError> {
    let bytes = parse_bytes(method, val)?;
    if bytes.len() != 32 {
        return Err(RpcError::parse(
            method,
            "H256",
            format!("expected 32 bytes, got {}", bytes.len()),
        ));
    }
    Ok(H256::from_slice(&bytes))
}
