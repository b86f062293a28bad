use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::failure::{RpcFailure, RpcFailureKind, RpcSuccess};
use crate::http_utils::{classify_request_error, is_not_found_message, redacted_endpoint_label};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_ATTEMPTS_PER_ENDPOINT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcClientSettings {
    pub request_timeout: Duration,
    pub retry_delay: Duration,
    pub attempts_per_endpoint: usize,
}

impl Default for RpcClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            attempts_per_endpoint: DEFAULT_ATTEMPTS_PER_ENDPOINT,
        }
    }
}

enum AttemptOutcome {
    Success(Value),
    Retry(RpcFailure),
    Failover(RpcFailure),
    Final(RpcFailure),
}

pub struct StarknetRpcClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
    settings: RpcClientSettings,
    next_id: AtomicU64,
    last_good: RwLock<Option<String>>,
}

impl StarknetRpcClient {
    pub fn new(endpoints: Vec<String>, settings: RpcClientSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("failed building rpc http client")?;
        Ok(Self {
            http,
            endpoints,
            settings,
            next_id: AtomicU64::new(0),
            last_good: RwLock::new(None),
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Longest a single `call` can take when every endpoint exhausts its attempts.
    pub fn worst_case_call_duration(&self) -> Duration {
        let attempts = self.settings.attempts_per_endpoint.max(1) as u32;
        let endpoints = self.endpoints.len().max(1) as u32;
        (self.settings.request_timeout + self.settings.retry_delay)
            .saturating_mul(attempts)
            .saturating_mul(endpoints)
    }

    pub fn active_endpoint_label(&self) -> Option<String> {
        self.last_good
            .read()
            .ok()
            .and_then(|guard| guard.as_deref().map(redacted_endpoint_label))
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<RpcSuccess, RpcFailure> {
        if self.endpoints.is_empty() {
            return Err(RpcFailure::unavailable("No RPC URLs configured."));
        }

        let mut last_failure: Option<RpcFailure> = None;
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let label = redacted_endpoint_label(endpoint);
            match self.call_endpoint(endpoint, &label, method, &params).await {
                Ok(result) => {
                    self.remember_good(endpoint);
                    return Ok(RpcSuccess {
                        result,
                        endpoint: label,
                    });
                }
                Err(EndpointError::Final(failure)) => return Err(failure),
                Err(EndpointError::Exhausted(failure)) => {
                    if index + 1 < self.endpoints.len() {
                        warn!(
                            method,
                            endpoint = %label,
                            error = %failure,
                            attempt = index + 1,
                            total = self.endpoints.len(),
                            "rpc endpoint failed, trying next endpoint"
                        );
                    }
                    last_failure = Some(failure);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| RpcFailure::unavailable("all rpc endpoints failed")))
    }

    pub async fn call_single(
        &self,
        endpoint: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcFailure> {
        let label = redacted_endpoint_label(endpoint);
        match self.attempt(endpoint, &label, method, &params).await {
            AttemptOutcome::Success(result) => Ok(result),
            AttemptOutcome::Retry(failure)
            | AttemptOutcome::Failover(failure)
            | AttemptOutcome::Final(failure) => Err(failure),
        }
    }

    async fn call_endpoint(
        &self,
        endpoint: &str,
        label: &str,
        method: &str,
        params: &Value,
    ) -> Result<Value, EndpointError> {
        let attempts = self.settings.attempts_per_endpoint.max(1);
        let mut attempt = 1usize;
        loop {
            match self.attempt(endpoint, label, method, params).await {
                AttemptOutcome::Success(result) => return Ok(result),
                AttemptOutcome::Final(failure) => return Err(EndpointError::Final(failure)),
                AttemptOutcome::Failover(failure) => return Err(EndpointError::Exhausted(failure)),
                AttemptOutcome::Retry(failure) => {
                    if attempt >= attempts {
                        return Err(EndpointError::Exhausted(failure));
                    }
                    debug!(
                        method,
                        endpoint = %label,
                        attempt,
                        error = %failure,
                        "retryable rpc failure, retrying same endpoint"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        endpoint: &str,
        label: &str,
        method: &str,
        params: &Value,
    ) -> AttemptOutcome {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = match self.http.post(endpoint).json(&payload).send().await {
            Ok(response) => response,
            Err(error) => {
                return AttemptOutcome::Retry(
                    RpcFailure::unavailable(format!(
                        "Network/timeout failed class={}",
                        classify_request_error(&error)
                    ))
                    .with_endpoint(label)
                    .with_debug(Value::String(error.to_string())),
                );
            }
        };

        let status = response.status();
        if status.is_server_error() {
            return AttemptOutcome::Retry(
                RpcFailure::unavailable(format!("RPC 5xx status={}", status.as_u16()))
                    .with_endpoint(label),
            );
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return AttemptOutcome::Failover(
                RpcFailure::unavailable(format!("RPC HTTP {}", status.as_u16()))
                    .with_endpoint(label)
                    .with_debug(Value::String(body_text)),
            );
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                return AttemptOutcome::Failover(
                    RpcFailure::unavailable("RPC response is not valid JSON")
                        .with_endpoint(label)
                        .with_debug(Value::String(error.to_string())),
                );
            }
        };

        classify_body(body, label)
    }

    fn remember_good(&self, endpoint: &str) {
        if let Ok(mut guard) = self.last_good.write() {
            if guard.as_deref() != Some(endpoint) {
                *guard = Some(endpoint.to_string());
            }
        }
    }

    pub async fn get_transaction_by_hash(&self, tx_hash: &str) -> Result<RpcSuccess, RpcFailure> {
        let tx_hash = felt_param(tx_hash)?;
        self.call("starknet_getTransactionByHash", json!([tx_hash])).await
    }

    pub async fn get_transaction_status(&self, tx_hash: &str) -> Result<RpcSuccess, RpcFailure> {
        let tx_hash = felt_param(tx_hash)?;
        self.call("starknet_getTransactionStatus", json!([tx_hash])).await
    }

    pub async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<RpcSuccess, RpcFailure> {
        let tx_hash = felt_param(tx_hash)?;
        self.call("starknet_getTransactionReceipt", json!([tx_hash])).await
    }

    pub async fn get_class_hash_at(&self, address: &str) -> Result<RpcSuccess, RpcFailure> {
        let address = felt_param(address)?;
        self.call("starknet_getClassHashAt", json!(["latest", address])).await
    }

    pub async fn chain_id(&self) -> Result<RpcSuccess, RpcFailure> {
        self.call("starknet_chainId", json!([])).await
    }

    pub async fn block_number(&self) -> Result<RpcSuccess, RpcFailure> {
        self.call("starknet_blockNumber", json!([])).await
    }

    pub async fn get_block_with_tx_hashes(
        &self,
        block_id: Value,
    ) -> Result<RpcSuccess, RpcFailure> {
        self.call("starknet_getBlockWithTxHashes", json!([block_id])).await
    }
}

// Hashes and addresses are felts: `0x` and at most 64 hex digits.
fn felt_param(value: &str) -> Result<&str, RpcFailure> {
    let valid = value
        .strip_prefix("0x")
        .filter(|digits| (1..=64).contains(&digits.len()))
        .is_some_and(|digits| digits.bytes().all(|byte| byte.is_ascii_hexdigit()));
    if valid {
        Ok(value)
    } else {
        Err(RpcFailure::invalid_request(format!(
            "not a felt parameter: {value}"
        )))
    }
}

enum EndpointError {
    Final(RpcFailure),
    Exhausted(RpcFailure),
}

fn classify_body(body: Value, label: &str) -> AttemptOutcome {
    if let Some(error_payload) = body.get("error").filter(|value| !value.is_null()) {
        let message = error_payload
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or("RPC error")
            .to_string();
        let failure = if is_not_found_message(&message) {
            RpcFailure::not_found(message)
        } else {
            RpcFailure::unavailable(message)
        }
        .with_endpoint(label)
        .with_debug(error_payload.clone());
        return if failure.kind == RpcFailureKind::TxNotFound {
            AttemptOutcome::Final(failure)
        } else {
            AttemptOutcome::Failover(failure)
        };
    }

    match body {
        Value::Object(mut map) if map.contains_key("result") => {
            AttemptOutcome::Success(map.remove("result").unwrap_or(Value::Null))
        }
        other => AttemptOutcome::Failover(
            RpcFailure::unavailable("RPC response has neither result nor error")
                .with_endpoint(label)
                .with_debug(other),
        ),
    }
}
