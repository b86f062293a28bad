use futures_util::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tokio::time::timeout;
use txadvisor_analysis::normalize;
use txadvisor_core_types::{LifecycleStatus, Snapshot, SnapshotMeta, SnapshotSource};
use txadvisor_rpc::{RpcFailure, RpcFailureKind, RpcSuccess, StarknetRpcClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickCall {
    Transaction,
    Status,
    Receipt,
}

impl TickCall {
    pub(crate) const ALL: [TickCall; 3] = [Self::Transaction, Self::Status, Self::Receipt];

    pub(crate) fn method(self) -> &'static str {
        match self {
            Self::Transaction => "starknet_getTransactionByHash",
            Self::Status => "starknet_getTransactionStatus",
            Self::Receipt => "starknet_getTransactionReceipt",
        }
    }

    fn source(self) -> SnapshotSource {
        match self {
            Self::Transaction | Self::Status => SnapshotSource::Status,
            Self::Receipt => SnapshotSource::Receipt,
        }
    }

    fn decides_termination(self) -> bool {
        matches!(self, Self::Status | Self::Receipt)
    }

    async fn invoke(
        self,
        rpc: &StarknetRpcClient,
        tx_hash: &str,
    ) -> Result<RpcSuccess, RpcFailure> {
        match self {
            Self::Transaction => rpc.get_transaction_by_hash(tx_hash).await,
            Self::Status => rpc.get_transaction_status(tx_hash).await,
            Self::Receipt => rpc.get_transaction_receipt(tx_hash).await,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TickReport {
    pub(crate) snapshots: Vec<Snapshot>,
    pub(crate) terminal: Option<LifecycleStatus>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SnapshotClock {
    last_ms: i64,
}

impl SnapshotClock {
    pub(crate) fn starting_after(last_ms: Option<i64>) -> Self {
        Self {
            last_ms: last_ms.unwrap_or(i64::MIN),
        }
    }

    pub(crate) fn next(&mut self, now_ms: i64) -> i64 {
        let next = now_ms.max(self.last_ms.saturating_add(1));
        self.last_ms = next;
        next
    }
}

pub(crate) async fn poll_once(
    rpc: &StarknetRpcClient,
    tx_hash: &str,
    call_timeout: Duration,
    clock: &mut SnapshotClock,
) -> TickReport {
    let mut pending: FuturesUnordered<_> = TickCall::ALL
        .into_iter()
        .map(|call| async move {
            let outcome = match timeout(call_timeout, call.invoke(rpc, tx_hash)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(RpcFailure::unavailable(format!(
                    "{} timed out after {}ms",
                    call.method(),
                    call_timeout.as_millis()
                ))),
            };
            (call, outcome)
        })
        .collect();

    let mut report = TickReport::default();
    while let Some((call, outcome)) = pending.next().await {
        let timestamp = clock.next(chrono::Utc::now().timestamp_millis());
        let snapshot = snapshot_from_outcome(tx_hash, timestamp, call, outcome);
        if call.decides_termination()
            && snapshot.source != SnapshotSource::Error
            && snapshot.normalized.is_terminal()
        {
            report.terminal.get_or_insert(snapshot.normalized);
        }
        report.snapshots.push(snapshot);
    }
    report
}

fn snapshot_from_outcome(
    tx_hash: &str,
    timestamp: i64,
    call: TickCall,
    outcome: Result<RpcSuccess, RpcFailure>,
) -> Snapshot {
    match outcome {
        Ok(success) => Snapshot {
            tx_hash: tx_hash.to_string(),
            timestamp,
            source: call.source(),
            normalized: normalize(&success.result),
            raw: success.result,
            meta: Some(SnapshotMeta {
                method: Some(call.method().to_string()),
                rpc_url: Some(success.endpoint),
            }),
        },
        Err(failure) => {
            tracing::warn!(
                tx_hash = %tx_hash,
                method = call.method(),
                kind = %failure.kind,
                error = %failure,
                "watch rpc call failed"
            );
            let normalized = match failure.kind {
                RpcFailureKind::TxNotFound => LifecycleStatus::NotFound,
                _ => LifecycleStatus::Unknown,
            };
            Snapshot {
                tx_hash: tx_hash.to_string(),
                timestamp,
                source: SnapshotSource::Error,
                normalized,
                raw: failure.to_descriptor(),
                meta: Some(SnapshotMeta {
                    method: Some(call.method().to_string()),
                    rpc_url: failure.endpoint,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_clock_is_strictly_increasing() {
        let mut clock = SnapshotClock::starting_after(Some(1_000));
        assert_eq!(clock.next(500), 1_001);
        assert_eq!(clock.next(1_001), 1_002);
        assert_eq!(clock.next(5_000), 5_000);
        assert_eq!(clock.next(5_000), 5_001);

        let mut fresh = SnapshotClock::starting_after(None);
        assert_eq!(fresh.next(42), 42);
    }

    #[test]
    fn failures_map_to_error_snapshots() {
        let not_found = snapshot_from_outcome(
            "0xabc",
            1,
            TickCall::Status,
            Err(RpcFailure::not_found("Transaction hash not found")),
        );
        assert_eq!(not_found.source, SnapshotSource::Error);
        assert_eq!(not_found.normalized, LifecycleStatus::NotFound);
        assert_eq!(not_found.raw["error"]["kind"], "TX_NOT_FOUND");

        let unavailable = snapshot_from_outcome(
            "0xabc",
            2,
            TickCall::Receipt,
            Err(RpcFailure::unavailable("RPC 5xx status=502").with_endpoint("https://a.example")),
        );
        assert_eq!(unavailable.normalized, LifecycleStatus::Unknown);
        assert_eq!(
            unavailable.meta.and_then(|meta| meta.rpc_url).as_deref(),
            Some("https://a.example")
        );
    }

    #[test]
    fn successful_calls_keep_source_by_method() {
        let success = RpcSuccess {
            result: serde_json::json!({"finality_status": "ACCEPTED_ON_L1"}),
            endpoint: "https://a.example".to_string(),
        };
        let receipt = snapshot_from_outcome("0xabc", 3, TickCall::Receipt, Ok(success.clone()));
        assert_eq!(receipt.source, SnapshotSource::Receipt);
        assert_eq!(receipt.normalized, LifecycleStatus::AcceptedOnL1);
        let transaction = snapshot_from_outcome("0xabc", 4, TickCall::Transaction, Ok(success));
        assert_eq!(transaction.source, SnapshotSource::Status);
        assert_eq!(
            transaction.meta.and_then(|meta| meta.method).as_deref(),
            Some("starknet_getTransactionByHash")
        );
    }
}
