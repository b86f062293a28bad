use anyhow::{Context, Result};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use txadvisor_analysis::analyze;
use txadvisor_core_types::{
    AnalysisResult, FeeRecommendation, LifecycleStatus, Snapshot, TimelineEntry,
};
use txadvisor_rpc::{RpcFailureKind, StarknetRpcClient};
use txadvisor_storage::SqliteStore;
use txadvisor_watcher::WatcherService;

pub(crate) const MIN_TX_HASH_HEX_DIGITS: usize = 8;

const INVALID_TX_HASH_MESSAGE: &str =
    "tx_hash must be a 0x-prefixed hex string with at least 8 hex digits.";
const CONTRACT_ADDRESS_MESSAGE: &str =
    "Please enter a transaction hash (0x...), not an account or contract address.";
const NO_SNAPSHOTS_MESSAGE: &str = "No snapshots found for tx hash.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdvisorErrorKind {
    InvalidRequest,
    RpcUnavailable,
    TxNotFound,
    Internal,
}

impl AdvisorErrorKind {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::RpcUnavailable => "RPC_UNAVAILABLE",
            Self::TxNotFound => "TX_NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }

    pub(crate) fn status(self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::RpcUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::TxNotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AdvisorError {
    pub(crate) kind: AdvisorErrorKind,
    pub(crate) message: String,
    pub(crate) detail: Option<String>,
}

impl AdvisorError {
    fn new(kind: AdvisorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(AdvisorErrorKind::InvalidRequest, message)
    }

    pub(crate) fn rpc_unavailable(message: impl Into<String>) -> Self {
        Self::new(AdvisorErrorKind::RpcUnavailable, message)
    }

    pub(crate) fn tx_not_found(message: impl Into<String>) -> Self {
        Self::new(AdvisorErrorKind::TxNotFound, message)
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self {
            kind: AdvisorErrorKind::Internal,
            message: "Unexpected advisor error.".to_string(),
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for AdvisorError {}

pub(crate) fn validate_tx_hash(input: &str) -> Result<String, AdvisorError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| AdvisorError::invalid_request(INVALID_TX_HASH_MESSAGE))?;
    if digits.len() < MIN_TX_HASH_HEX_DIGITS || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(AdvisorError::invalid_request(INVALID_TX_HASH_MESSAGE));
    }
    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct WatchAccepted {
    pub(crate) ok: bool,
    pub(crate) tx_hash: String,
    pub(crate) started: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ExportDocument {
    pub(crate) tx_hash: String,
    pub(crate) generated_at: i64,
    pub(crate) analysis: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) snapshots: Option<Vec<Snapshot>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReportSection {
    pub(crate) export_json: ExportDocument,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TxReport {
    pub(crate) tx_hash: String,
    pub(crate) analysis: AnalysisResult,
    pub(crate) timeline: Vec<TimelineEntry>,
    pub(crate) current_status: LifecycleStatus,
    pub(crate) recommendation: FeeRecommendation,
    pub(crate) watching: bool,
    pub(crate) requested_at_ms: Option<i64>,
    pub(crate) last_seen_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) raw: Option<Vec<Snapshot>>,
    pub(crate) report: ReportSection,
}

pub(crate) struct Advisor {
    rpc: Arc<StarknetRpcClient>,
    watcher: WatcherService,
    sqlite_path: PathBuf,
    network: String,
}

impl Advisor {
    pub(crate) fn new(
        rpc: Arc<StarknetRpcClient>,
        watcher: WatcherService,
        sqlite_path: impl Into<PathBuf>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            rpc,
            watcher,
            sqlite_path: sqlite_path.into(),
            network: network.into(),
        }
    }

    pub(crate) fn rpc(&self) -> &StarknetRpcClient {
        &self.rpc
    }

    pub(crate) fn watcher(&self) -> &WatcherService {
        &self.watcher
    }

    pub(crate) fn network(&self) -> &str {
        &self.network
    }

    pub(crate) fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub(crate) async fn begin_watch(&self, raw_hash: &str) -> Result<WatchAccepted, AdvisorError> {
        let tx_hash = validate_tx_hash(raw_hash)?;

        match self.rpc.get_class_hash_at(&tx_hash).await {
            Ok(_) => {
                info!(tx_hash = %tx_hash, "watch rejected: hash resolves to a deployed class");
                return Err(AdvisorError::invalid_request(CONTRACT_ADDRESS_MESSAGE));
            }
            Err(failure) if failure.kind == RpcFailureKind::RpcUnavailable => {
                warn!(tx_hash = %tx_hash, error = %failure, "class hash lookup failed, rpc unavailable");
                return Err(AdvisorError::rpc_unavailable(failure.message));
            }
            Err(failure) if failure.kind == RpcFailureKind::InvalidRequest => {
                return Err(AdvisorError::invalid_request(INVALID_TX_HASH_MESSAGE));
            }
            Err(_) => {}
        }

        let started = self.watcher.start(&tx_hash);
        Ok(WatchAccepted {
            ok: true,
            tx_hash,
            started,
        })
    }

    pub(crate) fn end_watch(&self, raw_hash: &str) -> Result<bool, AdvisorError> {
        let tx_hash = validate_tx_hash(raw_hash)?;
        Ok(self.watcher.stop(&tx_hash))
    }

    pub(crate) async fn fetch_analysis(
        &self,
        raw_hash: &str,
        include_raw: bool,
    ) -> Result<TxReport, AdvisorError> {
        let tx_hash = validate_tx_hash(raw_hash)?;
        let lookup_hash = tx_hash.clone();
        let (snapshots, request) = read_only_db(self.sqlite_path.clone(), move |store| {
            Ok((
                store.list_snapshots(&lookup_hash)?,
                store.tx_request(&lookup_hash)?,
            ))
        })
        .await?;
        if snapshots.is_empty() {
            return Err(AdvisorError::tx_not_found(NO_SNAPSHOTS_MESSAGE));
        }

        let analysis = analyze(&tx_hash, &snapshots);
        let raw = include_raw.then_some(snapshots);
        let export_json = ExportDocument {
            tx_hash: tx_hash.clone(),
            generated_at: Utc::now().timestamp_millis(),
            analysis: analysis.clone(),
            snapshots: raw.clone(),
        };
        Ok(TxReport {
            watching: self.watcher.is_watching(&tx_hash),
            requested_at_ms: request.as_ref().map(|row| row.created_at_ms),
            last_seen_at_ms: request.as_ref().map(|row| row.last_seen_at_ms),
            timeline: analysis.timeline.clone(),
            current_status: analysis.current_status,
            recommendation: analysis.recommendation.clone(),
            tx_hash,
            analysis,
            raw,
            report: ReportSection { export_json },
        })
    }
}

pub(crate) async fn read_only_db<T, F>(sqlite_path: PathBuf, action: F) -> Result<T, AdvisorError>
where
    T: Send + 'static,
    F: FnOnce(SqliteStore) -> Result<T> + Send + 'static,
{
    let join = tokio::task::spawn_blocking(move || {
        let store = SqliteStore::open_read_only(&sqlite_path).with_context(|| {
            format!("failed opening read-only sqlite: {}", sqlite_path.display())
        })?;
        action(store)
    })
    .await
    .map_err(|error| AdvisorError::internal(format!("sqlite read task failed: {error}")))?;

    join.map_err(|error| AdvisorError::internal(format!("{error:#}")))
}
