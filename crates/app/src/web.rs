use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use txadvisor_config::WebConfig;
use txadvisor_core_types::WatchRegistration;
use txadvisor_rpc::{inspect_endpoints, redacted_endpoint_label, EndpointHealth};

use crate::advisor::{read_only_db, Advisor, AdvisorError, TxReport, WatchAccepted};

pub(crate) const SERVICE_NAME: &str = "tx-advisor";
pub(crate) const HEARTBEAT_COMPONENT: &str = SERVICE_NAME;

pub(crate) type SharedAdvisor = Arc<Advisor>;

pub(crate) async fn run_server(advisor: SharedAdvisor, web_config: &WebConfig) -> Result<()> {
    let app = build_router(advisor);
    let bind = format!("{}:{}", web_config.host, web_config.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind web server on {}", bind))?;
    info!(bind = %bind, "web server started");
    axum::serve(listener, app)
        .await
        .context("axum web server failed")?;
    Ok(())
}

pub(crate) fn build_router(advisor: SharedAdvisor) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);
    Router::new()
        .route("/health", get(health))
        .route("/rpc/info", get(rpc_info))
        .route("/rpc/check", get(rpc_check))
        .route("/watch", post(watch))
        .route("/watch/:tx_hash", delete(unwatch))
        .route("/watches", get(watches))
        .route("/tx/:tx_hash", get(tx_report))
        .layer(cors)
        .with_state(advisor)
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<AdvisorError> for ApiError {
    fn from(err: AdvisorError) -> Self {
        if let Some(detail) = err.detail.as_deref() {
            error!(code = err.kind.code(), detail, "request failed");
        }
        Self {
            status: err.kind.status(),
            code: err.kind.code(),
            message: err.message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error": {
                    "code": self.code,
                    "message": self.message,
                },
            })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct WatchRequest {
    #[serde(default, alias = "txHash")]
    tx_hash: String,
}

#[derive(Debug, Deserialize, Default)]
struct TxQuery {
    include_raw: Option<String>,
}

impl TxQuery {
    fn wants_raw(&self) -> bool {
        matches!(
            self.include_raw.as_deref().map(str::trim),
            Some("1") | Some("true") | Some("yes")
        )
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    sqlite_file: String,
    network: String,
    active_watches: usize,
    last_heartbeat: Option<HeartbeatView>,
}

#[derive(Debug, Serialize)]
struct HeartbeatView {
    ts: String,
    status: String,
}

#[derive(Debug, Serialize)]
struct RpcInfoResponse {
    active_rpc_url: Option<String>,
    network: String,
    configured_rpc_urls: usize,
    fallbacks_configured: bool,
}

#[derive(Debug, Serialize)]
struct RpcCheckResponse {
    network: String,
    configured_rpc_urls: usize,
    checks: Vec<EndpointHealth>,
}

#[derive(Debug, Serialize)]
struct UnwatchResponse {
    ok: bool,
    tx_hash: String,
    stopped: bool,
}

#[derive(Debug, Serialize)]
struct WatchesResponse {
    watches: Vec<WatchRegistration>,
}

async fn health(State(advisor): State<SharedAdvisor>) -> Json<HealthResponse> {
    let sqlite_file = advisor
        .sqlite_path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let last_heartbeat = match read_only_db(advisor.sqlite_path().to_path_buf(), |store| {
        store.last_heartbeat(HEARTBEAT_COMPONENT)
    })
    .await
    {
        Ok(row) => row.map(|(ts, status)| HeartbeatView { ts, status }),
        Err(error) => {
            warn!(error = %error, detail = ?error.detail, "health: heartbeat read failed");
            None
        }
    };
    Json(HealthResponse {
        ok: true,
        service: SERVICE_NAME,
        sqlite_file,
        network: advisor.network().to_string(),
        active_watches: advisor.watcher().registrations().len(),
        last_heartbeat,
    })
}

async fn rpc_info(State(advisor): State<SharedAdvisor>) -> Json<RpcInfoResponse> {
    let endpoints = advisor.rpc().endpoints();
    let active_rpc_url = advisor
        .rpc()
        .active_endpoint_label()
        .or_else(|| endpoints.first().map(|endpoint| redacted_endpoint_label(endpoint)));
    Json(RpcInfoResponse {
        active_rpc_url,
        network: advisor.network().to_string(),
        configured_rpc_urls: endpoints.len(),
        fallbacks_configured: endpoints.len() > 1,
    })
}

async fn rpc_check(State(advisor): State<SharedAdvisor>) -> Json<RpcCheckResponse> {
    let checks = inspect_endpoints(advisor.rpc()).await;
    Json(RpcCheckResponse {
        network: advisor.network().to_string(),
        configured_rpc_urls: advisor.rpc().endpoints().len(),
        checks,
    })
}

async fn watch(
    State(advisor): State<SharedAdvisor>,
    payload: Result<Json<WatchRequest>, JsonRejection>,
) -> Result<Json<WatchAccepted>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        AdvisorError::invalid_request(format!("invalid request body: {}", rejection.body_text()))
    })?;
    let accepted = advisor.begin_watch(&request.tx_hash).await?;
    Ok(Json(accepted))
}

async fn unwatch(
    State(advisor): State<SharedAdvisor>,
    Path(tx_hash): Path<String>,
) -> Result<Json<UnwatchResponse>, ApiError> {
    let stopped = advisor.end_watch(&tx_hash)?;
    Ok(Json(UnwatchResponse {
        ok: true,
        tx_hash: tx_hash.trim().to_ascii_lowercase(),
        stopped,
    }))
}

async fn watches(State(advisor): State<SharedAdvisor>) -> Json<WatchesResponse> {
    Json(WatchesResponse {
        watches: advisor.watcher().registrations(),
    })
}

async fn tx_report(
    State(advisor): State<SharedAdvisor>,
    Path(tx_hash): Path<String>,
    Query(query): Query<TxQuery>,
) -> Result<Json<TxReport>, ApiError> {
    let report = advisor.fetch_analysis(&tx_hash, query.wants_raw()).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::{Read, Write};
    use std::net::{TcpListener as StdTcpListener, TcpStream};
    use std::path::Path as FsPath;
    use std::thread;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use txadvisor_core_types::{LifecycleStatus, Snapshot, SnapshotSource};
    use txadvisor_rpc::{RpcClientSettings, StarknetRpcClient};
    use txadvisor_storage::SqliteStore;
    use txadvisor_watcher::{SqliteSnapshotSink, WatcherService, WatcherSettings};

    const TX_HASH: &str = "0x05c4b3a29180706f5e4d3c2b1a0f9e8d";

    fn migrated_db(temp: &TempDir) -> std::path::PathBuf {
        let db_path = temp.path().join("advisor.db");
        let migration_dir = FsPath::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
        let mut store = SqliteStore::open(&db_path).expect("open sqlite");
        store
            .run_migrations(&migration_dir)
            .expect("apply migrations");
        db_path
    }

    fn dead_endpoint() -> String {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind dead listener");
        let addr = listener.local_addr().expect("dead listener addr");
        drop(listener);
        format!("http://{addr}/rpc")
    }

    fn drain_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = match stream.read(&mut chunk) {
                Ok(0) | Err(_) => return,
                Ok(read) => read,
            };
            buf.extend_from_slice(&chunk[..read]);
            let Some(header_end) = buf.windows(4).position(|window| window == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }

    fn spawn_fixed_upstream(body: Value) -> String {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind upstream");
        let addr = listener.local_addr().expect("upstream addr");
        let body = body.to_string();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    return;
                };
                drain_request(&mut stream);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });
        format!("http://{addr}/rpc")
    }

    fn advisor(endpoints: Vec<String>, db_path: &FsPath) -> SharedAdvisor {
        let rpc = Arc::new(
            StarknetRpcClient::new(
                endpoints,
                RpcClientSettings {
                    request_timeout: Duration::from_secs(2),
                    retry_delay: Duration::from_millis(10),
                    attempts_per_endpoint: 2,
                },
            )
            .expect("build rpc client"),
        );
        let watcher = WatcherService::new(
            Arc::clone(&rpc),
            Arc::new(SqliteSnapshotSink::new(db_path)),
            WatcherSettings {
                poll_interval: Duration::from_secs(60),
                ..WatcherSettings::default()
            },
        );
        Arc::new(Advisor::new(rpc, watcher, db_path, "sepolia"))
    }

    async fn serve(advisor: SharedAdvisor) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind web listener");
        let addr = listener.local_addr().expect("web addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, build_router(advisor)).await;
        });
        format!("http://{addr}")
    }

    async fn get_json(url: &str) -> (u16, Value) {
        let response = reqwest::get(url).await.expect("http get");
        let status = response.status().as_u16();
        (status, response.json().await.expect("json body"))
    }

    async fn post_watch(base: &str, body: Value) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(format!("{base}/watch"))
            .json(&body)
            .send()
            .await
            .expect("http post");
        let status = response.status().as_u16();
        (status, response.json().await.expect("json body"))
    }

    fn seed(db_path: &FsPath, snapshots: &[(i64, SnapshotSource, LifecycleStatus, Value)]) {
        let store = SqliteStore::open(db_path).expect("open sqlite");
        for (timestamp, source, normalized, raw) in snapshots {
            store
                .insert_snapshot(&Snapshot {
                    tx_hash: TX_HASH.to_string(),
                    timestamp: *timestamp,
                    source: *source,
                    normalized: *normalized,
                    raw: raw.clone(),
                    meta: None,
                })
                .expect("insert snapshot");
        }
    }

    #[tokio::test]
    async fn watch_rejects_malformed_hash_without_calling_rpc() {
        let temp = tempdir().expect("tempdir");
        let db_path = migrated_db(&temp);
        let base = serve(advisor(vec![dead_endpoint()], &db_path)).await;

        let oversized = format!("0x{}", "a".repeat(65));
        for body in [
            json!({"tx_hash": "0x1234"}),
            json!({"tx_hash": "abcdef0123"}),
            json!({"tx_hash": oversized}),
            json!({}),
        ] {
            let (status, payload) = post_watch(&base, body).await;
            assert_eq!(status, 400);
            assert_eq!(payload["error"]["code"], "INVALID_REQUEST");
        }
    }

    #[tokio::test]
    async fn watch_rejects_contract_addresses() {
        let temp = tempdir().expect("tempdir");
        let db_path = migrated_db(&temp);
        let upstream = spawn_fixed_upstream(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1"}));
        let base = serve(advisor(vec![upstream], &db_path)).await;

        let (status, payload) = post_watch(&base, json!({"tx_hash": TX_HASH})).await;
        assert_eq!(status, 400);
        assert_eq!(payload["error"]["code"], "INVALID_REQUEST");
        assert_eq!(
            payload["error"]["message"],
            "Please enter a transaction hash (0x...), not an account or contract address."
        );
    }

    #[tokio::test]
    async fn watch_maps_unreachable_rpc_to_service_unavailable() {
        let temp = tempdir().expect("tempdir");
        let db_path = migrated_db(&temp);
        let base = serve(advisor(vec![dead_endpoint()], &db_path)).await;

        let (status, payload) = post_watch(&base, json!({"tx_hash": TX_HASH})).await;
        assert_eq!(status, 503);
        assert_eq!(payload["error"]["code"], "RPC_UNAVAILABLE");
    }

    #[tokio::test]
    async fn watch_starts_once_and_can_be_stopped() {
        let temp = tempdir().expect("tempdir");
        let db_path = migrated_db(&temp);
        let upstream = spawn_fixed_upstream(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 20, "message": "Contract not found"}
        }));
        let base = serve(advisor(vec![upstream], &db_path)).await;

        let upper = TX_HASH.to_ascii_uppercase().replacen("0X", "0x", 1);
        let (status, payload) = post_watch(&base, json!({"txHash": upper})).await;
        assert_eq!(status, 200);
        assert_eq!(payload["ok"], true);
        assert_eq!(payload["tx_hash"], TX_HASH);
        assert_eq!(payload["started"], true);

        let (_, payload) = post_watch(&base, json!({"tx_hash": TX_HASH})).await;
        assert_eq!(payload["started"], false);

        let (status, listing) = get_json(&format!("{base}/watches")).await;
        assert_eq!(status, 200);
        assert_eq!(listing["watches"][0]["tx_hash"], TX_HASH);

        let response = reqwest::Client::new()
            .delete(format!("{base}/watch/{TX_HASH}"))
            .send()
            .await
            .expect("http delete");
        assert_eq!(response.status().as_u16(), 200);
        let payload: Value = response.json().await.expect("json body");
        assert_eq!(payload["stopped"], true);
    }

    #[tokio::test]
    async fn tx_report_returns_404_when_nothing_was_recorded() {
        let temp = tempdir().expect("tempdir");
        let db_path = migrated_db(&temp);
        let base = serve(advisor(vec![dead_endpoint()], &db_path)).await;

        let (status, payload) = get_json(&format!("{base}/tx/{TX_HASH}")).await;
        assert_eq!(status, 404);
        assert_eq!(payload["error"]["code"], "TX_NOT_FOUND");

        let (status, payload) = get_json(&format!("{base}/tx/not-a-hash")).await;
        assert_eq!(status, 400);
        assert_eq!(payload["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn tx_report_includes_analysis_and_optional_raw_snapshots() {
        let temp = tempdir().expect("tempdir");
        let db_path = migrated_db(&temp);
        seed(
            &db_path,
            &[
                (
                    10,
                    SnapshotSource::Status,
                    LifecycleStatus::Received,
                    json!({"finality_status": "RECEIVED"}),
                ),
                (
                    20,
                    SnapshotSource::Receipt,
                    LifecycleStatus::AcceptedOnL2,
                    json!({"finality_status": "ACCEPTED_ON_L2", "execution_status": "SUCCEEDED"}),
                ),
            ],
        );
        let base = serve(advisor(vec![dead_endpoint()], &db_path)).await;

        let (status, payload) = get_json(&format!("{base}/tx/{TX_HASH}")).await;
        assert_eq!(status, 200);
        assert_eq!(payload["tx_hash"], TX_HASH);
        assert_eq!(payload["current_status"], "ACCEPTED_ON_L2");
        assert_eq!(payload["timeline"].as_array().map(Vec::len), Some(2));
        assert!(payload.get("raw").is_none());
        assert!(payload["report"]["export_json"].get("snapshots").is_none());
        assert!(payload["requested_at_ms"].is_null());

        let store = SqliteStore::open(&db_path).expect("open sqlite");
        store.upsert_tx_request(TX_HASH, 1_000).expect("upsert request");
        store.touch_tx_request(TX_HASH, 4_000).expect("touch request");
        drop(store);

        let (status, payload) = get_json(&format!("{base}/tx/{TX_HASH}?include_raw=1")).await;
        assert_eq!(status, 200);
        assert_eq!(payload["raw"].as_array().map(Vec::len), Some(2));
        assert_eq!(payload["requested_at_ms"], 1_000);
        assert_eq!(payload["last_seen_at_ms"], 4_000);
        assert_eq!(
            payload["report"]["export_json"]["snapshots"]
                .as_array()
                .map(Vec::len),
            Some(2)
        );
        assert_eq!(payload["report"]["export_json"]["tx_hash"], TX_HASH);
    }

    #[tokio::test]
    async fn health_and_rpc_info_describe_configuration() {
        let temp = tempdir().expect("tempdir");
        let db_path = migrated_db(&temp);
        let endpoint = dead_endpoint();
        let base = serve(advisor(vec![endpoint.clone()], &db_path)).await;

        let (status, payload) = get_json(&format!("{base}/health")).await;
        assert_eq!(status, 200);
        assert_eq!(payload["ok"], true);
        assert_eq!(payload["service"], SERVICE_NAME);
        assert_eq!(payload["sqlite_file"], "advisor.db");
        assert!(payload["last_heartbeat"].is_null());

        let store = SqliteStore::open(&db_path).expect("open sqlite");
        store
            .record_heartbeat(HEARTBEAT_COMPONENT, "alive")
            .expect("record heartbeat");
        drop(store);
        let (_, payload) = get_json(&format!("{base}/health")).await;
        assert_eq!(payload["last_heartbeat"]["status"], "alive");
        assert!(payload["last_heartbeat"]["ts"].is_string());

        let (status, payload) = get_json(&format!("{base}/rpc/info")).await;
        assert_eq!(status, 200);
        assert_eq!(payload["network"], "sepolia");
        assert_eq!(payload["configured_rpc_urls"], 1);
        assert_eq!(payload["fallbacks_configured"], false);
        assert_eq!(payload["active_rpc_url"], redacted_endpoint_label(&endpoint));

        let (status, payload) = get_json(&format!("{base}/rpc/check")).await;
        assert_eq!(status, 200);
        assert_eq!(payload["checks"][0]["ok"], false);
    }
}
