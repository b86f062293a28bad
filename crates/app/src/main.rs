use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use txadvisor_config::{load_from_env_or_default, resolve_rpc_endpoints, AppConfig};
use txadvisor_rpc::{redacted_endpoint_label, RpcClientSettings, StarknetRpcClient};
use txadvisor_storage::SqliteStore;
use txadvisor_watcher::{SqliteSnapshotSink, WatcherService, WatcherSettings};

mod advisor;
mod telemetry;
mod web;

use crate::advisor::Advisor;
use crate::telemetry::{format_error_chain, log_runtime_summary};
use crate::web::HEARTBEAT_COMPONENT;

const DEFAULT_CONFIG_PATH: &str = "configs/dev.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli_config = parse_config_arg();
    let default_path = cli_config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let (config, loaded_config_path) = load_from_env_or_default(&default_path)?;
    init_tracing(&config.system.log_level, config.system.log_json);
    info!(
        config_path = %loaded_config_path.display(),
        env = %config.system.env,
        network = %config.rpc.network,
        "configuration loaded"
    );

    let sqlite_path = PathBuf::from(&config.sqlite.path);
    let mut store =
        SqliteStore::open(&sqlite_path).context("failed to initialize sqlite store")?;
    let migrations_dir = PathBuf::from(&config.system.migrations_dir);
    let applied = store
        .run_migrations(&migrations_dir)
        .with_context(|| format!("failed to apply migrations in {}", migrations_dir.display()))?;
    info!(applied, "sqlite migrations applied");

    store
        .record_heartbeat(HEARTBEAT_COMPONENT, "startup")
        .context("failed to write startup heartbeat")?;

    let endpoints = resolve_rpc_endpoints(&config.rpc)?;
    let endpoint_labels: Vec<String> = endpoints
        .iter()
        .map(|endpoint| redacted_endpoint_label(endpoint))
        .collect();
    info!(endpoints = ?endpoint_labels, "rpc endpoints resolved");
    let rpc = Arc::new(
        StarknetRpcClient::new(endpoints, rpc_settings(&config))
            .context("failed to initialize rpc client")?,
    );
    let watcher = WatcherService::new(
        Arc::clone(&rpc),
        Arc::new(SqliteSnapshotSink::new(&sqlite_path)),
        watcher_settings(&config),
    );
    let advisor = Arc::new(Advisor::new(
        rpc,
        watcher.clone(),
        &sqlite_path,
        config.rpc.network.clone(),
    ));

    if config.web.enabled {
        let web_advisor = Arc::clone(&advisor);
        let web_config = config.web.clone();
        tokio::spawn(async move {
            if let Err(error) = web::run_server(web_advisor, &web_config).await {
                error!(error = %format_error_chain(&error), "web server stopped");
            }
        });
    } else {
        info!("web server disabled");
    }

    run_app_loop(store, &watcher, config.system.heartbeat_seconds).await
}

fn parse_config_arg() -> Option<PathBuf> {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(inline) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(inline));
        }
    }
    None
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    if json {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .json()
            .compact()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

fn rpc_settings(config: &AppConfig) -> RpcClientSettings {
    RpcClientSettings {
        request_timeout: Duration::from_millis(config.rpc.request_timeout_ms),
        retry_delay: Duration::from_millis(config.rpc.retry_delay_ms),
        attempts_per_endpoint: config.rpc.attempts_per_endpoint.max(1) as usize,
    }
}

fn watcher_settings(config: &AppConfig) -> WatcherSettings {
    WatcherSettings {
        poll_interval: Duration::from_millis(config.watcher.poll_interval_ms),
        max_watch_age: Duration::from_secs(config.watcher.max_watch_age_seconds),
        tick_call_timeout: Duration::from_millis(config.watcher.tick_call_timeout_ms),
    }
}

async fn run_app_loop(
    store: SqliteStore,
    watcher: &WatcherService,
    heartbeat_seconds: u64,
) -> Result<()> {
    let mut interval = time::interval(Duration::from_secs(heartbeat_seconds.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut busy_total = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(error) = store.record_heartbeat(HEARTBEAT_COMPONENT, "alive") {
                    warn!(error = %error, "heartbeat write failed");
                }
                log_runtime_summary(watcher.registrations().len(), &mut busy_total);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    let stopped = watcher.stop_all();
    info!(stopped, "active watches cancelled");
    store
        .record_heartbeat(HEARTBEAT_COMPONENT, "shutdown")
        .context("failed to write shutdown heartbeat")?;
    Ok(())
}

