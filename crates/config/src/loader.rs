use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::env_parsing::{env_csv, env_parsed, env_string, parse_env_bool};
use super::{
    resolve_rpc_endpoints, AppConfig, StarknetNetwork, MAX_WATCH_AGE_SECONDS_MIN,
    POLL_INTERVAL_MS_MIN,
};

pub fn load_from_path(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_from_env_or_default(default_path: &Path) -> Result<(AppConfig, PathBuf)> {
    let configured = env::var("TX_ADVISOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_path.to_path_buf());
    let mut config = load_from_path(&configured)?;

    if let Some(value) = env_string("TX_ADVISOR_ENV") {
        config.system.env = value;
    }
    if let Some(value) = env_string("TX_ADVISOR_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Some(log_json) = env::var("TX_ADVISOR_LOG_JSON").ok().and_then(parse_env_bool) {
        config.system.log_json = log_json;
    }
    if let Some(value) = env_parsed::<u64>("TX_ADVISOR_HEARTBEAT_SECONDS") {
        config.system.heartbeat_seconds = value;
    }
    if let Some(value) = env_string("TX_ADVISOR_MIGRATIONS_DIR") {
        config.system.migrations_dir = value;
    }
    if let Some(value) = env_string("TX_ADVISOR_SQLITE_PATH") {
        config.sqlite.path = value;
    }

    if let Some(value) = env_string("TX_ADVISOR_NETWORK") {
        config.rpc.network = value;
    }
    if let Some(urls) = env_csv("TX_ADVISOR_RPC_URLS_MAINNET") {
        config.rpc.mainnet_urls = urls;
    }
    if let Some(urls) = env_csv("TX_ADVISOR_RPC_URLS_SEPOLIA") {
        config.rpc.sepolia_urls = urls;
    }
    if let Some(value) = env_string("TX_ADVISOR_LEGACY_NETWORK") {
        config.rpc.legacy_network = value;
    }
    if let Some(value) = env_string("TX_ADVISOR_RPC_URL") {
        config.rpc.legacy_url = value;
    }
    let legacy_fallbacks: Vec<String> = [
        "TX_ADVISOR_RPC_URL_FALLBACK_1",
        "TX_ADVISOR_RPC_URL_FALLBACK_2",
    ]
    .iter()
    .filter_map(|key| env_string(key))
    .collect();
    if !legacy_fallbacks.is_empty() {
        config.rpc.legacy_fallback_urls = legacy_fallbacks;
    }
    if let Some(value) = env_string("TX_ADVISOR_INFURA_API_KEY") {
        config.rpc.infura_api_key = value;
    }
    if let Some(value) = env_string("TX_ADVISOR_ALCHEMY_API_KEY") {
        config.rpc.alchemy_api_key = value;
    }
    if let Some(include) = env::var("TX_ADVISOR_RPC_INCLUDE_DEFAULT_URLS")
        .ok()
        .and_then(parse_env_bool)
    {
        config.rpc.include_default_urls = include;
    }
    if let Some(value) = env_parsed::<u64>("TX_ADVISOR_RPC_REQUEST_TIMEOUT_MS") {
        config.rpc.request_timeout_ms = value;
    }
    if let Some(value) = env_parsed::<u64>("TX_ADVISOR_RPC_RETRY_DELAY_MS") {
        config.rpc.retry_delay_ms = value;
    }

    if let Some(value) = env_parsed::<u64>("TX_ADVISOR_POLL_INTERVAL_MS") {
        config.watcher.poll_interval_ms = value;
    }
    if let Some(value) = env_parsed::<u64>("TX_ADVISOR_MAX_WATCH_AGE_SECONDS") {
        config.watcher.max_watch_age_seconds = value;
    }
    if let Some(value) = env_parsed::<u64>("TX_ADVISOR_TICK_CALL_TIMEOUT_MS") {
        config.watcher.tick_call_timeout_ms = value;
    }

    if let Some(enabled) = env::var("TX_ADVISOR_WEB_ENABLED").ok().and_then(parse_env_bool) {
        config.web.enabled = enabled;
    }
    if let Some(value) = env_string("TX_ADVISOR_WEB_HOST") {
        config.web.host = value;
    }
    if let Some(value) = env_parsed::<u16>("TX_ADVISOR_WEB_PORT") {
        config.web.port = value;
    }

    validate_config(&config)?;
    Ok((config, configured))
}

pub fn validate_config(config: &AppConfig) -> Result<()> {
    config
        .rpc
        .network
        .parse::<StarknetNetwork>()
        .context("rpc.network is invalid")?;
    if config.rpc.attempts_per_endpoint == 0 {
        return Err(anyhow!("rpc.attempts_per_endpoint must be >= 1"));
    }
    if config.rpc.request_timeout_ms == 0 {
        return Err(anyhow!("rpc.request_timeout_ms must be > 0"));
    }
    if config.watcher.poll_interval_ms < POLL_INTERVAL_MS_MIN {
        return Err(anyhow!(
            "watcher.poll_interval_ms must be >= {} (got {})",
            POLL_INTERVAL_MS_MIN,
            config.watcher.poll_interval_ms
        ));
    }
    if config.watcher.max_watch_age_seconds < MAX_WATCH_AGE_SECONDS_MIN {
        return Err(anyhow!(
            "watcher.max_watch_age_seconds must be >= {}",
            MAX_WATCH_AGE_SECONDS_MIN
        ));
    }
    if config.watcher.tick_call_timeout_ms == 0 {
        return Err(anyhow!("watcher.tick_call_timeout_ms must be > 0"));
    }
    resolve_rpc_endpoints(&config.rpc).context("rpc endpoint configuration is invalid")?;
    Ok(())
}
