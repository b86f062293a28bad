use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub system: SystemConfig,
    pub sqlite: SqliteConfig,
    pub rpc: RpcConfig,
    pub watcher: WatcherConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub env: String,
    pub log_level: String,
    pub log_json: bool,
    pub heartbeat_seconds: u64,
    pub migrations_dir: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            env: "dev".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            heartbeat_seconds: 30,
            migrations_dir: "migrations".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "state/tx_advisor.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub network: String,
    pub mainnet_urls: Vec<String>,
    pub sepolia_urls: Vec<String>,
    pub legacy_network: String,
    pub legacy_url: String,
    pub legacy_fallback_urls: Vec<String>,
    pub infura_api_key: String,
    pub alchemy_api_key: String,
    pub include_default_urls: bool,
    pub request_timeout_ms: u64,
    pub retry_delay_ms: u64,
    pub attempts_per_endpoint: u32,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            network: "sepolia".to_string(),
            mainnet_urls: Vec::new(),
            sepolia_urls: Vec::new(),
            legacy_network: "sepolia".to_string(),
            legacy_url: String::new(),
            legacy_fallback_urls: Vec::new(),
            infura_api_key: String::new(),
            alchemy_api_key: String::new(),
            include_default_urls: true,
            request_timeout_ms: 10_000,
            retry_delay_ms: 300,
            attempts_per_endpoint: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub poll_interval_ms: u64,
    pub max_watch_age_seconds: u64,
    /// Floor for one RPC call inside a poll tick; raised to the client's worst case.
    pub tick_call_timeout_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_watch_age_seconds: 30 * 60,
            tick_call_timeout_ms: 45_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 4000,
        }
    }
}
