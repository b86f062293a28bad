#[cfg(test)]
use std::fs;
#[cfg(test)]
use std::path::{Path, PathBuf};

mod endpoints;
mod env_parsing;
mod loader;
mod schema;

pub use self::endpoints::{
    alchemy_url, default_rpc_urls, infura_url, resolve_rpc_endpoints, StarknetNetwork,
};
pub use self::loader::{load_from_env_or_default, load_from_path, validate_config};
pub use self::schema::{AppConfig, RpcConfig, SqliteConfig, SystemConfig, WatcherConfig, WebConfig};

pub const POLL_INTERVAL_MS_MIN: u64 = 250;
pub const MAX_WATCH_AGE_SECONDS_MIN: u64 = 1;
pub const ENV_PREFIX: &str = "TX_ADVISOR_";
