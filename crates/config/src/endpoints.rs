use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::RpcConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarknetNetwork {
    Mainnet,
    Sepolia,
}

impl StarknetNetwork {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Sepolia => "sepolia",
        }
    }
}

impl fmt::Display for StarknetNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StarknetNetwork {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "sepolia" => Ok(Self::Sepolia),
            other => Err(anyhow!(
                "unsupported starknet network={} (expected mainnet or sepolia)",
                other
            )),
        }
    }
}

pub fn default_rpc_urls(network: StarknetNetwork) -> [&'static str; 2] {
    match network {
        StarknetNetwork::Mainnet => [
            "https://starknet-mainnet.public.blastapi.io/rpc/v0_7",
            "https://starknet-mainnet.g.alchemy.com/starknet/version/rpc/v0_7/docs-demo",
        ],
        StarknetNetwork::Sepolia => [
            "https://starknet-sepolia.public.blastapi.io/rpc/v0_7",
            "https://starknet-sepolia.g.alchemy.com/starknet/version/rpc/v0_7/docs-demo",
        ],
    }
}

pub fn infura_url(network: StarknetNetwork, api_key: &str) -> String {
    format!("https://starknet-{}.infura.io/v3/{}", network, api_key.trim())
}

pub fn alchemy_url(network: StarknetNetwork, api_key: &str) -> String {
    format!(
        "https://starknet-{}.g.alchemy.com/starknet/version/rpc/v0_7/{}",
        network,
        api_key.trim()
    )
}

pub fn resolve_rpc_endpoints(config: &RpcConfig) -> Result<Vec<String>> {
    let network: StarknetNetwork = config.network.parse()?;

    let scoped = match network {
        StarknetNetwork::Mainnet => &config.mainnet_urls,
        StarknetNetwork::Sepolia => &config.sepolia_urls,
    };
    let mut candidates: Vec<String> = scoped.clone();

    let legacy_network = config
        .legacy_network
        .parse::<StarknetNetwork>()
        .unwrap_or(StarknetNetwork::Sepolia);
    if legacy_network == network {
        candidates.push(config.legacy_url.clone());
        candidates.extend(config.legacy_fallback_urls.iter().cloned());
    }

    if !config.infura_api_key.trim().is_empty() {
        candidates.push(infura_url(network, &config.infura_api_key));
    }
    if !config.alchemy_api_key.trim().is_empty() {
        candidates.push(alchemy_url(network, &config.alchemy_api_key));
    }
    if config.include_default_urls {
        candidates.extend(default_rpc_urls(network).iter().map(|url| url.to_string()));
    }

    let mut seen = HashSet::new();
    let mut endpoints = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let url = candidate.trim();
        if url.is_empty() {
            continue;
        }
        validate_endpoint_url(url).with_context(|| format!("invalid rpc endpoint url: {url}"))?;
        if seen.insert(url.to_string()) {
            endpoints.push(url.to_string());
        }
    }
    Ok(endpoints)
}

fn validate_endpoint_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url).context("invalid URL parse")?;
    let scheme = parsed.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(anyhow!("unsupported scheme {}", parsed.scheme()));
    }
    if parsed.host_str().is_none() {
        return Err(anyhow!("host missing"));
    }
    Ok(())
}
