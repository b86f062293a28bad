use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::StarknetRpcClient;
use crate::http_utils::redacted_endpoint_label;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointHealth {
    pub endpoint: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn check_endpoint(client: &StarknetRpcClient, endpoint: &str) -> EndpointHealth {
    let label = redacted_endpoint_label(endpoint);
    match client.call_single(endpoint, "starknet_chainId", json!([])).await {
        Ok(Value::String(chain_id)) if !chain_id.is_empty() => EndpointHealth {
            endpoint: label,
            ok: true,
            chain_id: Some(chain_id),
            error: None,
        },
        Ok(_) => EndpointHealth {
            endpoint: label,
            ok: false,
            chain_id: None,
            error: Some("Missing chain id result".to_string()),
        },
        Err(failure) => EndpointHealth {
            endpoint: label,
            ok: false,
            chain_id: None,
            error: Some(failure.message),
        },
    }
}

pub async fn inspect_endpoints(client: &StarknetRpcClient) -> Vec<EndpointHealth> {
    join_all(
        client
            .endpoints()
            .iter()
            .map(|endpoint| check_endpoint(client, endpoint)),
    )
    .await
}
