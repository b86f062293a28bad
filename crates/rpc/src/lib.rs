mod client;
mod failure;
mod health;
mod http_utils;

pub use client::{
    RpcClientSettings, StarknetRpcClient, DEFAULT_ATTEMPTS_PER_ENDPOINT, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RETRY_DELAY,
};
pub use failure::{RpcFailure, RpcFailureKind, RpcSuccess};
pub use health::{inspect_endpoints, EndpointHealth};
pub use http_utils::redacted_endpoint_label;
