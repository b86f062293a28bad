use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcFailureKind {
    RpcUnavailable,
    TxNotFound,
    InvalidRequest,
}

impl RpcFailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RpcUnavailable => "RPC_UNAVAILABLE",
            Self::TxNotFound => "TX_NOT_FOUND",
            Self::InvalidRequest => "INVALID_REQUEST",
        }
    }
}

impl fmt::Display for RpcFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcFailure {
    pub kind: RpcFailureKind,
    pub message: String,
    pub endpoint: Option<String>,
    pub debug: Option<Value>,
}

impl RpcFailure {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcFailureKind::RpcUnavailable, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcFailureKind::TxNotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(RpcFailureKind::InvalidRequest, message)
    }

    fn new(kind: RpcFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            endpoint: None,
            debug: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_debug(mut self, debug: Value) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn to_descriptor(&self) -> Value {
        let mut error = json!({
            "kind": self.kind.as_str(),
            "message": self.message,
        });
        if let Some(endpoint) = &self.endpoint {
            error["endpoint"] = Value::String(endpoint.clone());
        }
        if let Some(debug) = &self.debug {
            error["debug"] = debug.clone();
        }
        json!({ "error": error })
    }
}

impl fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.endpoint {
            Some(endpoint) => write!(f, "{} endpoint={}: {}", self.kind, endpoint, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for RpcFailure {}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcSuccess {
    pub result: Value,
    pub endpoint: String,
}
