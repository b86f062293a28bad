use alloy_primitives::U256;
use serde_json::Value;
use txadvisor_core_types::NonceConflict;

use crate::numeric::parse_uint;

const PENDING_NONCE_MATCH: &str = "Transaction nonce matches another pending nonce.";
const NONCE_ALREADY_USED: &str =
    "Transaction nonce is lower than current account nonce and is likely already used.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NonceConflictInput {
    pub tx_nonce: Option<Value>,
    pub pending_nonces: Vec<Value>,
    pub current_account_nonce: Option<Value>,
}

impl NonceConflictInput {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            tx_nonce: raw.get("nonce").filter(|value| !value.is_null()).cloned(),
            pending_nonces: raw
                .get("pending_nonces")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            current_account_nonce: raw
                .get("account_nonce")
                .filter(|value| !value.is_null())
                .cloned(),
        }
    }
}

pub fn detect_conflict(input: &NonceConflictInput) -> NonceConflict {
    let Some(tx_nonce) = input.tx_nonce.as_ref().and_then(parse_uint) else {
        return NonceConflict::default();
    };

    let pending: Vec<U256> = input.pending_nonces.iter().filter_map(parse_uint).collect();
    if pending.contains(&tx_nonce) {
        return conflict(PENDING_NONCE_MATCH);
    }

    let account_nonce = input.current_account_nonce.as_ref().and_then(parse_uint);
    if account_nonce.is_some_and(|account| tx_nonce < account) {
        return conflict(NONCE_ALREADY_USED);
    }

    NonceConflict::default()
}

fn conflict(reason: &str) -> NonceConflict {
    NonceConflict {
        conflict: true,
        reason: Some(reason.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_pending_nonce_match() {
        let out = detect_conflict(&NonceConflictInput {
            tx_nonce: Some(json!("5")),
            pending_nonces: vec![json!("4"), json!("5")],
            current_account_nonce: None,
        });
        assert!(out.conflict);
        assert_eq!(out.reason.as_deref(), Some(PENDING_NONCE_MATCH));
    }

    #[test]
    fn detects_already_used_nonce() {
        let out = detect_conflict(&NonceConflictInput {
            tx_nonce: Some(json!("3")),
            pending_nonces: Vec::new(),
            current_account_nonce: Some(json!("4")),
        });
        assert!(out.conflict);
        assert_eq!(out.reason.as_deref(), Some(NONCE_ALREADY_USED));
    }

    #[test]
    fn no_conflict_without_evidence() {
        assert_eq!(
            detect_conflict(&NonceConflictInput {
                tx_nonce: Some(json!("0x4")),
                pending_nonces: vec![json!("garbage"), json!(3)],
                current_account_nonce: Some(json!("0x4")),
            }),
            NonceConflict::default()
        );
        assert_eq!(
            detect_conflict(&NonceConflictInput {
                tx_nonce: None,
                pending_nonces: vec![json!("1")],
                current_account_nonce: Some(json!("9")),
            }),
            NonceConflict::default()
        );
    }

    #[test]
    fn compares_hex_and_decimal_as_integers() {
        let raw = json!({"nonce": "0x5", "pending_nonces": [5], "account_nonce": "1"});
        let out = detect_conflict(&NonceConflictInput::from_raw(&raw));
        assert!(out.conflict);
        assert_eq!(out.reason.as_deref(), Some(PENDING_NONCE_MATCH));
    }
}
