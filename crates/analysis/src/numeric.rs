use alloy_primitives::U256;
use serde_json::Value;
use std::str::FromStr;

pub fn parse_uint(value: &Value) -> Option<U256> {
    match value {
        Value::String(text) => parse_uint_str(text),
        Value::Number(number) => number.as_u64().map(U256::from),
        _ => None,
    }
}

fn parse_uint_str(text: &str) -> Option<U256> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') || trimmed.starts_with('+') {
        return None;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex.is_empty() {
            return None;
        }
        return U256::from_str_radix(hex, 16).ok();
    }
    U256::from_str(trimmed).ok()
}
