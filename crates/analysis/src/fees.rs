use alloy_primitives::U256;
use serde_json::Value;
use txadvisor_core_types::FeeRecommendation;

use crate::numeric::parse_uint;

pub const BUMP_PERCENT: u64 = 112;

const FEE_DATA_UNAVAILABLE: &str =
    "Fee data is unavailable for this transaction, so no deterministic bump can be suggested.";
const FEE_BUMP_APPLIED: &str =
    "Deterministic escalation rule applied: +12% to tip and max L2 gas price (rounded up).";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeBumpInput {
    pub current_tip: Option<Value>,
    pub current_max_fee_per_gas: Option<Value>,
}

impl FeeBumpInput {
    pub fn from_raw(raw: &Value) -> Self {
        let max_fee = raw
            .get("max_l2_gas_price")
            .filter(|value| !value.is_null())
            .or_else(|| raw.pointer("/resource_bounds/l2_gas/max_price_per_unit"))
            .filter(|value| !value.is_null())
            .cloned();
        Self {
            current_tip: raw.get("tip").filter(|value| !value.is_null()).cloned(),
            current_max_fee_per_gas: max_fee,
        }
    }
}

/// `ceil(value * 112 / 100)` without overflowing the intermediate product.
pub fn bump_value(value: U256) -> Option<U256> {
    let hundred = U256::from(100u64);
    let percent = U256::from(BUMP_PERCENT);
    let quotient = value / hundred;
    let remainder = value % hundred;
    let remainder_part = (remainder * percent + U256::from(99u64)) / hundred;
    quotient.checked_mul(percent)?.checked_add(remainder_part)
}

pub fn calculate_bump(input: &FeeBumpInput) -> FeeRecommendation {
    let suggest = |value: Option<&Value>| {
        value
            .and_then(parse_uint)
            .and_then(bump_value)
            .map(|bumped| bumped.to_string())
    };
    let suggested_tip = suggest(input.current_tip.as_ref());
    let suggested_max_fee_per_gas = suggest(input.current_max_fee_per_gas.as_ref());
    if suggested_tip.is_none() && suggested_max_fee_per_gas.is_none() {
        return FeeRecommendation {
            should_bump: false,
            suggested_tip: None,
            suggested_max_fee_per_gas: None,
            rationale: FEE_DATA_UNAVAILABLE.to_string(),
        };
    }

    FeeRecommendation {
        should_bump: true,
        suggested_tip,
        suggested_max_fee_per_gas,
        rationale: FEE_BUMP_APPLIED.to_string(),
    }
}
