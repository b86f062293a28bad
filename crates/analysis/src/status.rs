use serde_json::{Map, Value};
use txadvisor_core_types::LifecycleStatus;

const NOT_FOUND_MARKERS: [&str; 2] = ["not found", "transaction_hash_not_found"];

const PRIMARY_STATUS_FIELDS: [&str; 4] = ["status", "finality_status", "execution_status", "tx_status"];

const PRIMARY_PRECEDENCE: [(&str, LifecycleStatus); 8] = [
    ("ACCEPTED_ON_L1", LifecycleStatus::AcceptedOnL1),
    ("ACCEPTED_ON_L2", LifecycleStatus::AcceptedOnL2),
    ("PRE_CONFIRMED", LifecycleStatus::PreConfirmed),
    ("CANDIDATE", LifecycleStatus::Candidate),
    ("RECEIVED", LifecycleStatus::Received),
    ("REJECTED", LifecycleStatus::Rejected),
    ("REVERT", LifecycleStatus::Reverted),
    ("SUBMITTED", LifecycleStatus::Submitted),
];

const RECEIPT_FINALITY_PRECEDENCE: [(&str, LifecycleStatus); 2] = [
    ("ACCEPTED_ON_L1", LifecycleStatus::AcceptedOnL1),
    ("ACCEPTED_ON_L2", LifecycleStatus::AcceptedOnL2),
];

const RECEIPT_EXECUTION_PRECEDENCE: [(&str, LifecycleStatus); 2] = [
    ("REJECTED", LifecycleStatus::Rejected),
    ("REVERT", LifecycleStatus::Reverted),
];

struct StatusExtractor {
    text: fn(&Map<String, Value>) -> Option<String>,
    precedence: &'static [(&'static str, LifecycleStatus)],
}

const EXTRACTORS: [StatusExtractor; 3] = [
    StatusExtractor {
        text: primary_status_text,
        precedence: &PRIMARY_PRECEDENCE,
    },
    StatusExtractor {
        text: receipt_finality_text,
        precedence: &RECEIPT_FINALITY_PRECEDENCE,
    },
    StatusExtractor {
        text: receipt_execution_text,
        precedence: &RECEIPT_EXECUTION_PRECEDENCE,
    },
];

/// Never fails. A not-found marker anywhere in the payload wins over every status field.
pub fn normalize(raw: &Value) -> LifecycleStatus {
    if is_empty_payload(raw) {
        return LifecycleStatus::Unknown;
    }
    if has_not_found_signal(raw) {
        return LifecycleStatus::NotFound;
    }
    let Some(object) = raw.as_object() else {
        return LifecycleStatus::Unknown;
    };

    EXTRACTORS
        .iter()
        .find_map(|extractor| {
            let text = (extractor.text)(object)?;
            extractor
                .precedence
                .iter()
                .find(|(marker, _)| text.contains(marker))
                .map(|(_, status)| *status)
        })
        .unwrap_or(LifecycleStatus::Unknown)
}

fn is_empty_payload(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn has_not_found_signal(raw: &Value) -> bool {
    let lowered = raw.to_string().to_lowercase();
    NOT_FOUND_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn field_text(object: &Map<String, Value>, field: &str) -> Option<String> {
    match object.get(field)? {
        Value::String(text) => Some(text.to_uppercase()),
        scalar @ (Value::Number(_) | Value::Bool(_)) => Some(scalar.to_string().to_uppercase()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

// First string or scalar field only; later fields are not consulted even if the first has no marker.
fn primary_status_text(object: &Map<String, Value>) -> Option<String> {
    PRIMARY_STATUS_FIELDS
        .iter()
        .find_map(|field| field_text(object, field))
}

fn receipt_finality_text(object: &Map<String, Value>) -> Option<String> {
    field_text(object, "finality_status")
}

fn receipt_execution_text(object: &Map<String, Value>) -> Option<String> {
    field_text(object, "execution_status")
}
