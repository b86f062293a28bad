use txadvisor_core_types::{AnalysisDiagnostics, AnalysisResult, LifecycleStatus, Snapshot};

mod explain;
mod fees;
mod nonce;
mod numeric;
mod status;
mod timeline;

pub use explain::explain;
pub use fees::{bump_value, calculate_bump, FeeBumpInput, BUMP_PERCENT};
pub use nonce::{detect_conflict, NonceConflictInput};
pub use numeric::parse_uint;
pub use status::normalize;
pub use timeline::build_timeline;

pub const NONCE_DIAGNOSTICS_NOTE: &str = "Nonce conflict uses limited available metadata.";

pub fn analyze(tx_hash: &str, snapshots: &[Snapshot]) -> AnalysisResult {
    let timeline = build_timeline(snapshots);
    let current_status = timeline
        .last()
        .map(|entry| entry.normalized)
        .unwrap_or(LifecycleStatus::Unknown);

    let latest_raw = latest_snapshot(snapshots)
        .map(|snapshot| snapshot.raw.clone())
        .unwrap_or(serde_json::Value::Null);

    AnalysisResult {
        tx_hash: tx_hash.to_string(),
        current_status,
        timeline,
        recommendation: calculate_bump(&FeeBumpInput::from_raw(&latest_raw)),
        explanation: explain(current_status),
        diagnostics: AnalysisDiagnostics {
            nonce_conflict: detect_conflict(&NonceConflictInput::from_raw(&latest_raw)),
            note: Some(NONCE_DIAGNOSTICS_NOTE.to_string()),
        },
    }
}

// Latest by timestamp; among equal timestamps the later element in the slice.
fn latest_snapshot(snapshots: &[Snapshot]) -> Option<&Snapshot> {
    snapshots
        .iter()
        .enumerate()
        .max_by_key(|(index, snapshot)| (snapshot.timestamp, *index))
        .map(|(_, snapshot)| snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use txadvisor_core_types::SnapshotSource;

    fn snapshot(timestamp: i64, normalized: LifecycleStatus, raw: Value) -> Snapshot {
        Snapshot {
            tx_hash: "0x0123456789".to_string(),
            timestamp,
            source: SnapshotSource::Status,
            normalized,
            raw,
            meta: None,
        }
    }

    #[test]
    fn empty_snapshots_analyze_as_unknown() {
        let result = analyze("0x0123456789", &[]);
        assert_eq!(result.current_status, LifecycleStatus::Unknown);
        assert!(result.timeline.is_empty());
        assert!(!result.recommendation.should_bump);
        assert_eq!(result.explanation, explain(LifecycleStatus::Unknown));
        assert!(!result.diagnostics.nonce_conflict.conflict);
        assert_eq!(
            result.diagnostics.note.as_deref(),
            Some(NONCE_DIAGNOSTICS_NOTE)
        );
    }

    #[test]
    fn current_status_is_last_timeline_entry() {
        let snapshots = vec![
            snapshot(10, LifecycleStatus::Received, json!({"finality_status": "RECEIVED"})),
            snapshot(20, LifecycleStatus::AcceptedOnL2, json!({"finality_status": "ACCEPTED_ON_L2"})),
        ];
        let result = analyze("0x0123456789", &snapshots);
        assert_eq!(result.current_status, LifecycleStatus::AcceptedOnL2);
        assert_eq!(result.explanation.title, "Accepted on L2");
        assert_eq!(result.timeline.len(), 2);
    }

    #[test]
    fn fee_and_nonce_inputs_come_from_latest_snapshot_only() {
        let snapshots = vec![
            snapshot(
                30,
                LifecycleStatus::Received,
                json!({"tip": "100", "nonce": "3", "account_nonce": "4"}),
            ),
            snapshot(10, LifecycleStatus::Submitted, json!({"tip": "999", "nonce": "9"})),
        ];
        let result = analyze("0x0123456789", &snapshots);
        assert!(result.recommendation.should_bump);
        assert_eq!(result.recommendation.suggested_tip.as_deref(), Some("112"));
        assert!(result.diagnostics.nonce_conflict.conflict);

        let snapshots = vec![
            snapshot(10, LifecycleStatus::Submitted, json!({"tip": "100"})),
            snapshot(20, LifecycleStatus::Received, json!({"finality_status": "RECEIVED"})),
        ];
        let result = analyze("0x0123456789", &snapshots);
        assert!(!result.recommendation.should_bump);
    }

    #[test]
    fn analysis_is_deterministic() {
        let snapshots = vec![
            snapshot(1, LifecycleStatus::Submitted, json!({"tip": "0x64", "max_l2_gas_price": "101"})),
            snapshot(2, LifecycleStatus::Submitted, json!({"tip": "0x64", "max_l2_gas_price": "101"})),
        ];
        assert_eq!(
            analyze("0x0123456789", &snapshots),
            analyze("0x0123456789", &snapshots)
        );
    }
}
