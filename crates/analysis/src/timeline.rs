use serde_json::Value;
use txadvisor_core_types::{Snapshot, TimelineDetails, TimelineEntry};

pub fn build_timeline(snapshots: &[Snapshot]) -> Vec<TimelineEntry> {
    let mut sorted: Vec<&Snapshot> = snapshots.iter().collect();
    sorted.sort_by_key(|snapshot| snapshot.timestamp);

    let mut timeline: Vec<TimelineEntry> = Vec::new();
    for snapshot in sorted {
        if timeline
            .last()
            .is_some_and(|previous| previous.normalized == snapshot.normalized)
        {
            continue;
        }
        timeline.push(TimelineEntry {
            timestamp: snapshot.timestamp,
            normalized: snapshot.normalized,
            details: extract_details(&snapshot.raw),
        });
    }
    timeline
}

fn extract_details(raw: &Value) -> Option<TimelineDetails> {
    let details = TimelineDetails {
        block_number: raw.get("block_number").and_then(Value::as_u64),
        transaction_index: raw.get("transaction_index").and_then(Value::as_u64),
        finality_status: raw
            .get("finality_status")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    (!details.is_empty()).then_some(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use txadvisor_core_types::{LifecycleStatus, SnapshotSource};

    fn snapshot(timestamp: i64, normalized: LifecycleStatus, raw: Value) -> Snapshot {
        Snapshot {
            tx_hash: "0xabc".to_string(),
            timestamp,
            source: SnapshotSource::Status,
            normalized,
            raw,
            meta: None,
        }
    }

    #[test]
    fn sorts_and_dedupes_adjacent_statuses() {
        let snapshots = vec![
            snapshot(20, LifecycleStatus::Received, json!({})),
            snapshot(10, LifecycleStatus::Submitted, json!({})),
            snapshot(30, LifecycleStatus::Received, json!({})),
        ];
        let timeline = build_timeline(&snapshots);
        let statuses: Vec<LifecycleStatus> = timeline.iter().map(|entry| entry.normalized).collect();
        assert_eq!(
            statuses,
            vec![LifecycleStatus::Submitted, LifecycleStatus::Received]
        );
        assert_eq!(timeline[1].timestamp, 20);
    }

    #[test]
    fn status_may_reappear_after_a_different_one() {
        let snapshots = vec![
            snapshot(1, LifecycleStatus::NotFound, json!({})),
            snapshot(2, LifecycleStatus::Received, json!({})),
            snapshot(3, LifecycleStatus::NotFound, json!({})),
        ];
        assert_eq!(build_timeline(&snapshots).len(), 3);
    }

    #[test]
    fn ties_keep_input_order() {
        let snapshots = vec![
            snapshot(5, LifecycleStatus::Candidate, json!({})),
            snapshot(5, LifecycleStatus::Received, json!({})),
        ];
        let timeline = build_timeline(&snapshots);
        assert_eq!(timeline[0].normalized, LifecycleStatus::Candidate);
        assert_eq!(timeline[1].normalized, LifecycleStatus::Received);
    }

    #[test]
    fn empty_input_yields_empty_timeline() {
        assert!(build_timeline(&[]).is_empty());
    }

    #[test]
    fn details_are_extracted_only_when_present() {
        let snapshots = vec![
            snapshot(1, LifecycleStatus::Received, json!({"finality_status": "RECEIVED"})),
            snapshot(
                2,
                LifecycleStatus::AcceptedOnL2,
                json!({"block_number": 812, "transaction_index": 3, "finality_status": "ACCEPTED_ON_L2"}),
            ),
            snapshot(3, LifecycleStatus::Unknown, json!({"block_number": "0x10"})),
        ];
        let timeline = build_timeline(&snapshots);
        assert_eq!(
            timeline[0].details,
            Some(TimelineDetails {
                finality_status: Some("RECEIVED".to_string()),
                ..TimelineDetails::default()
            })
        );
        assert_eq!(
            timeline[1].details,
            Some(TimelineDetails {
                block_number: Some(812),
                transaction_index: Some(3),
                finality_status: Some("ACCEPTED_ON_L2".to_string()),
            })
        );
        assert_eq!(timeline[2].details, None);
    }
}
