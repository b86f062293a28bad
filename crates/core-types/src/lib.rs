use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Submitted,
    Received,
    Candidate,
    PreConfirmed,
    AcceptedOnL2,
    AcceptedOnL1,
    Reverted,
    Rejected,
    NotFound,
    Unknown,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 10] = [
        LifecycleStatus::Submitted,
        LifecycleStatus::Received,
        LifecycleStatus::Candidate,
        LifecycleStatus::PreConfirmed,
        LifecycleStatus::AcceptedOnL2,
        LifecycleStatus::AcceptedOnL1,
        LifecycleStatus::Reverted,
        LifecycleStatus::Rejected,
        LifecycleStatus::NotFound,
        LifecycleStatus::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Received => "RECEIVED",
            Self::Candidate => "CANDIDATE",
            Self::PreConfirmed => "PRE_CONFIRMED",
            Self::AcceptedOnL2 => "ACCEPTED_ON_L2",
            Self::AcceptedOnL1 => "ACCEPTED_ON_L1",
            Self::Reverted => "REVERTED",
            Self::Rejected => "REJECTED",
            Self::NotFound => "NOT_FOUND",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AcceptedOnL2 | Self::AcceptedOnL1 | Self::Reverted | Self::Rejected
        )
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown lifecycle status: {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    Status,
    Receipt,
    Error,
}

impl SnapshotSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Receipt => "receipt",
            Self::Error => "error",
        }
    }
}

impl FromStr for SnapshotSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(Self::Status),
            "receipt" => Ok(Self::Receipt),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown snapshot source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tx_hash: String,
    pub timestamp: i64,
    pub source: SnapshotSource,
    pub normalized: LifecycleStatus,
    pub raw: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SnapshotMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finality_status: Option<String>,
}

impl TimelineDetails {
    pub fn is_empty(&self) -> bool {
        self.block_number.is_none()
            && self.transaction_index.is_none()
            && self.finality_status.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: i64,
    pub normalized: LifecycleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<TimelineDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRecommendation {
    pub should_bump: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_max_fee_per_gas: Option<String>,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusExplanation {
    pub title: String,
    pub meaning: String,
    pub next_actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceConflict {
    pub conflict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    pub nonce_conflict: NonceConflict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub tx_hash: String,
    pub current_status: LifecycleStatus,
    pub timeline: Vec<TimelineEntry>,
    pub recommendation: FeeRecommendation,
    pub explanation: StatusExplanation,
    pub diagnostics: AnalysisDiagnostics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRegistration {
    pub tx_hash: String,
    pub started_at: i64,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_status_round_trips_through_wire_names() -> anyhow::Result<()> {
        for status in LifecycleStatus::ALL {
            let encoded = serde_json::to_string(&status)?;
            assert_eq!(encoded, format!("\"{}\"", status.as_str()));
            let parsed: LifecycleStatus = status.as_str().parse().map_err(anyhow::Error::msg)?;
            assert_eq!(parsed, status);
        }
        Ok(())
    }

    #[test]
    fn only_acceptance_and_failure_states_are_terminal() {
        let terminal: Vec<_> = LifecycleStatus::ALL
            .into_iter()
            .filter(|status| status.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                LifecycleStatus::AcceptedOnL2,
                LifecycleStatus::AcceptedOnL1,
                LifecycleStatus::Reverted,
                LifecycleStatus::Rejected,
            ]
        );
    }

    #[test]
    fn snapshot_source_parse_is_case_insensitive() {
        assert_eq!("Receipt".parse::<SnapshotSource>(), Ok(SnapshotSource::Receipt));
        assert!("other".parse::<SnapshotSource>().is_err());
    }
}
