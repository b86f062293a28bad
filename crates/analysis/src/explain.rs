use txadvisor_core_types::{LifecycleStatus, StatusExplanation};

struct ExplanationEntry {
    title: &'static str,
    meaning: &'static str,
    next_actions: &'static [&'static str],
}

fn entry(status: LifecycleStatus) -> ExplanationEntry {
    match status {
        LifecycleStatus::Submitted => ExplanationEntry {
            title: "Submitted",
            meaning: "The transaction was submitted but has not yet progressed in sequencing.",
            next_actions: &[
                "Wait a short period and refresh status.",
                "Prepare fee bump if status does not progress.",
            ],
        },
        LifecycleStatus::Received => ExplanationEntry {
            title: "Received by Sequencer",
            meaning: "The sequencer has acknowledged the transaction.",
            next_actions: &["Continue monitoring for pre-confirmation or acceptance."],
        },
        LifecycleStatus::Candidate => ExplanationEntry {
            title: "Candidate",
            meaning: "Transaction is a candidate for inclusion in a block.",
            next_actions: &["Keep monitoring; avoid duplicate submissions unless stuck for long."],
        },
        LifecycleStatus::PreConfirmed => ExplanationEntry {
            title: "Pre-confirmed",
            meaning: "Transaction appears close to final acceptance but not final yet.",
            next_actions: &["Wait for final acceptance before considering complete."],
        },
        LifecycleStatus::AcceptedOnL2 => ExplanationEntry {
            title: "Accepted on L2",
            meaning: "Transaction reached finality on Starknet L2.",
            next_actions: &["No action required unless downstream process failed."],
        },
        LifecycleStatus::AcceptedOnL1 => ExplanationEntry {
            title: "Accepted on L1",
            meaning: "Transaction has reached L1-level acceptance/finality.",
            next_actions: &["No action required."],
        },
        LifecycleStatus::Reverted => ExplanationEntry {
            title: "Reverted",
            meaning: "Transaction executed but reverted.",
            next_actions: &[
                "Inspect revert reason in receipt.",
                "Fix call data or state assumptions, then resubmit.",
            ],
        },
        LifecycleStatus::Rejected => ExplanationEntry {
            title: "Rejected",
            meaning: "Transaction was rejected before successful execution.",
            next_actions: &[
                "Check fee parameters and validity.",
                "Re-submit with corrected params.",
            ],
        },
        LifecycleStatus::NotFound => ExplanationEntry {
            title: "Not Found",
            meaning: "Transaction hash is not currently visible from RPC.",
            next_actions: &[
                "Verify tx hash.",
                "Wait briefly and retry on another RPC endpoint.",
            ],
        },
        LifecycleStatus::Unknown => ExplanationEntry {
            title: "Unknown",
            meaning: "The RPC response could not be mapped to a known status.",
            next_actions: &[
                "Inspect raw JSON output.",
                "Try fallback RPC and continue polling.",
            ],
        },
    }
}

pub fn explain(status: LifecycleStatus) -> StatusExplanation {
    let entry = entry(status);
    StatusExplanation {
        title: entry.title.to_string(),
        meaning: entry.meaning.to_string(),
        next_actions: entry
            .next_actions
            .iter()
            .map(|action| action.to_string())
            .collect(),
    }
}
