use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::handler::ExecutedCall;
use crate::sequence::{ActionKind, CallRecord};

/// One step of a reported sequence: the raw record that replays it and the
/// concrete call it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedCall {
    pub record: CallRecord,
    pub call: ExecutedCall,
}

/// A broken invariant with the (shrunk) sequence that breaks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub predicate: String,
    pub run_index: usize,
    /// Index of the failing call in `sequence`; `None` when the invariant
    /// already fails right after setup.
    pub call_index: Option<usize>,
    /// Length of the sequence before shrinking.
    pub original_length: usize,
    pub sequence: Vec<ReportedCall>,
}

impl FailureReport {
    pub fn records(&self) -> Vec<CallRecord> {
        self.sequence.iter().map(|step| step.record.clone()).collect()
    }

    pub fn failed_at_setup(&self) -> bool {
        self.call_index.is_none()
    }
}

/// Receives every failure as soon as it is confirmed.
pub trait ReportSink {
    fn report(&mut self, report: &FailureReport);
}

impl ReportSink for Vec<FailureReport> {
    fn report(&mut self, report: &FailureReport) {
        self.push(report.clone());
    }
}

/// Logs failures through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&mut self, report: &FailureReport) {
        warn!(
            predicate = %report.predicate,
            run = report.run_index,
            calls = report.sequence.len(),
            "invariant broken"
        );
        for (index, step) in report.sequence.iter().enumerate() {
            warn!("  [{index}] {}", step.call);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStats {
    pub calls: u64,
    pub reverts: u64,
}

/// Outcome of a whole campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzSummary {
    pub seed: u64,
    pub runs: usize,
    pub calls: u64,
    pub reverts: u64,
    pub actions: BTreeMap<ActionKind, CallStats>,
    pub invariants: Vec<String>,
    pub failures: Vec<FailureReport>,
}

impl FuzzSummary {
    pub fn record(&mut self, call: &ExecutedCall) {
        let stats = self.actions.entry(call.action).or_default();
        stats.calls += 1;
        self.calls += 1;
        if !call.outcome.is_success() {
            stats.reverts += 1;
            self.reverts += 1;
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
