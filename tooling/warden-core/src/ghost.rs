use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::sequence::ActionKind;

pub const DEPOSIT_SUM: &str = "deposit_sum";
pub const WITHDRAW_SUM: &str = "withdraw_sum";
pub const FORCE_INJECTED_SUM: &str = "force_injected_sum";
pub const ZERO_DEPOSITS: &str = "zero_deposits";
pub const ZERO_WITHDRAWALS: &str = "zero_withdrawals";
pub const ZERO_TRANSFERS: &str = "zero_transfers";
pub const ZERO_TRANSFER_FROMS: &str = "zero_transfer_froms";

/// Accumulators kept next to the system under test.
///
/// Counters only ever grow. A net quantity such as "deposits still held" is
/// computed by the invariant from two counters, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostState {
    counters: BTreeMap<String, u128>,
    calls: BTreeMap<ActionKind, u64>,
}

impl GhostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to `counter`, saturating at the top of the domain.
    pub fn increment(&mut self, counter: &str, amount: u128) {
        let slot = self.counters.entry(counter.to_string()).or_insert(0);
        *slot = slot.saturating_add(amount);
    }

    pub fn increment_call_count(&mut self, action: ActionKind) {
        let slot = self.calls.entry(action).or_insert(0);
        *slot = slot.saturating_add(1);
    }

    /// Current value of `counter`; counters never touched read as zero.
    pub fn get(&self, counter: &str) -> u128 {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    pub fn call_count(&self, action: ActionKind) -> u64 {
        self.calls.get(&action).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> impl Iterator<Item = (&str, u128)> {
        self.counters.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// True when every counter in `self` is at least its value in `earlier`.
    pub fn dominates(&self, earlier: &GhostState) -> bool {
        earlier
            .counters
            .iter()
            .all(|(name, value)| self.get(name) >= *value)
            && earlier
                .calls
                .iter()
                .all(|(action, count)| self.call_count(*action) >= *count)
    }
}
