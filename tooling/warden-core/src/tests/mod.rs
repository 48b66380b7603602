// tooling/warden-core/src/tests/mod.rs

use proptest::prelude::*;

use crate::actors::{Actor, ActorRegistry};
use crate::bound::bound;
use crate::env::{Environment, SimEnvironment};
use crate::harness::wrapped_token_handler;
use crate::handler::HandlerConfig;
use crate::invariants::{self, InvariantSet};
use crate::sequence::{ActionKind, CallRecord};
use crate::EngineError;

/// Environment whose native transfers fail with a harness error instead of a
/// payment failure.
#[derive(Debug, Clone, Default)]
pub(crate) struct BrokenTransfers(pub SimEnvironment);

impl Environment for BrokenTransfers {
    fn balance(&self, who: Actor) -> u128 {
        self.0.balance(who)
    }

    fn set_balance(&mut self, who: Actor, amount: u128) {
        self.0.set_balance(who, amount);
    }

    fn transfer(&mut self, _from: Actor, _to: Actor, amount: u128) -> Result<(), EngineError> {
        Err(EngineError::InvalidRange { low: amount.saturating_add(1), high: amount })
    }

    fn inject_out_of_band(&mut self, amount: u128, target: Actor) {
        self.0.inject_out_of_band(amount, target);
    }
}

fn record_strategy() -> impl Strategy<Value = CallRecord> {
    (
        0..ActionKind::ALL.len(),
        0u128..10,
        any::<u128>(),
        prop::collection::vec(any::<u128>(), 4),
    )
        .prop_map(|(action, sender, actor_seed, args)| {
            CallRecord::new(
                Actor::from_pool(sender, 10),
                actor_seed,
                ActionKind::ALL[action],
                args,
            )
        })
}

// ── bound ────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_bound_stays_in_range(raw in any::<u128>(), a in any::<u128>(), b in any::<u128>()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let bounded = bound(raw, low, high).unwrap();
        prop_assert!(low <= bounded && bounded <= high);
        prop_assert_eq!(bound(raw, low, high).unwrap(), bounded);
    }

    #[test]
    fn prop_bound_keeps_in_range_values(low in 0u128..1_000_000, span in 0u128..1_000_000, offset in 0u128..1_000_000) {
        let high = low + span;
        let raw = low + offset % (span + 1);
        prop_assert_eq!(bound(raw, low, high).unwrap(), raw);
    }

    #[test]
    fn prop_bound_rejects_inverted_range(low in 1u128.., raw in any::<u128>()) {
        prop_assert!(bound(raw, low, low - 1).is_err());
    }
}

// ── ActorRegistry ────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_pick_returns_member_and_wraps(
        ids in prop::collection::vec(any::<u64>(), 1..32),
        seed in any::<u128>(),
    ) {
        let mut registry = ActorRegistry::new();
        for id in &ids {
            registry.add(Actor::new(*id));
        }
        let n = registry.count() as u128;
        let picked = registry.pick(seed).unwrap();
        prop_assert!(registry.contains(&picked));
        prop_assert_eq!(registry.pick(seed % n).unwrap(), picked);
        prop_assert_eq!(registry.pick(seed % n + n).unwrap(), picked);
    }

    #[test]
    fn prop_add_is_idempotent(ids in prop::collection::vec(any::<u64>(), 1..32), again in any::<prop::sample::Index>()) {
        let mut registry = ActorRegistry::new();
        for id in &ids {
            registry.add(Actor::new(*id));
        }
        let before: Vec<Actor> = registry.iter().copied().collect();
        let repeated = Actor::new(ids[again.index(ids.len())]);

        prop_assert!(!registry.add(repeated));
        prop_assert_eq!(registry.count(), before.len());
        prop_assert_eq!(registry.iter().copied().collect::<Vec<_>>(), before);
    }
}

// ── Handler and ghost accounting ────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ghost_counters_never_decrease(records in prop::collection::vec(record_strategy(), 1..40)) {
        let mut handler = wrapped_token_handler(&HandlerConfig::default());
        for record in &records {
            let before = handler.ghost().clone();
            handler.dispatch(record).unwrap();
            prop_assert!(handler.ghost().dominates(&before));
        }
    }

    #[test]
    fn prop_corrected_invariants_hold_for_any_sequence(records in prop::collection::vec(record_strategy(), 1..40)) {
        let set = InvariantSet::new()
            .with(invariants::solvency_deposits())
            .with(invariants::solvency_balances())
            .with(invariants::depositor_balance());
        let mut handler = wrapped_token_handler(&HandlerConfig::default());
        for record in &records {
            let call = handler.dispatch(record).unwrap();
            prop_assert!(set.check_all(&handler.view()).is_ok(), "broken after {}", call);
        }
    }

    #[test]
    fn prop_dispatch_is_deterministic(records in prop::collection::vec(record_strategy(), 1..24)) {
        let mut a = wrapped_token_handler(&HandlerConfig::default());
        let mut b = wrapped_token_handler(&HandlerConfig::default());
        for record in &records {
            prop_assert_eq!(a.dispatch(record).unwrap(), b.dispatch(record).unwrap());
        }
        prop_assert_eq!(a.ghost(), b.ghost());
    }
}
