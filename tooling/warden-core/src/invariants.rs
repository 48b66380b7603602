use std::collections::HashSet;
use std::fmt;

use crate::actors::{Actor, ActorRegistry};
use crate::env::{Environment, SystemUnderTest};
use crate::ghost::{self, GhostState};
use crate::{ConfigError, EngineError};

/// Read-only view handed to invariant predicates.
pub struct InvariantView<'a, E, S> {
    pub env: &'a E,
    pub sut: &'a S,
    pub ghost: &'a GhostState,
    pub actors: &'a ActorRegistry,
}

impl<'a, E, S> InvariantView<'a, E, S>
where
    E: Environment,
    S: SystemUnderTest,
{
    pub fn total_supply(&self) -> u128 {
        self.sut.total_supply(self.env)
    }

    pub fn balance_of(&self, who: Actor) -> u128 {
        self.sut.balance_of(who)
    }

    /// Native balance held by the system under test.
    pub fn sut_native_balance(&self) -> u128 {
        self.env.balance(self.sut.address())
    }

    /// Sum of the wrapped balances of every registered actor.
    pub fn sum_of_balances(&self) -> u128 {
        self.actors
            .reduce(0u128, |acc, actor| acc.saturating_add(self.sut.balance_of(*actor)))
    }
}

type Predicate<E, S> = Box<dyn Fn(&InvariantView<'_, E, S>) -> bool>;

/// A named property expected to hold after every call.
pub struct Invariant<E, S> {
    name: String,
    predicate: Predicate<E, S>,
}

impl<E, S> Invariant<E, S> {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&InvariantView<'_, E, S>) -> bool + 'static,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holds(&self, view: &InvariantView<'_, E, S>) -> bool {
        (self.predicate)(view)
    }
}

impl<E, S> fmt::Debug for Invariant<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invariant").field("name", &self.name).finish()
    }
}

/// The registered predicates, evaluated in registration order.
pub struct InvariantSet<E, S> {
    invariants: Vec<Invariant<E, S>>,
}

impl<E, S> Default for InvariantSet<E, S> {
    fn default() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }
}

impl<E, S> InvariantSet<E, S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, invariant: Invariant<E, S>) {
        self.invariants.push(invariant);
    }

    pub fn with(mut self, invariant: Invariant<E, S>) -> Self {
        self.register(invariant);
        self
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.invariants.iter().map(Invariant::name)
    }

    /// Name of the first predicate that fails, skipping `retired` ones.
    pub fn first_violation(
        &self,
        view: &InvariantView<'_, E, S>,
        retired: &HashSet<String>,
    ) -> Option<&str> {
        self.invariants
            .iter()
            .filter(|inv| !retired.contains(inv.name()))
            .find(|inv| !inv.holds(view))
            .map(Invariant::name)
    }

    /// Evaluates a single predicate; `None` when no predicate has that name.
    pub fn check_one(&self, name: &str, view: &InvariantView<'_, E, S>) -> Option<bool> {
        self.invariants
            .iter()
            .find(|inv| inv.name() == name)
            .map(|inv| inv.holds(view))
    }

    /// Checks every predicate, failing with the first violation.
    pub fn check_all(&self, view: &InvariantView<'_, E, S>) -> Result<(), EngineError> {
        match self.first_violation(view, &HashSet::new()) {
            Some(predicate) => Err(EngineError::InvariantViolation {
                predicate: predicate.to_string(),
            }),
            None => Ok(()),
        }
    }
}

// ── Built-in predicates for the wrapped ledger ─────────────────────────────────

pub const SOLVENCY_DEPOSITS: &str = "solvency_deposits";
pub const SOLVENCY_BALANCES: &str = "solvency_balances";
pub const SOLVENCY_BALANCES_NAIVE: &str = "solvency_balances_naive";
pub const DEPOSITOR_BALANCE: &str = "depositor_balance";

/// Every built-in predicate with a one-line description.
pub const BUILTIN: [(&str, &str); 4] = [
    (
        SOLVENCY_DEPOSITS,
        "native balance held == deposits + force-injected - withdrawals",
    ),
    (
        SOLVENCY_BALANCES,
        "total supply - force-injected == sum of actor balances",
    ),
    (
        SOLVENCY_BALANCES_NAIVE,
        "total supply == sum of actor balances (ignores forced value)",
    ),
    (
        DEPOSITOR_BALANCE,
        "no actor holds more than the total supply",
    ),
];

/// The contract holds exactly what the ghost accounting says came in and out.
pub fn solvency_deposits<E, S>() -> Invariant<E, S>
where
    E: Environment + 'static,
    S: SystemUnderTest + 'static,
{
    Invariant::new(SOLVENCY_DEPOSITS, |view| {
        let inflow = view
            .ghost
            .get(ghost::DEPOSIT_SUM)
            .checked_add(view.ghost.get(ghost::FORCE_INJECTED_SUM));
        let expected = inflow.and_then(|v| v.checked_sub(view.ghost.get(ghost::WITHDRAW_SUM)));
        expected == Some(view.sut_native_balance())
    })
}

/// Supply minus out-of-band value equals the sum of balances.
pub fn solvency_balances<E, S>() -> Invariant<E, S>
where
    E: Environment + 'static,
    S: SystemUnderTest + 'static,
{
    Invariant::new(SOLVENCY_BALANCES, |view| {
        view.total_supply()
            .checked_sub(view.ghost.get(ghost::FORCE_INJECTED_SUM))
            == Some(view.sum_of_balances())
    })
}

/// The same property without the force-injection correction. It breaks as soon
/// as value is pushed in out of band.
pub fn solvency_balances_naive<E, S>() -> Invariant<E, S>
where
    E: Environment + 'static,
    S: SystemUnderTest + 'static,
{
    Invariant::new(SOLVENCY_BALANCES_NAIVE, |view| {
        view.total_supply() == view.sum_of_balances()
    })
}

pub fn depositor_balance<E, S>() -> Invariant<E, S>
where
    E: Environment + 'static,
    S: SystemUnderTest + 'static,
{
    Invariant::new(DEPOSITOR_BALANCE, |view| {
        let supply = view.total_supply();
        view.actors
            .iter()
            .all(|actor| view.balance_of(*actor) <= supply)
    })
}

/// Looks a built-in predicate up by name.
pub fn by_name<E, S>(name: &str) -> Result<Invariant<E, S>, ConfigError>
where
    E: Environment + 'static,
    S: SystemUnderTest + 'static,
{
    match name {
        SOLVENCY_DEPOSITS => Ok(solvency_deposits()),
        SOLVENCY_BALANCES => Ok(solvency_balances()),
        SOLVENCY_BALANCES_NAIVE => Ok(solvency_balances_naive()),
        DEPOSITOR_BALANCE => Ok(depositor_balance()),
        other => Err(ConfigError::UnknownInvariant(other.to_string())),
    }
}
