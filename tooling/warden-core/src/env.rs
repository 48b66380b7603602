use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::actors::Actor;
use crate::EngineError;

/// A rejected call into the system under test.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("revert: {reason}")]
pub struct Revert {
    pub reason: String,
}

impl Revert {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A mutating operation of the system under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SutCall {
    Deposit { value: u128 },
    Withdraw { amount: u128 },
    /// Plain value transfer hitting the receive path.
    Fallback { value: u128 },
    Approve { spender: Actor, amount: u128 },
    Transfer { to: Actor, amount: u128 },
    TransferFrom { from: Actor, to: Actor, amount: u128 },
}

impl SutCall {
    /// Native value attached to the call.
    pub fn value(&self) -> u128 {
        match self {
            SutCall::Deposit { value } | SutCall::Fallback { value } => *value,
            _ => 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SutCall::Deposit { .. } => "deposit",
            SutCall::Withdraw { .. } => "withdraw",
            SutCall::Fallback { .. } => "fallback",
            SutCall::Approve { .. } => "approve",
            SutCall::Transfer { .. } => "transfer",
            SutCall::TransferFrom { .. } => "transfer_from",
        }
    }
}

/// The black-box contract being fuzzed.
///
/// Queries never mutate. `execute` must be all-or-nothing: when it returns a
/// [`Revert`] neither the contract nor the environment has changed.
pub trait SystemUnderTest {
    fn address(&self) -> Actor;
    fn balance_of(&self, who: Actor) -> u128;
    fn total_supply(&self, env: &dyn Environment) -> u128;
    fn allowance(&self, owner: Actor, spender: Actor) -> u128;
    fn execute(
        &mut self,
        env: &mut dyn Environment,
        caller: Actor,
        call: &SutCall,
    ) -> Result<(), Revert>;
}

/// Execution-environment capabilities the handler relies on.
pub trait Environment {
    /// Native balance of `who`.
    fn balance(&self, who: Actor) -> u128;

    fn set_balance(&mut self, who: Actor, amount: u128);

    /// Moves native value; fails with `PaymentFailed` when the sender is short
    /// or the recipient refuses the payment.
    fn transfer(&mut self, from: Actor, to: Actor, amount: u128) -> Result<(), EngineError>;

    /// Credits `target` without running any of its code, the way a
    /// self-destructing contract pushes its balance.
    fn inject_out_of_band(&mut self, amount: u128, target: Actor);

    /// Executes exactly one call on `sut` with `who` as the caller, attaching
    /// the call's native value. A revert leaves every balance as it was.
    fn act_as<S>(&mut self, who: Actor, sut: &mut S, call: &SutCall) -> Result<(), EngineError>
    where
        Self: Sized,
        S: SystemUnderTest,
    {
        let target = sut.address();
        let value = call.value();
        let before = (self.balance(who), self.balance(target));

        if value > 0 {
            self.transfer(who, target, value)
                .map_err(|_| EngineError::ActionFailed {
                    action: call.name().to_string(),
                    reason: format!("caller {who} cannot attach value {value}"),
                })?;
        }

        if let Err(revert) = sut.execute(self, who, call) {
            self.set_balance(who, before.0);
            self.set_balance(target, before.1);
            return Err(EngineError::ActionFailed {
                action: call.name().to_string(),
                reason: revert.to_string(),
            });
        }
        Ok(())
    }
}

// ── Simulated environment ──────────────────────────────────────────────────────

/// In-process ledger of native balances.
#[derive(Debug, Clone, Default)]
pub struct SimEnvironment {
    balances: HashMap<Actor, u128>,
    rejecting: HashSet<Actor>,
}

impl SimEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future payment to `who` fail, like a contract without a
    /// receive hook.
    pub fn reject_payments_to(&mut self, who: Actor) {
        self.rejecting.insert(who);
    }
}

impl Environment for SimEnvironment {
    fn balance(&self, who: Actor) -> u128 {
        self.balances.get(&who).copied().unwrap_or(0)
    }

    fn set_balance(&mut self, who: Actor, amount: u128) {
        self.balances.insert(who, amount);
    }

    fn transfer(&mut self, from: Actor, to: Actor, amount: u128) -> Result<(), EngineError> {
        let failed = EngineError::PaymentFailed { from, to, amount };
        if self.rejecting.contains(&to) {
            return Err(failed);
        }
        if from == to {
            return if self.balance(from) >= amount {
                Ok(())
            } else {
                Err(failed)
            };
        }
        let Some(from_balance) = self.balance(from).checked_sub(amount) else {
            return Err(failed);
        };
        let Some(to_balance) = self.balance(to).checked_add(amount) else {
            return Err(failed);
        };
        self.balances.insert(from, from_balance);
        self.balances.insert(to, to_balance);
        Ok(())
    }

    fn inject_out_of_band(&mut self, amount: u128, target: Actor) {
        let credited = self.balance(target).saturating_add(amount);
        self.balances.insert(target, credited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Actor = Actor::new(1);
    const BOB: Actor = Actor::new(2);

    #[test]
    fn test_call_value_keeps_full_width() {
        let deposit = SutCall::Deposit { value: u128::MAX };
        assert_eq!(deposit.value(), u128::MAX);
        assert_eq!(deposit.name(), "deposit");
        assert_eq!(SutCall::Withdraw { amount: u128::MAX }.value(), 0);
    }

    #[test]
    fn test_transfer_moves_value() {
        let mut env = SimEnvironment::new();
        env.set_balance(ALICE, 100);
        env.transfer(ALICE, BOB, 30).unwrap();
        assert_eq!(env.balance(ALICE), 70);
        assert_eq!(env.balance(BOB), 30);
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let mut env = SimEnvironment::new();
        env.set_balance(ALICE, 10);
        assert_eq!(
            env.transfer(ALICE, BOB, 11),
            Err(EngineError::PaymentFailed {
                from: ALICE,
                to: BOB,
                amount: 11
            })
        );
        assert_eq!(env.balance(ALICE), 10);
    }

    #[test]
    fn test_rejecting_recipient() {
        let mut env = SimEnvironment::new();
        env.set_balance(ALICE, 10);
        env.reject_payments_to(BOB);
        assert!(env.transfer(ALICE, BOB, 1).is_err());
        assert_eq!(env.balance(BOB), 0);
    }

    #[test]
    fn test_inject_out_of_band() {
        let mut env = SimEnvironment::new();
        env.inject_out_of_band(5, BOB);
        env.inject_out_of_band(u128::MAX, BOB);
        assert_eq!(env.balance(BOB), u128::MAX);
    }
}
