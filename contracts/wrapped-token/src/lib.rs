#![no_std]

//! Ledger logic of a minimal token-wrapping contract.
//!
//! The contract accepts the native asset, mints an equal amount of the wrapped
//! token, and burns wrapped tokens on withdrawal. Moving the native asset itself
//! is the host's job: this crate only keeps the wrapped balances and allowances,
//! so it can be driven by any environment (an on-chain host, or an in-process
//! simulation during fuzzing).
//!
//! Arithmetic lives in small pure functions so the checked behaviour can be
//! tested on plain integers, while `WrappedToken` applies them to the
//! per-account maps.

extern crate alloc;

use alloc::collections::BTreeMap;
use core::fmt;

/// Allowance value treated as infinite: `transfer_from` never decrements it.
pub const UNLIMITED_ALLOWANCE: u128 = u128::MAX;

// ── Errors ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    InsufficientBalance { available: u128, requested: u128 },
    InsufficientAllowance { available: u128, requested: u128 },
    Overflow,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::InsufficientBalance {
                available,
                requested,
            } => write!(
                f,
                "insufficient balance: {available} available, {requested} requested"
            ),
            TokenError::InsufficientAllowance {
                available,
                requested,
            } => write!(
                f,
                "insufficient allowance: {available} available, {requested} requested"
            ),
            TokenError::Overflow => f.write_str("balance overflow"),
        }
    }
}

// ── Pure logic ──────────────────────────────────────────────────────────────────

/// Credit: add to a balance.
pub fn credit_pure(balance: u128, amount: u128) -> Result<u128, TokenError> {
    balance.checked_add(amount).ok_or(TokenError::Overflow)
}

/// Debit: subtract from a balance.
pub fn debit_pure(balance: u128, amount: u128) -> Result<u128, TokenError> {
    balance
        .checked_sub(amount)
        .ok_or(TokenError::InsufficientBalance {
            available: balance,
            requested: amount,
        })
}

/// Transfer: deduct from sender, add to receiver. Zero amounts are allowed.
pub fn transfer_pure(
    balance_from: u128,
    balance_to: u128,
    amount: u128,
) -> Result<(u128, u128), TokenError> {
    let new_from = debit_pure(balance_from, amount)?;
    let new_to = credit_pure(balance_to, amount)?;
    Ok((new_from, new_to))
}

/// Spend from an allowance; the unlimited allowance is left untouched.
pub fn spend_allowance_pure(allowance: u128, amount: u128) -> Result<u128, TokenError> {
    if allowance == UNLIMITED_ALLOWANCE {
        return Ok(allowance);
    }
    allowance
        .checked_sub(amount)
        .ok_or(TokenError::InsufficientAllowance {
            available: allowance,
            requested: amount,
        })
}

// ── Ledger ──────────────────────────────────────────────────────────────────────

/// Wrapped balances and allowances keyed by account.
///
/// Every mutating operation is all-or-nothing: on error no balance or
/// allowance has changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedToken<A: Ord + Copy> {
    balances: BTreeMap<A, u128>,
    allowances: BTreeMap<(A, A), u128>,
}

impl<A: Ord + Copy> Default for WrappedToken<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Ord + Copy> WrappedToken<A> {
    pub fn new() -> Self {
        Self {
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    pub fn balance_of(&self, account: A) -> u128 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: A, spender: A) -> u128 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    /// Sum of all recorded wrapped balances. This is what was minted minus what
    /// was burned; it is independent of how much native asset the host holds.
    pub fn minted(&self) -> u128 {
        self.balances
            .values()
            .fold(0u128, |acc, b| acc.saturating_add(*b))
    }

    /// Mint `value` wrapped tokens to `account` for native value already received.
    pub fn deposit(&mut self, account: A, value: u128) -> Result<(), TokenError> {
        let updated = credit_pure(self.balance_of(account), value)?;
        self.balances.insert(account, updated);
        Ok(())
    }

    /// Burn `amount` wrapped tokens from `account`. The caller owes the account
    /// the same amount of native asset.
    pub fn withdraw(&mut self, account: A, amount: u128) -> Result<(), TokenError> {
        let updated = debit_pure(self.balance_of(account), amount)?;
        self.balances.insert(account, updated);
        Ok(())
    }

    pub fn approve(&mut self, owner: A, spender: A, amount: u128) {
        self.allowances.insert((owner, spender), amount);
    }

    pub fn transfer(&mut self, from: A, to: A, amount: u128) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`. Spending one's own
    /// balance needs no allowance.
    pub fn transfer_from(
        &mut self,
        spender: A,
        from: A,
        to: A,
        amount: u128,
    ) -> Result<(), TokenError> {
        // Check the balance first so the balance error wins over the allowance error.
        debit_pure(self.balance_of(from), amount)?;
        let remaining = if spender == from {
            None
        } else {
            Some(spend_allowance_pure(self.allowance(from, spender), amount)?)
        };
        self.move_balance(from, to, amount)?;
        if let Some(remaining) = remaining {
            self.allowances.insert((from, spender), remaining);
        }
        Ok(())
    }

    fn move_balance(&mut self, from: A, to: A, amount: u128) -> Result<(), TokenError> {
        if from == to {
            debit_pure(self.balance_of(from), amount)?;
            return Ok(());
        }
        let (new_from, new_to) = transfer_pure(self.balance_of(from), self.balance_of(to), amount)?;
        self.balances.insert(from, new_from);
        self.balances.insert(to, new_to);
        Ok(())
    }
}
