use wrapped_token::WrappedToken;

use crate::actors::Actor;
use crate::env::{Environment, Revert, SutCall, SystemUnderTest};

/// The token-wrapping contract deployed at a fixed address.
///
/// Total supply is the native balance the contract holds, so value pushed in
/// out of band raises the supply without minting anything.
#[derive(Debug, Clone)]
pub struct WrappedLedger {
    address: Actor,
    token: WrappedToken<Actor>,
}

impl WrappedLedger {
    pub fn new(address: Actor) -> Self {
        Self {
            address,
            token: WrappedToken::new(),
        }
    }

    /// Sum of all wrapped balances.
    pub fn minted(&self) -> u128 {
        self.token.minted()
    }

    fn deposit(&mut self, caller: Actor, value: u128) -> Result<(), Revert> {
        self.token
            .deposit(caller, value)
            .map_err(|err| Revert::new(err.to_string()))
    }

    fn withdraw(
        &mut self,
        env: &mut dyn Environment,
        caller: Actor,
        amount: u128,
    ) -> Result<(), Revert> {
        self.token
            .withdraw(caller, amount)
            .map_err(|err| Revert::new(err.to_string()))?;
        if let Err(err) = env.transfer(self.address, caller, amount) {
            // undo the burn; re-crediting what was just debited cannot overflow
            let _ = self.token.deposit(caller, amount);
            return Err(Revert::new(err.to_string()));
        }
        Ok(())
    }
}

impl SystemUnderTest for WrappedLedger {
    fn address(&self) -> Actor {
        self.address
    }

    fn balance_of(&self, who: Actor) -> u128 {
        self.token.balance_of(who)
    }

    fn total_supply(&self, env: &dyn Environment) -> u128 {
        env.balance(self.address)
    }

    fn allowance(&self, owner: Actor, spender: Actor) -> u128 {
        self.token.allowance(owner, spender)
    }

    fn execute(
        &mut self,
        env: &mut dyn Environment,
        caller: Actor,
        call: &SutCall,
    ) -> Result<(), Revert> {
        match *call {
            SutCall::Deposit { value } | SutCall::Fallback { value } => self.deposit(caller, value),
            SutCall::Withdraw { amount } => self.withdraw(env, caller, amount),
            SutCall::Approve { spender, amount } => {
                self.token.approve(caller, spender, amount);
                Ok(())
            }
            SutCall::Transfer { to, amount } => self
                .token
                .transfer(caller, to, amount)
                .map_err(|err| Revert::new(err.to_string())),
            SutCall::TransferFrom { from, to, amount } => self
                .token
                .transfer_from(caller, from, to, amount)
                .map_err(|err| Revert::new(err.to_string())),
        }
    }
}
