use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::actors::{Actor, ActorRegistry, MAX_SENDER_POOL};
use crate::bound::bound;
use crate::env::{Environment, SutCall, SystemUnderTest};
use crate::ghost::{self, GhostState};
use crate::invariants::InvariantView;
use crate::sequence::{ActionKind, CallRecord};
use crate::{ConfigError, EngineError};

/// One whole token in base units.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

// ── Configuration ───────────────────────────────────────────────────────────────

/// How an action finds the identity it acts for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorPolicy {
    /// Take the identity handed in by the fuzzer (the caller, or a caller-pool
    /// address for counterparties) and register it.
    Capture,
    /// Pick an already registered actor by seed. An empty registry falls back
    /// to `Capture`.
    Registered,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ActionPolicy {
    pub actor: ActorPolicy,
    pub counterparty: ActorPolicy,
}

impl ActionPolicy {
    pub const fn new(actor: ActorPolicy, counterparty: ActorPolicy) -> Self {
        Self {
            actor,
            counterparty,
        }
    }
}

/// Identity policy of every action that acts for an actor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ActionPolicies {
    pub deposit: ActionPolicy,
    pub withdraw: ActionPolicy,
    pub send_fallback: ActionPolicy,
    pub approve: ActionPolicy,
    pub transfer: ActionPolicy,
    pub transfer_from: ActionPolicy,
}

impl Default for ActionPolicies {
    fn default() -> Self {
        use ActorPolicy::{Capture, Registered};
        Self {
            deposit: ActionPolicy::new(Capture, Capture),
            withdraw: ActionPolicy::new(Registered, Registered),
            send_fallback: ActionPolicy::new(Capture, Capture),
            approve: ActionPolicy::new(Registered, Registered),
            transfer: ActionPolicy::new(Registered, Capture),
            transfer_from: ActionPolicy::new(Registered, Registered),
        }
    }
}

impl ActionPolicies {
    pub fn get(&self, action: ActionKind) -> ActionPolicy {
        match action {
            ActionKind::Deposit => self.deposit,
            ActionKind::Withdraw => self.withdraw,
            ActionKind::SendFallback => self.send_fallback,
            ActionKind::Approve => self.approve,
            ActionKind::Transfer => self.transfer,
            ActionKind::TransferFrom => self.transfer_from,
            // the handler injects with its own funds
            ActionKind::ForceInject => ActionPolicy::new(ActorPolicy::Capture, ActorPolicy::Capture),
        }
    }

    /// Applies the same policy to every action.
    pub fn uniform(policy: ActionPolicy) -> Self {
        Self {
            deposit: policy,
            withdraw: policy,
            send_fallback: policy,
            approve: policy,
            transfer: policy,
            transfer_from: policy,
        }
    }
}

/// Where withdrawn native value ends up. Both variants bound the amount by
/// the acting actor's wrapped balance.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawPolicy {
    /// The actor keeps the withdrawn value.
    ToActor,
    /// The actor withdraws, then pays the value back to the handler so it can
    /// fund later deposits.
    #[default]
    ForwardToHandler,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HandlerConfig {
    /// Native funds of the handler at setup, in whole tokens.
    #[serde(default = "default_initial_funds")]
    pub initial_funds: u64,
    /// Size of the fuzzer's caller pool.
    #[serde(default = "default_sender_pool")]
    pub sender_pool: usize,
    #[serde(default)]
    pub withdraw: WithdrawPolicy,
    /// Count value received through the fallback path into the deposit sum.
    #[serde(default = "default_true")]
    pub ghost_tracks_fallback: bool,
    #[serde(default)]
    pub policies: ActionPolicies,
}

fn default_initial_funds() -> u64 {
    120_500_000
}

fn default_sender_pool() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            initial_funds: default_initial_funds(),
            sender_pool: default_sender_pool(),
            withdraw: WithdrawPolicy::default(),
            ghost_tracks_fallback: true,
            policies: ActionPolicies::default(),
        }
    }
}

impl HandlerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sender_pool == 0 || self.sender_pool > MAX_SENDER_POOL {
            return Err(ConfigError::InvalidSenderPool {
                got: self.sender_pool,
                max: MAX_SENDER_POOL,
            });
        }
        Ok(())
    }

    /// Initial handler funds in base units.
    pub fn funding(&self) -> u128 {
        self.initial_funds as u128 * UNIT
    }
}

// ── Call results ────────────────────────────────────────────────────────────────

/// Caller identity and actor seed supplied by the fuzzer for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub sender: Actor,
    pub actor_seed: u128,
}

impl Origin {
    pub fn new(sender: Actor, actor_seed: u128) -> Self {
        Self { sender, actor_seed }
    }
}

/// A concrete argument after identity resolution and bounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallArg {
    Actor(Actor),
    Amount(u128),
    Flag(bool),
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Actor(actor) => write!(f, "{actor}"),
            CallArg::Amount(amount) => write!(f, "{amount}"),
            CallArg::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    Reverted { reason: String },
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success)
    }
}

/// What the handler actually executed for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedCall {
    pub sender: Actor,
    pub actor: Actor,
    pub action: ActionKind,
    pub args: Vec<CallArg>,
    pub outcome: CallOutcome,
}

impl fmt::Display for ExecutedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as {}(", self.actor, self.action)?;
        for (i, (name, arg)) in self
            .action
            .parameters()
            .iter()
            .zip(&self.args)
            .enumerate()
        {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={arg}")?;
        }
        f.write_str(")")?;
        if let CallOutcome::Reverted { reason } = &self.outcome {
            write!(f, " [reverted: {reason}]")?;
        }
        Ok(())
    }
}

// ── Handler ─────────────────────────────────────────────────────────────────────

/// The only door between the fuzzer and the system under test.
///
/// Each action resolves its acting identity, bounds its arguments against
/// live state, funds the actor when needed, executes as that actor and
/// updates the ghost counters. A reverted action is rolled back entirely:
/// no balance, registry or ghost change survives it.
#[derive(Debug, Clone)]
pub struct Handler<E, S> {
    address: Actor,
    env: E,
    sut: S,
    actors: ActorRegistry,
    ghost: GhostState,
    config: HandlerConfig,
}

impl<E, S> Handler<E, S>
where
    E: Environment + Clone,
    S: SystemUnderTest + Clone,
{
    /// Funds the handler at `address` and takes ownership of the environment
    /// and the system under test.
    pub fn new(address: Actor, mut env: E, sut: S, config: HandlerConfig) -> Self {
        env.set_balance(address, config.funding());
        Self {
            address,
            env,
            sut,
            actors: ActorRegistry::new(),
            ghost: GhostState::new(),
            config,
        }
    }

    pub fn address(&self) -> Actor {
        self.address
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn sut(&self) -> &S {
        &self.sut
    }

    pub fn actors(&self) -> &ActorRegistry {
        &self.actors
    }

    pub fn ghost(&self) -> &GhostState {
        &self.ghost
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn view(&self) -> InvariantView<'_, E, S> {
        InvariantView {
            env: &self.env,
            sut: &self.sut,
            ghost: &self.ghost,
            actors: &self.actors,
        }
    }

    /// Executes one generated record through the matching action.
    pub fn dispatch(&mut self, record: &CallRecord) -> Result<ExecutedCall, EngineError> {
        let origin = Origin::new(record.sender, record.actor_seed);
        match record.action {
            ActionKind::Deposit => self.deposit(origin, record.arg(0)),
            ActionKind::Withdraw => self.withdraw(origin, record.arg(0)),
            ActionKind::SendFallback => self.send_fallback(origin, record.arg(0)),
            ActionKind::Approve => self.approve(origin, record.arg(0), record.arg(1)),
            ActionKind::Transfer => self.transfer(origin, record.arg(0), record.arg(1)),
            ActionKind::TransferFrom => self.transfer_from(
                origin,
                record.arg(0),
                record.arg(1),
                record.arg(2) % 2 == 1,
                record.arg(3),
            ),
            ActionKind::ForceInject => self.force_inject(origin, record.arg(0)),
        }
    }

    /// Funds the actor from the handler, then deposits through `deposit`.
    pub fn deposit(&mut self, origin: Origin, amount: u128) -> Result<ExecutedCall, EngineError> {
        let actor = self.resolve_actor(ActionKind::Deposit, origin)?;
        let amount = bound(amount, 0, self.env.balance(self.address))?;

        let result = self.atomically(|h| {
            h.pay(actor, amount)?;
            h.env
                .act_as(actor, &mut h.sut, &SutCall::Deposit { value: amount })
        });
        if result.is_ok() {
            self.actors.add(actor);
            self.ghost.increment(ghost::DEPOSIT_SUM, amount);
            if amount == 0 {
                self.ghost.increment(ghost::ZERO_DEPOSITS, 1);
            }
        }
        self.finish(
            ActionKind::Deposit,
            origin,
            actor,
            vec![CallArg::Amount(amount)],
            result,
        )
    }

    /// Withdraws up to the actor's wrapped balance, routed per [`WithdrawPolicy`].
    pub fn withdraw(&mut self, origin: Origin, amount: u128) -> Result<ExecutedCall, EngineError> {
        let actor = self.resolve_actor(ActionKind::Withdraw, origin)?;
        let amount = bound(amount, 0, self.sut.balance_of(actor))?;
        let policy = self.config.withdraw;

        let result = self.atomically(|h| {
            h.env
                .act_as(actor, &mut h.sut, &SutCall::Withdraw { amount })?;
            if policy == WithdrawPolicy::ForwardToHandler {
                h.env.transfer(actor, h.address, amount)?;
            }
            Ok(())
        });
        if result.is_ok() {
            self.actors.add(actor);
            self.ghost.increment(ghost::WITHDRAW_SUM, amount);
            if amount == 0 {
                self.ghost.increment(ghost::ZERO_WITHDRAWALS, 1);
            }
        }
        self.finish(
            ActionKind::Withdraw,
            origin,
            actor,
            vec![CallArg::Amount(amount)],
            result,
        )
    }

    /// Same economics as `deposit`, through the plain value-transfer path.
    pub fn send_fallback(
        &mut self,
        origin: Origin,
        amount: u128,
    ) -> Result<ExecutedCall, EngineError> {
        let actor = self.resolve_actor(ActionKind::SendFallback, origin)?;
        let amount = bound(amount, 0, self.env.balance(self.address))?;

        let result = self.atomically(|h| {
            h.pay(actor, amount)?;
            h.env
                .act_as(actor, &mut h.sut, &SutCall::Fallback { value: amount })
        });
        if result.is_ok() {
            self.actors.add(actor);
            if self.config.ghost_tracks_fallback {
                self.ghost.increment(ghost::DEPOSIT_SUM, amount);
            }
            if amount == 0 {
                self.ghost.increment(ghost::ZERO_DEPOSITS, 1);
            }
        }
        self.finish(
            ActionKind::SendFallback,
            origin,
            actor,
            vec![CallArg::Amount(amount)],
            result,
        )
    }

    /// Approves a spender for an unbounded amount.
    pub fn approve(
        &mut self,
        origin: Origin,
        spender_seed: u128,
        amount: u128,
    ) -> Result<ExecutedCall, EngineError> {
        let actor = self.resolve_actor(ActionKind::Approve, origin)?;
        let spender = self.resolve_counterparty(ActionKind::Approve, spender_seed)?;

        let result = self.atomically(|h| {
            h.env
                .act_as(actor, &mut h.sut, &SutCall::Approve { spender, amount })
        });
        if result.is_ok() {
            self.actors.add(actor);
            self.actors.add(spender);
        }
        self.finish(
            ActionKind::Approve,
            origin,
            actor,
            vec![CallArg::Actor(spender), CallArg::Amount(amount)],
            result,
        )
    }

    /// Transfers up to the actor's balance; the destination becomes an actor.
    pub fn transfer(
        &mut self,
        origin: Origin,
        to_seed: u128,
        amount: u128,
    ) -> Result<ExecutedCall, EngineError> {
        let actor = self.resolve_actor(ActionKind::Transfer, origin)?;
        let to = self.resolve_counterparty(ActionKind::Transfer, to_seed)?;
        let amount = bound(amount, 0, self.sut.balance_of(actor))?;

        let result = self.atomically(|h| {
            h.env
                .act_as(actor, &mut h.sut, &SutCall::Transfer { to, amount })
        });
        if result.is_ok() {
            self.actors.add(actor);
            self.actors.add(to);
            if amount == 0 {
                self.ghost.increment(ghost::ZERO_TRANSFERS, 1);
            }
        }
        self.finish(
            ActionKind::Transfer,
            origin,
            actor,
            vec![CallArg::Actor(to), CallArg::Amount(amount)],
            result,
        )
    }

    /// Pulls from `from` to `to` as the actor. With `approve_first` the source
    /// approves the exact amount beforehand; otherwise the amount is bounded by
    /// the allowance already in place.
    pub fn transfer_from(
        &mut self,
        origin: Origin,
        from_seed: u128,
        to_seed: u128,
        approve_first: bool,
        amount: u128,
    ) -> Result<ExecutedCall, EngineError> {
        let actor = self.resolve_actor(ActionKind::TransferFrom, origin)?;
        let from = self.resolve_counterparty(ActionKind::TransferFrom, from_seed)?;
        let to = self.resolve_counterparty(ActionKind::TransferFrom, to_seed)?;
        let mut amount = bound(amount, 0, self.sut.balance_of(from))?;
        if !approve_first {
            amount = bound(amount, 0, self.sut.allowance(from, actor))?;
        }

        let result = self.atomically(|h| {
            if approve_first {
                h.env.act_as(
                    from,
                    &mut h.sut,
                    &SutCall::Approve {
                        spender: actor,
                        amount,
                    },
                )?;
            }
            h.env
                .act_as(actor, &mut h.sut, &SutCall::TransferFrom { from, to, amount })
        });
        if result.is_ok() {
            self.actors.add(actor);
            self.actors.add(from);
            self.actors.add(to);
            if amount == 0 {
                self.ghost.increment(ghost::ZERO_TRANSFER_FROMS, 1);
            }
        }
        self.finish(
            ActionKind::TransferFrom,
            origin,
            actor,
            vec![
                CallArg::Actor(from),
                CallArg::Actor(to),
                CallArg::Flag(approve_first),
                CallArg::Amount(amount),
            ],
            result,
        )
    }

    /// Pushes handler funds into the system under test without going through
    /// its accounting. Tracked by its own ghost sum, never the deposit sum.
    pub fn force_inject(
        &mut self,
        origin: Origin,
        amount: u128,
    ) -> Result<ExecutedCall, EngineError> {
        let amount = bound(amount, 0, self.env.balance(self.address))?;

        let result = self.atomically(|h| {
            let remaining = h.env.balance(h.address) - amount;
            h.env.set_balance(h.address, remaining);
            let target = h.sut.address();
            h.env.inject_out_of_band(amount, target);
            Ok(())
        });
        if result.is_ok() {
            self.ghost.increment(ghost::FORCE_INJECTED_SUM, amount);
        }
        let actor = self.address;
        self.finish(
            ActionKind::ForceInject,
            origin,
            actor,
            vec![CallArg::Amount(amount)],
            result,
        )
    }

    // ── internals ────────────────────────────────────────────────────────────

    fn resolve_actor(&self, action: ActionKind, origin: Origin) -> Result<Actor, EngineError> {
        match self.config.policies.get(action).actor {
            ActorPolicy::Capture => Ok(origin.sender),
            ActorPolicy::Registered => match self.actors.pick(origin.actor_seed) {
                Err(EngineError::EmptyRegistry) => {
                    debug!(%action, sender = %origin.sender, "no registered actor, acting as caller");
                    Ok(origin.sender)
                }
                picked => picked,
            },
        }
    }

    fn resolve_counterparty(&self, action: ActionKind, seed: u128) -> Result<Actor, EngineError> {
        let pool = self.config.sender_pool;
        match self.config.policies.get(action).counterparty {
            ActorPolicy::Capture => Ok(Actor::from_pool(seed, pool)),
            ActorPolicy::Registered => match self.actors.pick(seed) {
                Err(EngineError::EmptyRegistry) => Ok(Actor::from_pool(seed, pool)),
                picked => picked,
            },
        }
    }

    fn pay(&mut self, to: Actor, amount: u128) -> Result<(), EngineError> {
        self.env.transfer(self.address, to, amount)
    }

    /// Runs `body`, restoring the environment and the system under test if it fails.
    fn atomically<F>(&mut self, body: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Self) -> Result<(), EngineError>,
    {
        let env = self.env.clone();
        let sut = self.sut.clone();
        let result = body(self);
        if result.is_err() {
            self.env = env;
            self.sut = sut;
        }
        result
    }

    fn finish(
        &mut self,
        action: ActionKind,
        origin: Origin,
        actor: Actor,
        args: Vec<CallArg>,
        result: Result<(), EngineError>,
    ) -> Result<ExecutedCall, EngineError> {
        let outcome = match result {
            Ok(()) => {
                self.ghost.increment_call_count(action);
                CallOutcome::Success
            }
            Err(err) if err.is_revert() => CallOutcome::Reverted {
                reason: err.to_string(),
            },
            Err(err) => return Err(err),
        };
        let call = ExecutedCall {
            sender: origin.sender,
            actor,
            action,
            args,
            outcome,
        };
        debug!(%call, "executed");
        Ok(call)
    }
}
