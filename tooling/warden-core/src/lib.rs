//! Stateful invariant fuzzing for a token-wrapping ledger.
//!
//! A [`SequenceRunner`] drives random call sequences through a [`Handler`],
//! which bounds every argument against live state, executes the call on the
//! system under test as a chosen actor and keeps ghost accounting on the side.
//! After setup and after every call the registered invariants are evaluated;
//! a violation is shrunk to a minimal replayable sequence and reported.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod actors;
pub mod bound;
pub mod env;
pub mod ghost;
pub mod handler;
pub mod harness;
pub mod invariants;
pub mod ledger;
pub mod report;
pub mod runner;
pub mod sequence;
pub mod shrink;

#[cfg(test)]
mod tests;

pub use actors::{Actor, ActorRegistry};
pub use bound::bound;
pub use env::{Environment, Revert, SimEnvironment, SutCall, SystemUnderTest};
pub use ghost::GhostState;
pub use handler::{
    ActionPolicies, ActionPolicy, ActorPolicy, CallOutcome, ExecutedCall, Handler, HandlerConfig,
    Origin, WithdrawPolicy,
};
pub use harness::{wrapped_token_handler, wrapped_token_invariants, wrapped_token_runner};
pub use invariants::{Invariant, InvariantSet, InvariantView};
pub use ledger::WrappedLedger;
pub use report::{CallStats, FailureReport, FuzzSummary, ReportSink, ReportedCall, TracingSink};
pub use runner::{FuzzConfig, Replay, SequenceRunner, Violation};
pub use sequence::{ActionKind, CallRecord};

// ── Errors ──────────────────────────────────────────────────────────────────────

/// Failures raised while driving the system under test.
///
/// `ActionFailed` and `PaymentFailed` are ordinary fuzz outcomes: the handler
/// turns them into reverted calls. `InvalidRange` and `EmptyRegistry` point at
/// a broken action and abort the campaign.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid range: low {low} is greater than high {high}")]
    InvalidRange { low: u128, high: u128 },
    #[error("no actors registered")]
    EmptyRegistry,
    #[error("{action} failed: {reason}")]
    ActionFailed { action: String, reason: String },
    #[error("payment of {amount} from {from} to {to} failed")]
    PaymentFailed { from: Actor, to: Actor, amount: u128 },
    #[error("invariant violation: {predicate}")]
    InvariantViolation { predicate: String },
}

impl EngineError {
    /// Whether the error is an expected fuzz outcome rather than a harness bug.
    pub fn is_revert(&self) -> bool {
        matches!(
            self,
            EngineError::ActionFailed { .. } | EngineError::PaymentFailed { .. }
        )
    }
}

/// Errors resolving a [`WardenConfig`] into a runnable campaign.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown invariant '{0}'")]
    UnknownInvariant(String),
    #[error("invalid action pattern '{pattern}': {source}")]
    InvalidActionPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("no action matches the target patterns {0:?}")]
    NoTargetActions(Vec<String>),
    #[error("sender pool must hold between 1 and {max} callers, got {got}")]
    InvalidSenderPool { got: usize, max: usize },
}

// ── Configuration ───────────────────────────────────────────────────────────────

/// Top-level campaign configuration, stored in `.warden.toml`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WardenConfig {
    /// Built-in predicates to check, in order.
    #[serde(default = "default_invariants")]
    pub invariants: Vec<String>,
    #[serde(default)]
    pub fuzz: FuzzConfig,
    #[serde(default)]
    pub handler: HandlerConfig,
}

fn default_invariants() -> Vec<String> {
    vec![
        "solvency_deposits".to_string(),
        "solvency_balances".to_string(),
        "depositor_balance".to_string(),
    ]
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            invariants: default_invariants(),
            fuzz: FuzzConfig::default(),
            handler: HandlerConfig::default(),
        }
    }
}
