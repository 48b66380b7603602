//! Ready-made wiring of the engine around the wrapped-token ledger.

use crate::actors::Actor;
use crate::env::SimEnvironment;
use crate::handler::{Handler, HandlerConfig};
use crate::invariants::{self, InvariantSet};
use crate::ledger::WrappedLedger;
use crate::runner::SequenceRunner;
use crate::{ConfigError, WardenConfig};

pub const HANDLER_ADDRESS: Actor = Actor::new(0x4a4e_d1e5);
pub const WRAPPED_TOKEN_ADDRESS: Actor = Actor::new(0x0ee7_0ee7);

/// Fresh simulated environment, freshly deployed ledger and a funded handler.
pub fn wrapped_token_handler(config: &HandlerConfig) -> Handler<SimEnvironment, WrappedLedger> {
    Handler::new(
        HANDLER_ADDRESS,
        SimEnvironment::new(),
        WrappedLedger::new(WRAPPED_TOKEN_ADDRESS),
        config.clone(),
    )
}

/// Resolves the named built-in predicates, in order.
pub fn wrapped_token_invariants(
    names: &[String],
) -> Result<InvariantSet<SimEnvironment, WrappedLedger>, ConfigError> {
    names
        .iter()
        .try_fold(InvariantSet::new(), |set, name| Ok(set.with(invariants::by_name(name)?)))
}

/// Builds a runner for the wrapped ledger from a full campaign configuration.
pub fn wrapped_token_runner(
    config: &WardenConfig,
) -> Result<
    SequenceRunner<SimEnvironment, WrappedLedger, impl Fn() -> Handler<SimEnvironment, WrappedLedger>>,
    ConfigError,
> {
    config.handler.validate()?;
    let invariants = wrapped_token_invariants(&config.invariants)?;
    let handler_config = config.handler.clone();
    SequenceRunner::new(
        config.fuzz.clone(),
        move || wrapped_token_handler(&handler_config),
        invariants,
    )
}
