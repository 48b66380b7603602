use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::EngineError;

/// First address of the fuzzer's caller pool.
const SENDER_BASE: u64 = 0x1000_0000;

/// Largest caller pool. Keeps every sender below the fixed harness addresses.
pub const MAX_SENDER_POOL: usize = 0x0100_0000;

/// An opaque calling identity, displayed as a 20-byte hex address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(pub u64);

impl Actor {
    pub const fn new(id: u64) -> Self {
        Actor(id)
    }

    /// The `index`-th identity of the fuzzer's caller pool.
    pub const fn sender(index: u64) -> Self {
        Actor(SENDER_BASE + index)
    }

    /// Maps a raw seed onto a caller pool of `pool` identities, clamped to
    /// `1..=MAX_SENDER_POOL`.
    pub fn from_pool(seed: u128, pool: usize) -> Self {
        let pool = pool.clamp(1, MAX_SENDER_POOL) as u128;
        Actor::sender((seed % pool) as u64)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:040x}", self.0)
    }
}

// ── ActorRegistry ──────────────────────────────────────────────────────────────

/// Insertion-ordered set of actors discovered during a run.
///
/// Actors are never removed. The ordered list and the membership set always
/// hold the same actors.
#[derive(Debug, Clone, Default)]
pub struct ActorRegistry {
    ordered: Vec<Actor>,
    members: HashSet<Actor>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `actor` unless it is already present. Returns whether it was new.
    pub fn add(&mut self, actor: Actor) -> bool {
        if !self.members.insert(actor) {
            return false;
        }
        self.ordered.push(actor);
        true
    }

    pub fn contains(&self, actor: &Actor) -> bool {
        self.members.contains(actor)
    }

    pub fn count(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Deterministic selection: the actor at `seed mod count()`.
    pub fn pick(&self, seed: u128) -> Result<Actor, EngineError> {
        if self.ordered.is_empty() {
            return Err(EngineError::EmptyRegistry);
        }
        let index = seed % self.ordered.len() as u128;
        Ok(self.ordered[index as usize])
    }

    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&Actor),
    {
        for actor in &self.ordered {
            visit(actor);
        }
    }

    /// Folds `combine` over every actor in insertion order.
    pub fn reduce<T, F>(&self, initial: T, combine: F) -> T
    where
        F: FnMut(T, &Actor) -> T,
    {
        self.ordered.iter().fold(initial, combine)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.ordered.iter()
    }
}
