use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, RngCore, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::env::{Environment, SystemUnderTest};
use crate::handler::{ExecutedCall, Handler};
use crate::invariants::InvariantSet;
use crate::report::{FailureReport, FuzzSummary, ReportSink, ReportedCall};
use crate::sequence::{ActionKind, CallGenerator, CallRecord};
use crate::shrink::Shrinker;
use crate::{ConfigError, EngineError};

// ── Configuration ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FuzzConfig {
    /// Independent sequences per campaign.
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Calls per sequence.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Campaign seed. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_shrink")]
    pub shrink: bool,
    /// Replays the shrinker may spend on one failure.
    #[serde(default = "default_shrink_run_limit")]
    pub shrink_run_limit: usize,
    /// Regex allow-list over action names. Empty means every action.
    #[serde(default)]
    pub target_actions: Vec<String>,
}

fn default_runs() -> usize {
    64
}

fn default_depth() -> usize {
    32
}

fn default_shrink() -> bool {
    true
}

fn default_shrink_run_limit() -> usize {
    5_000
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            depth: default_depth(),
            seed: None,
            shrink: default_shrink(),
            shrink_run_limit: default_shrink_run_limit(),
            target_actions: Vec::new(),
        }
    }
}

/// Resolves the allow-list patterns into the actions they match.
pub fn target_actions(patterns: &[String]) -> Result<Vec<ActionKind>, ConfigError> {
    if patterns.is_empty() {
        return Ok(ActionKind::ALL.to_vec());
    }
    let compiled = patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidActionPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let actions: Vec<ActionKind> = ActionKind::ALL
        .into_iter()
        .filter(|action| compiled.iter().any(|re| re.is_match(action.name())))
        .collect();
    if actions.is_empty() {
        return Err(ConfigError::NoTargetActions(patterns.to_vec()));
    }
    Ok(actions)
}

// ── Replay results ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub predicate: String,
    /// `None` when the predicate already fails right after setup.
    pub call_index: Option<usize>,
}

/// Result of re-executing a fixed list of records on fresh state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// Calls executed up to and including the violating one.
    pub executed: Vec<ExecutedCall>,
    pub violation: Option<Violation>,
}

impl Replay {
    pub fn reproduces(&self, predicate: &str) -> bool {
        self.violation
            .as_ref()
            .is_some_and(|v| v.predicate == predicate && v.call_index.is_some())
    }

    /// Whether this replay breaks `report`'s predicate at the same point,
    /// including reports of invariants that already fail after setup.
    pub fn reproduces_report(&self, report: &FailureReport) -> bool {
        self.violation
            .as_ref()
            .is_some_and(|v| v.predicate == report.predicate && v.call_index == report.call_index)
    }
}

// ── SequenceRunner ──────────────────────────────────────────────────────────────

/// Drives random call sequences through fresh handlers and checks the
/// invariants after setup and after every call.
///
/// Each run builds its own handler through `setup`; nothing is shared between
/// runs, so any run or replay is a pure function of its records.
pub struct SequenceRunner<E, S, F> {
    config: FuzzConfig,
    setup: F,
    invariants: InvariantSet<E, S>,
    actions: Vec<ActionKind>,
}

impl<E, S, F> SequenceRunner<E, S, F>
where
    E: Environment + Clone,
    S: SystemUnderTest + Clone,
    F: Fn() -> Handler<E, S>,
{
    pub fn new(
        config: FuzzConfig,
        setup: F,
        invariants: InvariantSet<E, S>,
    ) -> Result<Self, ConfigError> {
        let actions = target_actions(&config.target_actions)?;
        Ok(Self {
            config,
            setup,
            invariants,
            actions,
        })
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    pub fn actions(&self) -> &[ActionKind] {
        &self.actions
    }

    pub fn invariants(&self) -> &InvariantSet<E, S> {
        &self.invariants
    }

    /// Runs the whole campaign, handing each confirmed failure to `sink`.
    ///
    /// Reverted calls are ordinary outcomes. Any other handler error aborts
    /// the campaign. A broken predicate is retired: it is reported once and
    /// not checked again.
    pub fn run(&self, sink: &mut dyn ReportSink) -> Result<FuzzSummary, EngineError> {
        let seed = self.config.seed.unwrap_or_else(|| OsRng.next_u64());
        let mut summary = FuzzSummary {
            seed,
            invariants: self.invariants.names().map(str::to_string).collect(),
            ..FuzzSummary::default()
        };
        let mut retired: HashSet<String> = HashSet::new();

        info!(
            seed,
            runs = self.config.runs,
            depth = self.config.depth,
            actions = self.actions.len(),
            invariants = self.invariants.len(),
            "starting campaign"
        );

        let initial = (self.setup)();
        while let Some(predicate) = self.invariants.first_violation(&initial.view(), &retired) {
            warn!(predicate, "invariant broken right after setup");
            let report = FailureReport {
                predicate: predicate.to_string(),
                run_index: 0,
                call_index: None,
                original_length: 0,
                sequence: Vec::new(),
            };
            sink.report(&report);
            summary.failures.push(report);
            retired.insert(predicate.to_string());
        }
        let generator = CallGenerator::new(self.actions.clone(), initial.config().sender_pool);

        for run in 0..self.config.runs {
            if !self.invariants.is_empty() && retired.len() >= self.invariants.len() {
                debug!("every invariant is broken, stopping early");
                break;
            }
            summary.runs += 1;

            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            rng.set_stream(run as u64);
            let mut handler = (self.setup)();
            let mut records = Vec::with_capacity(self.config.depth);

            for _ in 0..self.config.depth {
                let record = generator.next_record(&mut rng);
                let call = handler.dispatch(&record)?;
                summary.record(&call);
                records.push(record);

                let broken = self
                    .invariants
                    .first_violation(&handler.view(), &retired)
                    .map(str::to_string);
                if let Some(predicate) = broken {
                    warn!(
                        predicate = %predicate,
                        run,
                        call = records.len() - 1,
                        "invariant violated"
                    );
                    let report = self.failure_report(run, &predicate, records)?;
                    sink.report(&report);
                    summary.failures.push(report);
                    retired.insert(predicate);
                    break;
                }
            }
        }

        info!(
            runs = summary.runs,
            calls = summary.calls,
            reverts = summary.reverts,
            failures = summary.failures.len(),
            "campaign finished"
        );
        Ok(summary)
    }

    /// Re-executes `records` on a fresh handler, stopping at the first
    /// violation. With `target` only that predicate is checked.
    pub fn replay(&self, records: &[CallRecord], target: Option<&str>) -> Result<Replay, EngineError> {
        let mut handler = (self.setup)();
        let mut executed = Vec::with_capacity(records.len());

        if let Some(predicate) = self.broken(&handler, target) {
            return Ok(Replay {
                executed,
                violation: Some(Violation {
                    predicate,
                    call_index: None,
                }),
            });
        }
        for (index, record) in records.iter().enumerate() {
            executed.push(handler.dispatch(record)?);
            if let Some(predicate) = self.broken(&handler, target) {
                return Ok(Replay {
                    executed,
                    violation: Some(Violation {
                        predicate,
                        call_index: Some(index),
                    }),
                });
            }
        }
        Ok(Replay {
            executed,
            violation: None,
        })
    }

    fn broken(&self, handler: &Handler<E, S>, target: Option<&str>) -> Option<String> {
        let view = handler.view();
        match target {
            Some(name) => (self.invariants.check_one(name, &view) == Some(false))
                .then(|| name.to_string()),
            None => self
                .invariants
                .first_violation(&view, &HashSet::new())
                .map(str::to_string),
        }
    }

    /// Shrinks a failing run and builds its report from a verifying replay.
    fn failure_report(
        &self,
        run_index: usize,
        predicate: &str,
        records: Vec<CallRecord>,
    ) -> Result<FailureReport, EngineError> {
        let original_length = records.len();

        let candidate = if self.config.shrink {
            let mut shrinker = Shrinker::new(self.config.shrink_run_limit, |trial: &[CallRecord]| {
                let replay = self.replay(trial, Some(predicate))?;
                Ok(replay.violation.and_then(|v| v.call_index))
            });
            shrinker.shrink(records.clone(), original_length - 1)?
        } else {
            records.clone()
        };

        let verified = self.replay(&candidate, Some(predicate))?;
        let (mut sequence, replay) = if verified.reproduces(predicate) {
            (candidate, verified)
        } else {
            warn!(predicate, "shrunk sequence does not reproduce, reporting it unshrunk");
            let original = self.replay(&records, Some(predicate))?;
            (records, original)
        };

        let call_index = replay.violation.and_then(|v| v.call_index);
        sequence.truncate(replay.executed.len());
        Ok(FailureReport {
            predicate: predicate.to_string(),
            run_index,
            call_index,
            original_length,
            sequence: sequence
                .into_iter()
                .zip(replay.executed)
                .map(|(record, call)| ReportedCall { record, call })
                .collect(),
        })
    }
}
