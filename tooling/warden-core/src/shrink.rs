use tracing::debug;

use crate::sequence::CallRecord;
use crate::EngineError;

/// Minimizes a failing call sequence.
///
/// `probe` replays a candidate from fresh state and returns the index of the
/// call that breaks the target predicate, or `None` when the candidate does
/// not reproduce. A candidate is only ever kept after the probe confirmed it,
/// so the result always reproduces. Every probe counts against `limit`.
pub struct Shrinker<F> {
    probe: F,
    limit: usize,
    replays: usize,
}

impl<F> Shrinker<F>
where
    F: FnMut(&[CallRecord]) -> Result<Option<usize>, EngineError>,
{
    pub fn new(limit: usize, probe: F) -> Self {
        Self {
            probe,
            limit,
            replays: 0,
        }
    }

    /// Number of replays spent so far.
    pub fn replays(&self) -> usize {
        self.replays
    }

    fn exhausted(&self) -> bool {
        self.replays >= self.limit
    }

    /// Shrinks `failing`, whose call at `call_index` breaks the predicate.
    ///
    /// Drops everything after the failing call, removes chunks of halving
    /// size while the failure persists, then binary-searches every raw value
    /// toward zero.
    pub fn shrink(
        &mut self,
        failing: Vec<CallRecord>,
        call_index: usize,
    ) -> Result<Vec<CallRecord>, EngineError> {
        let mut best = failing;
        best.truncate(call_index + 1);
        let before = best.len();

        best = self.remove_chunks(best)?;
        best = self.minimize_values(best)?;

        debug!(
            from = before,
            to = best.len(),
            replays = self.replays,
            "shrink finished"
        );
        Ok(best)
    }

    /// Replays `candidate`; on reproduction returns it cut after the failing call.
    fn attempt(&mut self, candidate: Vec<CallRecord>) -> Result<Option<Vec<CallRecord>>, EngineError> {
        if self.exhausted() {
            return Ok(None);
        }
        self.replays += 1;
        Ok((self.probe)(&candidate)?.map(|index| {
            debug!(len = index + 1, replays = self.replays, "shrink candidate kept");
            let mut kept = candidate;
            kept.truncate(index + 1);
            kept
        }))
    }

    fn remove_chunks(&mut self, mut best: Vec<CallRecord>) -> Result<Vec<CallRecord>, EngineError> {
        let mut chunk = (best.len().max(1) + 1) / 2;
        while chunk > 0 && best.len() > 1 && !self.exhausted() {
            let mut improved = false;
            let mut i = 0usize;
            while i < best.len() && !self.exhausted() {
                let mut trial = best.clone();
                let end = (i + chunk).min(trial.len());
                trial.drain(i..end);
                if trial.is_empty() {
                    i += chunk;
                    continue;
                }
                if let Some(kept) = self.attempt(trial)? {
                    best = kept;
                    improved = true;
                    continue;
                }
                i += chunk;
            }

            if !improved {
                if chunk == 1 {
                    break;
                }
                chunk = (chunk + 1) / 2;
            }
        }
        Ok(best)
    }

    fn minimize_values(&mut self, mut best: Vec<CallRecord>) -> Result<Vec<CallRecord>, EngineError> {
        let mut index = 0;
        while index < best.len() && !self.exhausted() {
            // slot 0 is the actor seed, slot n + 1 the n-th raw argument
            let mut slot = 0;
            while index < best.len() && slot <= best[index].args.len() && !self.exhausted() {
                best = self.minimize_slot(best, index, slot)?;
                slot += 1;
            }
            index += 1;
        }
        Ok(best)
    }

    /// Smallest value for one slot that still reproduces, found by bisection
    /// between zero and the current value.
    fn minimize_slot(
        &mut self,
        mut best: Vec<CallRecord>,
        index: usize,
        slot: usize,
    ) -> Result<Vec<CallRecord>, EngineError> {
        let (mut low, mut high) = (0u128, read_slot(&best[index], slot));
        while low < high && !self.exhausted() {
            let mid = low + (high - low) / 2;
            let mut trial = best.clone();
            write_slot(&mut trial[index], slot, mid);
            match self.attempt(trial)? {
                Some(kept) => {
                    best = kept;
                    if index >= best.len() {
                        break;
                    }
                    high = mid;
                }
                None => low = mid + 1,
            }
        }
        Ok(best)
    }
}

fn read_slot(record: &CallRecord, slot: usize) -> u128 {
    match slot {
        0 => record.actor_seed,
        n => record.arg(n - 1),
    }
}

fn write_slot(record: &mut CallRecord, slot: usize, value: u128) {
    match slot {
        0 => record.actor_seed = value,
        n => record.args[n - 1] = value,
    }
}
