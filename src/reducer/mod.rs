//! Reduction of partial results
//!
//! Two interchangeable strategies fold per-worker partials into one total:
//!
//! - [`OrderedReducer`]: the coordinating context owns the running sum and adds
//!   contributions one at a time in a fixed (ascending worker) order. Used by the
//!   distributed coordinator and the default shared-memory path.
//! - [`SharedAccumulator`]: every worker adds its own value into a single
//!   mutex-guarded sum as soon as it finishes. The critical section is one
//!   floating-point addition.
//!
//! Both count contributions, so a missing or doubled partial is an error rather
//! than a silently wrong total.

use crate::partition::Partition;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One worker's contribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    /// Slice this value was computed over
    pub partition: Partition,
    /// Trapezoidal area over the slice
    pub value: f64,
    /// Time spent computing (nanoseconds)
    pub elapsed_ns: u64,
}

/// Reduced total of all partial results
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    /// Integral approximation
    pub value: f64,
    /// Number of partial results folded in
    pub contributions: usize,
}

/// Point-to-point style reducer
///
/// Accepts each worker index exactly once. Callers decide the order; both the
/// distributed coordinator and the shared-memory path feed ascending indices
/// so rounding is reproducible run to run.
#[derive(Debug)]
pub struct OrderedReducer {
    sum: f64,
    received: Vec<bool>,
    contributions: usize,
}

impl OrderedReducer {
    /// Create a reducer expecting `workers` contributions
    pub fn new(workers: usize) -> Self {
        Self {
            sum: 0.0,
            received: vec![false; workers],
            contributions: 0,
        }
    }

    /// Create a reducer already holding the coordinator's own partial
    pub fn with_own(workers: usize, own: &PartialResult) -> Result<Self> {
        let mut reducer = Self::new(workers);
        reducer.add(own.partition.worker, own.value)?;
        Ok(reducer)
    }

    /// Add worker `worker`'s value
    pub fn add(&mut self, worker: usize, value: f64) -> Result<()> {
        match self.received.get_mut(worker) {
            None => anyhow::bail!(
                "partial result from worker {} but only {} workers exist",
                worker,
                self.received.len()
            ),
            Some(true) => anyhow::bail!("duplicate partial result from worker {}", worker),
            Some(seen) => *seen = true,
        }

        self.sum += value;
        self.contributions += 1;
        Ok(())
    }

    /// Number of contributions received so far
    pub fn contributions(&self) -> usize {
        self.contributions
    }

    /// Finish the reduction; every worker must have contributed
    pub fn finish(self) -> Result<FinalResult> {
        if let Some(missing) = self.received.iter().position(|seen| !seen) {
            anyhow::bail!(
                "missing partial result from worker {} ({} of {} received)",
                missing,
                self.contributions,
                self.received.len()
            );
        }

        Ok(FinalResult {
            value: self.sum,
            contributions: self.contributions,
        })
    }
}

/// Fold partials in the order given
pub fn reduce_ordered(workers: usize, partials: &[PartialResult]) -> Result<FinalResult> {
    let mut reducer = OrderedReducer::new(workers);
    for partial in partials {
        reducer.add(partial.partition.worker, partial.value)?;
    }
    reducer.finish()
}

#[derive(Debug, Default)]
struct Accumulation {
    sum: f64,
    contributions: usize,
}

/// Mutex-guarded accumulator shared by reference with every worker
///
/// Lives only as long as one computation.
#[derive(Debug, Default)]
pub struct SharedAccumulator {
    state: Mutex<Accumulation>,
}

impl SharedAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one contribution
    pub fn add(&self, value: f64) {
        // A poisoned lock still holds a consistent sum: the guarded section
        // cannot panic between the two updates.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sum += value;
        state.contributions += 1;
    }

    /// Consume the accumulator; `expected` contributions must have arrived
    pub fn finish(self, expected: usize) -> Result<FinalResult> {
        let state = self.state.into_inner().unwrap_or_else(|e| e.into_inner());
        if state.contributions != expected {
            anyhow::bail!(
                "accumulator received {} contributions, expected {}",
                state.contributions,
                expected
            );
        }

        Ok(FinalResult {
            value: state.sum,
            contributions: state.contributions,
        })
    }
}
