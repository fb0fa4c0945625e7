//! In-process coordination
//!
//! Runs the sequential and shared-memory variants. The request is validated
//! once, every worker borrows the same integrand and request, and the only
//! synchronization point is the final reduction.

use crate::config::{ExecutorKind, IntegrationRequest, ReducerKind};
use crate::error::IntegrationError;
use crate::integrand::Integrand;
use crate::partition::{partition, partitions, Partition};
use crate::reducer::{reduce_ordered, FinalResult, PartialResult, SharedAccumulator};
use crate::util::time::Timestamp;
use crate::worker::Worker;
use crate::Result;
use anyhow::Context;
use rayon::prelude::*;
use std::time::Duration;

/// Result of one in-process run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Reduced total
    pub result: FinalResult,
    /// Per-worker partials in worker-index order
    pub partials: Vec<PartialResult>,
    /// Wall time from the first worker start to the reduced total
    pub elapsed: Duration,
}

/// Integrate on the calling thread with a single worker
pub fn run_sequential<F>(request: &IntegrationRequest, integrand: &F) -> Result<RunOutcome>
where
    F: Integrand + ?Sized,
{
    let request = request.with_workers(1)?;
    let start = Timestamp::now();

    let partial = Worker::new(partition(&request, 0), integrand).run();
    let result = reduce_ordered(1, std::slice::from_ref(&partial))?;

    Ok(RunOutcome {
        result,
        partials: vec![partial],
        elapsed: start.elapsed(),
    })
}

/// Shared-memory coordinator
///
/// Construction enforces `N mod W == 0`, so an indivisible workload is
/// rejected before any thread is spawned.
#[derive(Debug, Clone)]
pub struct LocalCoordinator {
    request: IntegrationRequest,
    executor: ExecutorKind,
    reducer: ReducerKind,
    stack_size: Option<usize>,
}

impl LocalCoordinator {
    /// Create a coordinator for a validated request
    pub fn new(
        request: IntegrationRequest,
        executor: ExecutorKind,
        reducer: ReducerKind,
    ) -> std::result::Result<Self, IntegrationError> {
        request.require_even_split()?;

        Ok(Self {
            request,
            executor,
            reducer,
            stack_size: None,
        })
    }

    /// Set the stack size of every worker thread; `None` keeps the platform default
    pub fn with_stack_size(mut self, stack_size: Option<usize>) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// The request this coordinator runs
    pub fn request(&self) -> &IntegrationRequest {
        &self.request
    }

    /// Run all workers and reduce their partial results
    pub fn run<F>(&self, integrand: &F) -> Result<RunOutcome>
    where
        F: Integrand + ?Sized,
    {
        let parts = partitions(&self.request);
        let workers = self.request.workers;

        tracing::info!(
            workers,
            subdivisions = self.request.subdivisions,
            executor = ?self.executor,
            reducer = %self.reducer,
            "starting shared-memory run"
        );

        let start = Timestamp::now();

        let (partials, result) = match self.reducer {
            ReducerKind::Ordered => {
                let partials = self.execute(&parts, integrand, None)?;
                let result = reduce_ordered(workers, &partials)?;
                (partials, result)
            }
            ReducerKind::Locked => {
                let accumulator = SharedAccumulator::new();
                let partials = self.execute(&parts, integrand, Some(&accumulator))?;
                let result = accumulator.finish(workers)?;
                (partials, result)
            }
        };

        let elapsed = start.elapsed();
        tracing::info!(
            value = result.value,
            ?elapsed,
            "shared-memory run complete"
        );

        Ok(RunOutcome {
            result,
            partials,
            elapsed,
        })
    }

    /// Run one worker per partition; partials come back in worker order
    fn execute<F>(
        &self,
        parts: &[Partition],
        integrand: &F,
        accumulator: Option<&SharedAccumulator>,
    ) -> Result<Vec<PartialResult>>
    where
        F: Integrand + ?Sized,
    {
        let work = |p: &Partition| {
            let partial = Worker::new(*p, integrand).run();
            if let Some(acc) = accumulator {
                acc.add(partial.value);
            }
            partial
        };

        match self.executor {
            ExecutorKind::Threads => {
                // Workers spawned before a failed spawn are joined when the scope exits
                let joined = crossbeam::thread::scope(|s| -> Result<Vec<_>> {
                    let mut handles = Vec::with_capacity(parts.len());
                    for p in parts {
                        let work = &work;
                        let mut builder = s.builder().name(format!("riemann-worker-{}", p.worker));
                        if let Some(size) = self.stack_size {
                            builder = builder.stack_size(size);
                        }
                        let handle = builder.spawn(move |_| work(p)).with_context(|| {
                            format!("Failed to spawn worker thread {}", p.worker)
                        })?;
                        handles.push(handle);
                    }

                    Ok(handles.into_iter().map(|h| h.join()).collect())
                })
                .map_err(|_| anyhow::anyhow!("worker thread scope panicked"))??;

                joined
                    .into_iter()
                    .enumerate()
                    .map(|(worker, r)| {
                        r.map_err(|_| {
                            anyhow::Error::from(IntegrationError::WorkerPanicked { worker })
                        })
                    })
                    .collect()
            }
            ExecutorKind::Rayon => {
                let mut builder = rayon::ThreadPoolBuilder::new()
                    .num_threads(parts.len())
                    .thread_name(|i| format!("riemann-worker-{}", i));
                if let Some(size) = self.stack_size {
                    builder = builder.stack_size(size);
                }
                let pool = builder.build().context("Failed to build rayon thread pool")?;

                Ok(pool.install(|| parts.par_iter().map(work).collect::<Vec<_>>()))
            }
        }
    }
}
