//! Domain errors
//!
//! Everything here is detected before any integration work starts, except
//! `WorkerPanicked`, which surfaces a crashed shared-memory worker.

use thiserror::Error;

/// Errors raised while validating an integration request or running workers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    /// Fewer positional arguments than the variant needs
    #[error("Not enough arguments passed: {received} (expected {expected})")]
    InsufficientArguments { received: usize, expected: usize },

    /// `a`, `b` or the thread count did not parse completely
    #[error("Invalid {position} argument: {value}. Please enter a number.")]
    InvalidNumericArgument {
        position: &'static str,
        value: String,
    },

    /// Shared-memory variant requires `N mod W == 0`
    #[error(
        "The number of trapezoids (N = {subdivisions}) \
         must be divisible by the number of threads ({workers})."
    )]
    IndivisibleWorkload { subdivisions: usize, workers: usize },

    #[error("The number of trapezoids must be greater than 0")]
    ZeroSubdivisions,

    #[error("The number of workers must be greater than 0")]
    ZeroWorkers,

    #[error("Worker {worker} panicked before producing its partial result")]
    WorkerPanicked { worker: usize },
}
