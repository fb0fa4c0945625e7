//! Riemann - Parallel trapezoidal integration
//!
//! Approximates the definite integral of a fixed function over `[a, b]` with the
//! composite trapezoidal rule, splitting a very large trapezoid count across
//! workers and summing their partial results.
//!
//! # Architecture
//!
//! - **Partitioner**: contiguous, gap-free slices of the global grid, one per worker
//! - **Local integrator**: trapezoidal sum over one slice at the global step width
//! - **Reducer**: ordered point-to-point sum or a mutex-guarded shared accumulator
//! - **Variants**: sequential, shared-memory threads, and distributed processes
//!   over TCP

pub mod config;
pub mod coordinator;
pub mod distributed;
pub mod error;
pub mod integrand;
pub mod output;
pub mod partition;
pub mod reducer;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::{Config, IntegrationRequest};
pub use error::IntegrationError;
pub use integrand::{BuiltinIntegrand, Integrand};

/// Result type used throughout riemann
pub type Result<T> = anyhow::Result<T>;
