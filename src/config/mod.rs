//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::error::IntegrationError;
use crate::integrand::BuiltinIntegrand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Trapezoid count used when neither the CLI nor a config file sets one
pub const DEFAULT_SUBDIVISIONS: usize = 100_000_000;

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub integration: IntegrationConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub distributed: DistributedConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to integrate and at which resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Total number of trapezoids (N)
    #[serde(default = "default_subdivisions")]
    pub subdivisions: usize,
    /// Function to integrate
    #[serde(default)]
    pub integrand: BuiltinIntegrand,
}

fn default_subdivisions() -> usize {
    DEFAULT_SUBDIVISIONS
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            subdivisions: default_subdivisions(),
            integrand: BuiltinIntegrand::default(),
        }
    }
}

/// Shared-memory worker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How partial results are combined
    #[serde(default)]
    pub reducer: ReducerKind,
    /// What runs the workers
    #[serde(default)]
    pub executor: ExecutorKind,
    /// Stack size in bytes for each worker thread; platform default when unset
    #[serde(default)]
    pub stack_size: Option<usize>,
}

/// Reduction strategy for the shared-memory variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReducerKind {
    /// Partials are collected and summed in ascending worker order
    #[default]
    Ordered,
    /// Each worker adds into one mutex-guarded accumulator as it finishes
    Locked,
}

impl fmt::Display for ReducerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordered => write!(f, "ordered"),
            Self::Locked => write!(f, "locked"),
        }
    }
}

/// Execution backend for the shared-memory variant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    /// One scoped OS thread per worker
    #[default]
    Threads,
    /// A dedicated rayon pool with one thread per worker
    Rayon,
}

/// Distributed mode settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedConfig {
    /// Address rank 0 listens on when started explicitly with `--rank 0`
    #[serde(default = "default_listen")]
    pub listen: String,
    /// How long a node keeps retrying its initial connection (milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_listen() -> String {
    "0.0.0.0:9999".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    30_000
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report path
    pub json_output: Option<PathBuf>,
    /// Log verbosity (0 = warn, 1 = info, 2 = debug, 3+ = trace)
    #[serde(default)]
    pub verbosity: u8,
}

/// A validated integration request
///
/// Built once from parsed input and then only copied: to threads by reference,
/// to remote ranks by broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationRequest {
    /// Lower bound
    pub a: f64,
    /// Upper bound
    pub b: f64,
    /// Total number of trapezoids (N)
    pub subdivisions: usize,
    /// Number of workers (W)
    pub workers: usize,
}

impl IntegrationRequest {
    /// Create a request, rejecting `N == 0` and `W == 0`
    pub fn new(
        a: f64,
        b: f64,
        subdivisions: usize,
        workers: usize,
    ) -> Result<Self, IntegrationError> {
        if subdivisions == 0 {
            return Err(IntegrationError::ZeroSubdivisions);
        }
        if workers == 0 {
            return Err(IntegrationError::ZeroWorkers);
        }

        Ok(Self {
            a,
            b,
            subdivisions,
            workers,
        })
    }

    /// Global step width `h = (b - a) / N`
    #[inline]
    pub fn step_width(&self) -> f64 {
        (self.b - self.a) / self.subdivisions as f64
    }

    /// Abscissa of the `k`-th subdivision boundary; `point(N)` is exactly `b`
    #[inline]
    pub fn point(&self, k: usize) -> f64 {
        if k >= self.subdivisions {
            self.b
        } else {
            self.a + self.step_width() * k as f64
        }
    }

    /// Shared-memory variant: every thread must get the same share
    pub fn require_even_split(&self) -> Result<(), IntegrationError> {
        if self.subdivisions % self.workers != 0 {
            return Err(IntegrationError::IndivisibleWorkload {
                subdivisions: self.subdivisions,
                workers: self.workers,
            });
        }
        Ok(())
    }

    /// Same request with a different worker count
    pub fn with_workers(&self, workers: usize) -> Result<Self, IntegrationError> {
        Self::new(self.a, self.b, self.subdivisions, workers)
    }
}
