//! CLI argument parsing using clap
//!
//! Positional bounds are taken as raw strings and parsed by
//! [`cli_convert`](super::cli_convert) so that missing or malformed values map
//! onto [`IntegrationError`](crate::error::IntegrationError) instead of clap's
//! own exit codes.

use clap::{ArgAction, Args, Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

/// Parse the process arguments, mapping clap's own outcomes to exit codes
///
/// `--help` and `--version` print and yield success; any other clap error is a
/// usage failure (exit 1).
pub fn parse_cli<P: Parser>() -> Result<P, ExitCode> {
    P::try_parse().map_err(|e| {
        let code = if e.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
        let _ = e.print();
        code
    })
}

/// Options shared by all three executables
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of trapezoids (default: 100000000)
    #[arg(long, value_name = "N")]
    pub subdivisions: Option<usize>,

    /// Function to integrate
    #[arg(long, value_enum)]
    pub integrand: Option<IntegrandChoice>,

    /// Write a JSON report to this path
    #[arg(long, value_name = "PATH")]
    pub json_output: Option<PathBuf>,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Sequential trapezoidal integration
#[derive(Parser, Debug)]
#[command(name = "riemann")]
#[command(version, about, long_about = None, allow_negative_numbers = true)]
pub struct SequentialCli {
    /// Lower limit a
    #[arg(value_name = "A")]
    pub a: Option<String>,

    /// Upper limit b
    #[arg(value_name = "B")]
    pub b: Option<String>,

    /// Operands past the ones this program reads are accepted and ignored
    #[arg(value_name = "EXTRA", hide = true)]
    pub extra: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Shared-memory parallel trapezoidal integration
#[derive(Parser, Debug)]
#[command(name = "riemann-threads")]
#[command(version, about, long_about = None, allow_negative_numbers = true)]
pub struct ThreadsCli {
    /// Lower limit a
    #[arg(value_name = "A")]
    pub a: Option<String>,

    /// Upper limit b
    #[arg(value_name = "B")]
    pub b: Option<String>,

    /// Number of threads; must divide the trapezoid count
    #[arg(value_name = "THREADS")]
    pub threads: Option<String>,

    /// Operands past the ones this program reads are accepted and ignored
    #[arg(value_name = "EXTRA", hide = true)]
    pub extra: Vec<String>,

    /// How partial results are combined
    #[arg(long, value_enum)]
    pub reducer: Option<ReducerChoice>,

    /// What runs the worker threads
    #[arg(long, value_enum)]
    pub executor: Option<ExecutorChoice>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Distributed trapezoidal integration across cooperating processes
///
/// Without `--rank` the process acts as launcher: it becomes rank 0 and spawns
/// ranks 1..np-1 locally.
#[derive(Parser, Debug)]
#[command(name = "riemann-dist")]
#[command(version, about, long_about = None, allow_negative_numbers = true)]
pub struct DistributedCli {
    /// Lower limit a (read by rank 0 only)
    #[arg(value_name = "A")]
    pub a: Option<String>,

    /// Upper limit b (read by rank 0 only)
    #[arg(value_name = "B")]
    pub b: Option<String>,

    /// Operands past the ones this program reads are accepted and ignored
    #[arg(value_name = "EXTRA", hide = true)]
    pub extra: Vec<String>,

    /// Number of processes in the group (default: logical CPU count)
    #[arg(short = 'n', long = "np", env = "RIEMANN_NP")]
    pub np: Option<usize>,

    /// Rank of this process; omit to launch the whole group
    #[arg(long, env = "RIEMANN_RANK")]
    pub rank: Option<usize>,

    /// Coordinator address for ranks > 0 (e.g., "10.0.1.10:9999")
    #[arg(long, env = "RIEMANN_COORDINATOR")]
    pub coordinator: Option<String>,

    /// Address rank 0 listens on (default: 0.0.0.0:9999, or loopback with an
    /// ephemeral port in launch mode)
    #[arg(long)]
    pub listen: Option<String>,

    /// How long ranks > 0 retry their initial connection (milliseconds)
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Integrand selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IntegrandChoice {
    /// f(x) = x^2
    Square,
    /// f(x) = 2x^3
    DoubleCube,
    /// f(x) = sin(x)
    Sine,
}

/// Reduction strategy selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReducerChoice {
    /// Sum partial results in ascending worker order
    Ordered,
    /// Mutex-guarded shared accumulator
    Locked,
}

/// Executor selection
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ExecutorChoice {
    /// One OS thread per worker
    Threads,
    /// Dedicated rayon thread pool
    Rayon,
}

impl DistributedCli {
    /// Validate CLI arguments that do not depend on rank 0's input
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.np == Some(0) {
            anyhow::bail!("np must be at least 1");
        }

        if let Some(rank) = self.rank {
            let np = match self.np {
                Some(np) => np,
                None => anyhow::bail!("--np is required when --rank is given"),
            };
            if rank >= np {
                anyhow::bail!("rank {} is out of range for a group of {}", rank, np);
            }
            if rank > 0 && self.coordinator.is_none() {
                anyhow::bail!("--coordinator is required for rank {}", rank);
            }
        }

        Ok(())
    }
}
