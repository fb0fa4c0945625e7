//! CLI to Config conversion utilities

use crate::config::cli::{ExecutorChoice, IntegrandChoice, ReducerChoice};
use crate::config::{ExecutorKind, ReducerKind};
use crate::error::IntegrationError;
use crate::integrand::BuiltinIntegrand;

/// Parse a real-valued argument, rejecting trailing garbage and non-finite values
pub fn parse_real(value: &str, position: &'static str) -> Result<f64, IntegrationError> {
    match value.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(x),
        _ => Err(IntegrationError::InvalidNumericArgument {
            position,
            value: value.to_string(),
        }),
    }
}

/// Parse the `a` and `b` positionals
///
/// `received` counts how many positionals the caller actually got, so the
/// insufficient-arguments message reports the same number regardless of which
/// one is missing.
pub fn parse_bounds(a: Option<&str>, b: Option<&str>) -> Result<(f64, f64), IntegrationError> {
    match (a, b) {
        (Some(a), Some(b)) => Ok((parse_real(a, "first")?, parse_real(b, "second")?)),
        (a, b) => Err(IntegrationError::InsufficientArguments {
            received: a.iter().count() + b.iter().count(),
            expected: 2,
        }),
    }
}

/// Parse a thread count; must be a complete integer greater than zero
pub fn parse_worker_count(value: &str) -> Result<usize, IntegrationError> {
    let count: i64 = value.parse().map_err(|_| IntegrationError::InvalidNumericArgument {
        position: "third",
        value: value.to_string(),
    })?;

    if count <= 0 {
        return Err(IntegrationError::ZeroWorkers);
    }

    usize::try_from(count).map_err(|_| IntegrationError::InvalidNumericArgument {
        position: "third",
        value: value.to_string(),
    })
}

/// Convert CLI integrand to config integrand
pub fn convert_integrand(choice: IntegrandChoice) -> BuiltinIntegrand {
    match choice {
        IntegrandChoice::Square => BuiltinIntegrand::Square,
        IntegrandChoice::DoubleCube => BuiltinIntegrand::DoubleCube,
        IntegrandChoice::Sine => BuiltinIntegrand::Sine,
    }
}

/// Convert CLI reducer to config reducer
pub fn convert_reducer(choice: ReducerChoice) -> ReducerKind {
    match choice {
        ReducerChoice::Ordered => ReducerKind::Ordered,
        ReducerChoice::Locked => ReducerKind::Locked,
    }
}

/// Convert CLI executor to config executor
pub fn convert_executor(choice: ExecutorChoice) -> ExecutorKind {
    match choice {
        ExecutorChoice::Threads => ExecutorKind::Threads,
        ExecutorChoice::Rayon => ExecutorKind::Rayon,
    }
}
