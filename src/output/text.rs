//! Human-readable text output
//!
//! The two stdout lines every variant prints on success. Diagnostics never go
//! here; they go to stderr through `tracing`.

use crate::error::IntegrationError;
use std::time::Duration;

/// Result line: N as a plain integer, bounds to 2 decimals, value to 6
///
/// ```
/// use riemann::output::text::result_line;
///
/// assert_eq!(
///     result_line(100_000_000, 0.0, 1.0, 1.0 / 3.0),
///     "With n = 100000000, the approximation of the integral \
///      from point a = 0.00 to point b = 1.00 is 0.333333"
/// );
/// ```
pub fn result_line(subdivisions: usize, a: f64, b: f64, value: f64) -> String {
    format!(
        "With n = {}, the approximation of the integral \
         from point a = {:.2} to point b = {:.2} is {:.6}",
        subdivisions, a, b, value
    )
}

/// Execution time line in seconds with 6 decimals
pub fn execution_time_line(elapsed: Duration) -> String {
    format!("Execution time: {:.6} seconds", elapsed.as_secs_f64())
}

/// Print the result and execution time lines to stdout
pub fn print_results(subdivisions: usize, a: f64, b: f64, value: f64, elapsed: Duration) {
    println!("{}", result_line(subdivisions, a, b, value));
    println!("{}", execution_time_line(elapsed));
}

/// Usage line printed after an argument-count error
pub fn usage_line(program: &str, operands: &str) -> String {
    format!("Usage: {} {}", program, operands)
}

/// Message printed on stdout for a failed run
///
/// An argument-count error is followed by the usage line.
pub fn failure_lines(err: &anyhow::Error, program: &str, operands: &str) -> Vec<String> {
    let mut lines = vec![format!("{:#}", err)];
    if matches!(
        err.downcast_ref::<IntegrationError>(),
        Some(IntegrationError::InsufficientArguments { .. })
    ) {
        lines.push(usage_line(program, operands));
    }
    lines
}

/// Print [`failure_lines`] to stdout
pub fn print_failure(err: &anyhow::Error, program: &str, operands: &str) {
    for line in failure_lines(err, program, operands) {
        println!("{}", line);
    }
}
