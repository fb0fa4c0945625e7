//! Worker implementation
//!
//! A worker integrates exactly one [`Partition`] and hands back one
//! [`PartialResult`]. Workers share nothing mutable; whatever runs them (scoped
//! threads, a rayon pool, or a remote rank) only collects what they return.
//!
//! # Example
//!
//! ```
//! use riemann::config::IntegrationRequest;
//! use riemann::integrand::BuiltinIntegrand;
//! use riemann::partition::partition;
//! use riemann::worker::Worker;
//!
//! let request = IntegrationRequest::new(0.0, 1.0, 1_000, 4)?;
//! let partial = Worker::new(partition(&request, 2), &BuiltinIntegrand::Square).run();
//!
//! assert_eq!(partial.partition.worker, 2);
//! assert!(partial.value > 0.0);
//! # Ok::<(), riemann::error::IntegrationError>(())
//! ```

use crate::integrand::Integrand;
use crate::partition::Partition;
use crate::reducer::PartialResult;
use crate::util::time::Timestamp;

/// Trapezoidal sum over one slice at the global step width `h`
///
/// Interior abscissae are `local_a + k * h`; `(local_b - local_a) / local_n` is
/// never used, so every worker samples on the same grid as a sequential run.
/// An empty slice contributes `0`.
pub fn local_integral<F>(f: &F, local_a: f64, local_b: f64, local_n: usize, h: f64) -> f64
where
    F: Integrand + ?Sized,
{
    if local_n == 0 {
        return 0.0;
    }

    let mut sum = 0.5 * (f.eval(local_a) + f.eval(local_b));
    for k in 1..local_n {
        sum += f.eval(local_a + k as f64 * h);
    }

    sum * h
}

/// Integrates one partition
pub struct Worker<'a, F: ?Sized> {
    partition: Partition,
    integrand: &'a F,
}

impl<'a, F> Worker<'a, F>
where
    F: Integrand + ?Sized,
{
    /// Create a worker for the given partition
    pub fn new(partition: Partition, integrand: &'a F) -> Self {
        Self {
            partition,
            integrand,
        }
    }

    /// Compute this worker's partial result
    pub fn run(&self) -> PartialResult {
        let start = Timestamp::now();
        let p = &self.partition;

        let value = local_integral(
            self.integrand,
            p.local_a,
            p.local_b,
            p.local_subdivisions,
            p.step_width,
        );

        let elapsed_ns = start.elapsed_nanos();
        tracing::debug!(
            worker = p.worker,
            local_a = p.local_a,
            local_b = p.local_b,
            local_subdivisions = p.local_subdivisions,
            value,
            elapsed_ns,
            "worker finished"
        );

        PartialResult {
            partition: *p,
            value,
            elapsed_ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntegrationRequest;
    use crate::integrand::BuiltinIntegrand;
    use crate::partition::{partition, partitions};
    use approx::assert_relative_eq;

    #[test]
    fn test_local_integral_by_hand() {
        // x^2 on [0, 3] with 3 trapezoids: 0.5*(0 + 9) + 1 + 4 = 9.5
        let f = |x: f64| x * x;
        assert_eq!(local_integral(&f, 0.0, 3.0, 3, 1.0), 9.5);
    }

    #[test]
    fn test_local_integral_empty_slice() {
        let f = |x: f64| x * x + 1.0;
        assert_eq!(local_integral(&f, 2.0, 2.0, 0, 0.1), 0.0);
    }

    #[test]
    fn test_linear_is_exact() {
        // The trapezoidal rule integrates affine functions exactly
        let f = |x: f64| 3.0 * x - 1.0;
        let value = local_integral(&f, -1.0, 2.0, 300, 0.01);
        assert_relative_eq!(value, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_worker_uses_global_step() {
        let request = IntegrationRequest::new(0.0, 1.0, 10, 4).unwrap();
        let p = partition(&request, 0);
        let partial = Worker::new(p, &BuiltinIntegrand::Square).run();

        let expected = local_integral(&BuiltinIntegrand::Square, p.local_a, p.local_b, 3, 0.1);
        assert_eq!(partial.value, expected);
        assert_eq!(partial.partition, p);
    }

    #[test]
    fn test_single_worker_matches_whole_interval() {
        let request = IntegrationRequest::new(0.0, 2.0, 10_000, 1).unwrap();
        let partial = Worker::new(partition(&request, 0), &BuiltinIntegrand::Square).run();
        let whole =
            local_integral(&BuiltinIntegrand::Square, 0.0, 2.0, 10_000, request.step_width());
        assert_eq!(partial.value, whole);
    }

    #[test]
    fn test_idle_worker_contributes_zero() {
        let request = IntegrationRequest::new(0.0, 1.0, 2, 4).unwrap();
        let parts = partitions(&request);
        let partial = Worker::new(parts[3], &BuiltinIntegrand::Square).run();
        assert_eq!(partial.value, 0.0);
    }
}
