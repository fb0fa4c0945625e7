//! Work partitioning
//!
//! Splits `[a, b]` into `W` contiguous pieces at the global resolution
//! `h = (b - a) / N`. When `N` is not a multiple of `W` the `N mod W` leftover
//! subdivisions go one each to the lowest-indexed workers, so worker `i` starts
//! after `i * (N / W) + min(i, N mod W)` subdivisions.
//!
//! ```text
//! N = 10, W = 4   base = 2, remainder = 2
//!
//!   worker:   0      1      2    3
//!   local_n:  3      3      2    2
//!           |-----|-----|----|----|
//!           a                     b
//! ```
//!
//! Boundaries are derived from a single offset function, so worker `i`'s right
//! edge and worker `i + 1`'s left edge are the same `f64`, and the last edge is
//! `b` itself rather than `a + N * h`.

use crate::config::IntegrationRequest;
use serde::{Deserialize, Serialize};

/// One worker's slice of the interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Worker index this partition belongs to
    pub worker: usize,
    /// Left edge
    pub local_a: f64,
    /// Right edge
    pub local_b: f64,
    /// Number of subdivisions in this slice (may be 0 when `N < W`)
    pub local_subdivisions: usize,
    /// Global step width `(b - a) / N`, identical for every partition
    pub step_width: f64,
    /// Global index of the first subdivision in this slice
    pub first_subdivision: usize,
}

impl Partition {
    /// True if the worker has nothing to integrate
    pub fn is_idle(&self) -> bool {
        self.local_subdivisions == 0
    }
}

/// Partition for worker `worker` of `request.workers`
///
/// The request must already be validated (`subdivisions > 0`, `workers > 0`,
/// `worker < workers`).
pub fn partition(request: &IntegrationRequest, worker: usize) -> Partition {
    let n = request.subdivisions;
    let w = request.workers;
    debug_assert!(n > 0 && w > 0 && worker < w);

    let base = n / w;
    let remainder = n % w;

    let local_subdivisions = if worker < remainder { base + 1 } else { base };
    let first_subdivision = worker * base + worker.min(remainder);

    Partition {
        worker,
        local_a: request.point(first_subdivision),
        local_b: request.point(first_subdivision + local_subdivisions),
        local_subdivisions,
        step_width: request.step_width(),
        first_subdivision,
    }
}

/// All partitions of a request, in worker-index order
pub fn partitions(request: &IntegrationRequest) -> Vec<Partition> {
    let parts: Vec<Partition> = (0..request.workers).map(|i| partition(request, i)).collect();
    tracing::debug!(
        workers = parts.len(),
        idle = parts.iter().filter(|p| p.is_idle()).count(),
        "computed partitions"
    );
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(a: f64, b: f64, n: usize, w: usize) -> IntegrationRequest {
        IntegrationRequest::new(a, b, n, w).unwrap()
    }

    fn assert_complete(req: &IntegrationRequest) {
        let parts = partitions(req);
        assert_eq!(parts.len(), req.workers);
        assert_eq!(parts[0].local_a, req.a);
        assert_eq!(parts[parts.len() - 1].local_b, req.b);

        for pair in parts.windows(2) {
            assert_eq!(pair[0].local_b, pair[1].local_a);
            assert_eq!(
                pair[0].first_subdivision + pair[0].local_subdivisions,
                pair[1].first_subdivision
            );
        }

        let total: usize = parts.iter().map(|p| p.local_subdivisions).sum();
        assert_eq!(total, req.subdivisions);

        for p in &parts {
            assert_eq!(p.step_width, req.step_width());
        }
    }

    #[test]
    fn test_even_split() {
        let req = request(0.0, 1.0, 100, 4);
        let parts = partitions(&req);
        assert!(parts.iter().all(|p| p.local_subdivisions == 25));
        assert_complete(&req);
    }

    #[test]
    fn test_remainder_goes_to_lowest_workers() {
        let req = request(0.0, 10.0, 10, 4);
        let counts: Vec<usize> = partitions(&req).iter().map(|p| p.local_subdivisions).collect();
        assert_eq!(counts, vec![3, 3, 2, 2]);

        let starts: Vec<usize> = partitions(&req).iter().map(|p| p.first_subdivision).collect();
        assert_eq!(starts, vec![0, 3, 6, 8]);
        assert_complete(&req);
    }

    #[test]
    fn test_completeness_across_shapes() {
        for &(a, b) in &[(0.0, 1.0), (-3.7, 2.2), (5.0, -1.0), (0.1, 0.3)] {
            for &n in &[1usize, 7, 100, 1_000, 99_991] {
                for &w in &[1usize, 2, 3, 4, 7, 16] {
                    assert_complete(&request(a, b, n, w));
                }
            }
        }
    }

    #[test]
    fn test_single_worker_is_whole_interval() {
        let req = request(-1.0, 3.0, 1_000, 1);
        let p = partition(&req, 0);
        assert_eq!(p.local_a, -1.0);
        assert_eq!(p.local_b, 3.0);
        assert_eq!(p.local_subdivisions, 1_000);
    }

    #[test]
    fn test_more_workers_than_subdivisions() {
        let req = request(0.0, 1.0, 3, 5);
        let parts = partitions(&req);
        let idle: Vec<bool> = parts.iter().map(|p| p.is_idle()).collect();
        assert_eq!(idle, vec![false, false, false, true, true]);
        assert_eq!(parts[3].local_a, 1.0);
        assert_eq!(parts[4].local_b, 1.0);
        assert_complete(&req);
    }
}
