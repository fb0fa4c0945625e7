//! Distributed mode implementation
//!
//! Integration across cooperating processes that share nothing but TCP
//! connections to rank 0.
//!
//! # Architecture
//!
//! - **Coordinator** (rank 0): reads and validates the input, broadcasts the
//!   request, computes its own slice, and receives every other partial
//!   point-to-point in ascending rank order
//! - **Node Service** (rank 1..W): computes exactly one slice and sends it back
//! - **Launcher**: spawns ranks 1..W as local child processes
//!
//! # Modules
//!
//! - `protocol`: Message definitions and framing
//! - `coordinator`: Rank 0
//! - `node_service`: Ranks > 0
//! - `launcher`: Local process-group launcher

pub mod coordinator;
pub mod launcher;
pub mod node_service;
pub mod protocol;

// Re-export key types
pub use protocol::{
    AbortMessage,
    ErrorMessage,
    HelloMessage,
    Message,
    PartialMessage,
    RequestMessage,
    PROTOCOL_VERSION,
};

pub use coordinator::{DistributedCoordinator, DistributedOutcome};
pub use launcher::RankGroup;
pub use node_service::{NodeOutcome, NodeService};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntegrationRequest;
    use crate::coordinator::run_sequential;
    use crate::error::IntegrationError;
    use crate::integrand::BuiltinIntegrand;
    use approx::assert_relative_eq;
    use std::time::Duration;
    use tokio::net::TcpStream;

    const TIMEOUT: Duration = Duration::from_secs(10);

    /// Run a whole group in this process over loopback
    async fn run_group(
        world_size: usize,
        input: Result<IntegrationRequest, IntegrationError>,
        integrand: BuiltinIntegrand,
    ) -> (anyhow::Result<DistributedOutcome>, Vec<anyhow::Result<NodeOutcome>>) {
        let coordinator = DistributedCoordinator::bind("127.0.0.1:0", world_size).await.unwrap();
        let addr = coordinator.local_addr().unwrap().to_string();

        let nodes: Vec<_> = (1..world_size)
            .map(|rank| {
                let service = NodeService::new(rank, world_size, addr.clone(), TIMEOUT).unwrap();
                tokio::spawn(service.run())
            })
            .collect();

        let outcome = coordinator.run(input, integrand).await;

        let mut node_outcomes = Vec::new();
        for node in nodes {
            node_outcomes.push(node.await.unwrap());
        }
        (outcome, node_outcomes)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_count_invariance() {
        let n = 100_000;
        let reference = run_sequential(
            &IntegrationRequest::new(-1.0, 2.0, n, 1).unwrap(),
            &BuiltinIntegrand::DoubleCube,
        )
        .unwrap()
        .result
        .value;

        for w in [1usize, 2, 4, 7, 16] {
            let request = IntegrationRequest::new(-1.0, 2.0, n, w).unwrap();
            let (outcome, nodes) = run_group(w, Ok(request), BuiltinIntegrand::DoubleCube).await;
            let outcome = outcome.unwrap();

            assert_eq!(outcome.result.contributions, w);
            assert_eq!(outcome.partials.len(), w);
            for (rank, p) in outcome.partials.iter().enumerate() {
                assert_eq!(p.partition.worker, rank);
            }
            assert_relative_eq!(outcome.result.value, reference, max_relative = 1e-9);

            for node in nodes {
                assert!(matches!(node.unwrap(), NodeOutcome::Completed(_)));
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_rank_matches_sequential_exactly() {
        let request = IntegrationRequest::new(0.0, 1.0, 10_000, 1).unwrap();
        let sequential = run_sequential(&request, &BuiltinIntegrand::Square).unwrap().result.value;

        let (outcome, nodes) = run_group(1, Ok(request), BuiltinIntegrand::Square).await;
        assert!(nodes.is_empty());
        assert_eq!(outcome.unwrap().result.value, sequential);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_more_ranks_than_trapezoids() {
        let request = IntegrationRequest::new(0.0, 1.0, 3, 5).unwrap();
        let (outcome, _) = run_group(5, Ok(request), BuiltinIntegrand::Square).await;
        let outcome = outcome.unwrap();

        assert_eq!(outcome.result.contributions, 5);
        assert_eq!(outcome.partials[4].value, 0.0);
        // h = 1/3; trapezoids over x^2 at 0, 1/3, 2/3, 1
        assert_relative_eq!(outcome.result.value, 19.0 / 54.0, epsilon = 1e-12);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_invalid_input_aborts_every_rank() {
        let input = Err(IntegrationError::InvalidNumericArgument {
            position: "first",
            value: "abc".to_string(),
        });
        let (outcome, nodes) = run_group(3, input, BuiltinIntegrand::Square).await;

        let err = outcome.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IntegrationError>(),
            Some(IntegrationError::InvalidNumericArgument { .. })
        ));
        assert_eq!(nodes.len(), 2);
        for node in nodes {
            match node.unwrap() {
                NodeOutcome::Aborted(reason) => assert!(reason.contains("abc")),
                other => panic!("expected abort, got {:?}", other),
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_group_size_mismatch_rejected() {
        let request = IntegrationRequest::new(0.0, 1.0, 100, 4).unwrap();
        let coordinator = DistributedCoordinator::bind("127.0.0.1:0", 1).await.unwrap();
        assert!(coordinator.run(Ok(request), BuiltinIntegrand::Square).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_version_mismatch_rejected() {
        let coordinator = DistributedCoordinator::bind("127.0.0.1:0", 2).await.unwrap();
        let addr = coordinator.local_addr().unwrap();

        let rogue = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            protocol::write_message(
                &mut stream,
                &Message::Hello(HelloMessage {
                    protocol_version: PROTOCOL_VERSION + 1,
                    rank: 1,
                    node_id: "rogue".to_string(),
                }),
            )
            .await
            .unwrap();
            protocol::read_message(&mut stream).await.unwrap()
        });

        let request = IntegrationRequest::new(0.0, 1.0, 100, 2).unwrap();
        let err = coordinator
            .run(Ok(request), BuiltinIntegrand::Square)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("protocol version"));
        assert!(matches!(rogue.await.unwrap(), Message::Abort(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_out_of_range_rank_rejected() {
        let coordinator = DistributedCoordinator::bind("127.0.0.1:0", 2).await.unwrap();
        let addr = coordinator.local_addr().unwrap();

        tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let _ = protocol::write_message(
                &mut stream,
                &Message::Hello(HelloMessage {
                    protocol_version: PROTOCOL_VERSION,
                    rank: 5,
                    node_id: "stray".to_string(),
                }),
            )
            .await;
            let _ = protocol::read_message(&mut stream).await;
        });

        let request = IntegrationRequest::new(0.0, 1.0, 100, 2).unwrap();
        let err = coordinator
            .run(Ok(request), BuiltinIntegrand::Square)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rank 5"));
    }

    #[tokio::test]
    async fn test_node_gives_up_after_connect_timeout() {
        // Bind then drop to get a port nobody is listening on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let service = NodeService::new(1, 2, addr.to_string(), Duration::from_millis(200)).unwrap();
        assert!(service.run().await.is_err());
    }

    #[test]
    fn test_node_rank_bounds() {
        assert!(NodeService::new(0, 4, "127.0.0.1:1", TIMEOUT).is_err());
        assert!(NodeService::new(4, 4, "127.0.0.1:1", TIMEOUT).is_err());
        assert!(NodeService::new(3, 4, "127.0.0.1:1", TIMEOUT).is_ok());
    }
}
