//! Distributed coordinator
//!
//! Rank 0 of a distributed run. The coordinator:
//! - Accepts one connection per rank 1..W and checks each HELLO
//! - Broadcasts the validated request (or ABORT when rank 0's input is bad)
//! - Computes its own slice
//! - Receives partials point-to-point in ascending rank order and sums them

use crate::config::IntegrationRequest;
use crate::distributed::protocol::*;
use crate::error::IntegrationError;
use crate::integrand::BuiltinIntegrand;
use crate::partition::partition;
use crate::reducer::{FinalResult, OrderedReducer, PartialResult};
use crate::util::time::Timestamp;
use crate::worker::Worker;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Result of a distributed run, as seen by rank 0
#[derive(Debug, Clone)]
pub struct DistributedOutcome {
    /// Request every rank computed against
    pub request: IntegrationRequest,
    /// Reduced total
    pub result: FinalResult,
    /// Per-rank partials in rank order
    pub partials: Vec<PartialResult>,
    /// Wall time from broadcast to the reduced total
    pub elapsed: Duration,
}

/// Distributed coordinator
///
/// Owns the listening socket for the whole group.
pub struct DistributedCoordinator {
    listener: TcpListener,
    world_size: usize,
}

impl DistributedCoordinator {
    /// Bind the coordinator for a group of `world_size` ranks (itself included)
    pub async fn bind(addr: &str, world_size: usize) -> Result<Self> {
        if world_size == 0 {
            return Err(IntegrationError::ZeroWorkers.into());
        }

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind coordinator on {}", addr))?;

        Ok(Self {
            listener,
            world_size,
        })
    }

    /// Address ranks should connect to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read coordinator address")
    }

    /// Group size, rank 0 included
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    /// Run one integration across the group
    ///
    /// `input` is rank 0's parsed request. On `Err` every rank is still
    /// accepted and sent ABORT before the error is returned, so no rank is
    /// left waiting for a broadcast that never comes.
    pub async fn run(
        self,
        input: std::result::Result<IntegrationRequest, IntegrationError>,
        integrand: BuiltinIntegrand,
    ) -> Result<DistributedOutcome> {
        let mut ranks = self.accept_ranks().await?;

        let request = match input {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "rank 0 rejected its input, aborting group");
                let abort = Message::Abort(AbortMessage {
                    reason: e.to_string(),
                });
                for stream in ranks.iter_mut() {
                    // Best effort; the error is returned either way
                    let _ = write_message(stream, &abort).await;
                }
                return Err(e.into());
            }
        };

        if request.workers != self.world_size {
            anyhow::bail!(
                "request is partitioned for {} workers but the group has {} ranks",
                request.workers,
                self.world_size
            );
        }

        let broadcast = Message::Request(RequestMessage {
            protocol_version: PROTOCOL_VERSION,
            request,
            integrand,
        });
        for (i, stream) in ranks.iter_mut().enumerate() {
            write_message(stream, &broadcast)
                .await
                .with_context(|| format!("Failed to send request to rank {}", i + 1))?;
        }
        tracing::info!(
            world_size = self.world_size,
            subdivisions = request.subdivisions,
            a = request.a,
            b = request.b,
            "request broadcast"
        );

        let start = Timestamp::now();

        let own_partition = partition(&request, 0);
        let own = tokio::task::spawn_blocking(move || Worker::new(own_partition, &integrand).run())
            .await
            .map_err(|_| anyhow::Error::from(IntegrationError::WorkerPanicked { worker: 0 }))?;

        let mut reducer = OrderedReducer::with_own(self.world_size, &own)?;
        let mut partials = Vec::with_capacity(self.world_size);
        partials.push(own);

        for (i, stream) in ranks.iter_mut().enumerate() {
            let rank = i + 1;
            let partial = receive_partial(stream, rank, &request).await?;
            reducer.add(rank, partial.value)?;
            tracing::debug!(rank, received = reducer.contributions(), "gather progress");
            partials.push(partial);
        }

        let result = reducer.finish()?;
        let elapsed = start.elapsed();

        tracing::info!(
            value = result.value,
            contributions = result.contributions,
            ?elapsed,
            "distributed run complete"
        );

        Ok(DistributedOutcome {
            request,
            result,
            partials,
            elapsed,
        })
    }

    /// Accept ranks 1..W; the returned streams are indexed by `rank - 1`
    async fn accept_ranks(&self) -> Result<Vec<TcpStream>> {
        let expected = self.world_size - 1;
        let mut slots: Vec<Option<TcpStream>> = (0..expected).map(|_| None).collect();

        tracing::info!(expected, "waiting for ranks to connect");

        for _ in 0..expected {
            let (mut stream, peer) = self
                .listener
                .accept()
                .await
                .context("Failed to accept rank connection")?;

            let hello = match read_message(&mut stream).await? {
                Message::Hello(hello) => hello,
                other => anyhow::bail!("Expected HELLO from {}, got {:?}", peer, other),
            };

            if let Err(e) = self.check_hello(&hello, &slots) {
                let abort = Message::Abort(AbortMessage {
                    reason: e.to_string(),
                });
                let _ = write_message(&mut stream, &abort).await;
                for accepted in slots.iter_mut().flatten() {
                    let _ = write_message(accepted, &abort).await;
                }
                return Err(e);
            }

            tracing::debug!(rank = hello.rank, node = %hello.node_id, %peer, "rank connected");
            slots[hello.rank - 1] = Some(stream);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.with_context(|| format!("rank {} never connected", i + 1)))
            .collect()
    }

    fn check_hello(&self, hello: &HelloMessage, slots: &[Option<TcpStream>]) -> Result<()> {
        if hello.protocol_version != PROTOCOL_VERSION {
            anyhow::bail!(
                "rank {} speaks protocol version {}, expected {}",
                hello.rank,
                hello.protocol_version,
                PROTOCOL_VERSION
            );
        }
        if hello.rank == 0 || hello.rank >= self.world_size {
            anyhow::bail!(
                "rank {} is outside 1..{} for a group of {}",
                hello.rank,
                self.world_size,
                self.world_size
            );
        }
        if slots[hello.rank - 1].is_some() {
            anyhow::bail!("rank {} connected twice", hello.rank);
        }
        Ok(())
    }
}

/// Block until `rank`'s partial arrives and check it covers the expected slice
async fn receive_partial(
    stream: &mut TcpStream,
    rank: usize,
    request: &IntegrationRequest,
) -> Result<PartialResult> {
    let msg = read_message(stream)
        .await
        .with_context(|| format!("Failed to receive partial result from rank {}", rank))?;

    match msg {
        Message::Partial(p) => {
            if p.rank != rank || p.partial.partition != partition(request, rank) {
                anyhow::bail!(
                    "rank {} returned a partial for rank {} over an unexpected slice",
                    rank,
                    p.rank
                );
            }
            tracing::debug!(rank, value = p.partial.value, "partial received");
            Ok(p.partial)
        }
        Message::Error(e) => anyhow::bail!("rank {} failed: {}", e.rank, e.error),
        other => anyhow::bail!("Expected PARTIAL from rank {}, got {:?}", rank, other),
    }
}
