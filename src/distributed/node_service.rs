//! Node service for distributed mode
//!
//! Runs ranks 1..W. A node:
//! - Connects to the coordinator, retrying until the connect timeout
//! - Announces its rank
//! - Waits for the broadcast request (or ABORT)
//! - Integrates its own slice and sends the partial back

use crate::distributed::protocol::*;
use crate::partition::partition;
use crate::reducer::PartialResult;
use crate::worker::Worker;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, Instant};

/// Delay between connection attempts while the coordinator is not up yet
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// How a node's run ended
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// Partial computed and delivered
    Completed(PartialResult),
    /// Rank 0 rejected its input before broadcasting
    Aborted(String),
}

/// Node service
///
/// One instance per rank > 0; consumed by [`NodeService::run`].
pub struct NodeService {
    rank: usize,
    world_size: usize,
    coordinator: String,
    connect_timeout: Duration,

    /// Node identifier (hostname)
    node_id: String,
}

impl NodeService {
    /// Create a node service for `rank` in a group of `world_size`
    pub fn new(
        rank: usize,
        world_size: usize,
        coordinator: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        if rank == 0 || rank >= world_size {
            anyhow::bail!("rank {} is outside 1..{}", rank, world_size);
        }

        Ok(Self {
            rank,
            world_size,
            coordinator: coordinator.into(),
            connect_timeout,
            node_id: get_node_id(),
        })
    }

    /// Run this rank to completion
    pub async fn run(self) -> Result<NodeOutcome> {
        let mut stream = self.connect().await?;

        write_message(
            &mut stream,
            &Message::Hello(HelloMessage {
                protocol_version: PROTOCOL_VERSION,
                rank: self.rank,
                node_id: self.node_id.clone(),
            }),
        )
        .await?;

        let request_msg = match read_message(&mut stream).await? {
            Message::Request(msg) => msg,
            Message::Abort(abort) => {
                tracing::info!(
                    rank = self.rank,
                    reason = %abort.reason,
                    "coordinator aborted the run"
                );
                return Ok(NodeOutcome::Aborted(abort.reason));
            }
            other => anyhow::bail!("Expected REQUEST, got {:?}", other),
        };

        if let Err(e) = self.check_request(&request_msg) {
            let _ = write_message(
                &mut stream,
                &Message::Error(ErrorMessage {
                    rank: self.rank,
                    error: e.to_string(),
                }),
            )
            .await;
            return Err(e);
        }

        let slice = partition(&request_msg.request, self.rank);
        let integrand = request_msg.integrand;
        let task = tokio::task::spawn_blocking(move || Worker::new(slice, &integrand).run());
        let partial = match task.await {
            Ok(partial) => partial,
            Err(e) => {
                let _ = write_message(
                    &mut stream,
                    &Message::Error(ErrorMessage {
                        rank: self.rank,
                        error: format!("worker task failed: {}", e),
                    }),
                )
                .await;
                anyhow::bail!("worker task for rank {} failed: {}", self.rank, e);
            }
        };

        write_message(
            &mut stream,
            &Message::Partial(PartialMessage {
                rank: self.rank,
                partial,
            }),
        )
        .await
        .context("Failed to send partial result")?;

        tracing::debug!(rank = self.rank, value = partial.value, "partial sent");
        Ok(NodeOutcome::Completed(partial))
    }

    /// Connect to the coordinator, retrying until the connect timeout elapses
    async fn connect(&self) -> Result<TcpStream> {
        let deadline = Instant::now() + self.connect_timeout;

        loop {
            match TcpStream::connect(&self.coordinator).await {
                Ok(stream) => {
                    tracing::debug!(rank = self.rank, coordinator = %self.coordinator, "connected");
                    return Ok(stream);
                }
                Err(e) if Instant::now() >= deadline => {
                    return Err(e).with_context(|| {
                        format!(
                            "rank {} could not reach coordinator {} within {:?}",
                            self.rank, self.coordinator, self.connect_timeout
                        )
                    });
                }
                Err(_) => sleep(CONNECT_RETRY_INTERVAL).await,
            }
        }
    }

    fn check_request(&self, msg: &RequestMessage) -> Result<()> {
        if msg.protocol_version != PROTOCOL_VERSION {
            anyhow::bail!(
                "coordinator speaks protocol version {}, expected {}",
                msg.protocol_version,
                PROTOCOL_VERSION
            );
        }
        if msg.request.workers != self.world_size {
            anyhow::bail!(
                "request is partitioned for {} workers but rank {} joined a group of {}",
                msg.request.workers,
                self.rank,
                self.world_size
            );
        }
        Ok(())
    }
}

/// Get node identifier (hostname)
pub fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
