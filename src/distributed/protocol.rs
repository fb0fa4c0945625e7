//! Distributed mode protocol
//!
//! Messages exchanged between rank 0 (the coordinator) and the other ranks.
//! Bodies are MessagePack (rmp-serde) so every serde attribute on the payload
//! types round-trips unchanged.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator (rank 0)            Rank i > 0
//!     |                              |
//!     |<------- HELLO(rank) ---------|
//!     |                              |
//!     |-------- REQUEST ------------>|   (broadcast, or ABORT if input invalid)
//!     |                              |
//!     |   local integral             |   local integral
//!     |                              |
//!     |<------- PARTIAL -------------|   (received in ascending rank order)
//! ```
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack message]
//! ```

use crate::config::IntegrationRequest;
use crate::integrand::BuiltinIntegrand;
use crate::reducer::PartialResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Protocol version
///
/// Coordinator and ranks must match exactly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest accepted frame body; every message here is a few hundred bytes
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Protocol message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Rank announcement (Rank → Coordinator), first message on every connection
    Hello(HelloMessage),

    /// Broadcast request (Coordinator → Rank)
    Request(RequestMessage),

    /// Rank 0 rejected its input; ranks exit without computing (Coordinator → Rank)
    Abort(AbortMessage),

    /// Local integral (Rank → Coordinator)
    Partial(PartialMessage),

    /// Rank-side failure (Rank → Coordinator)
    Error(ErrorMessage),
}

/// Hello message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    /// Protocol version
    pub protocol_version: u32,
    /// Sender's rank (1..W)
    pub rank: usize,
    /// Host name of the sender
    pub node_id: String,
}

/// Request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Protocol version
    pub protocol_version: u32,
    /// Validated request; `workers` equals the group size
    pub request: IntegrationRequest,
    /// Function every rank integrates
    pub integrand: BuiltinIntegrand,
}

/// Abort message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortMessage {
    /// Human-readable reason, as printed by rank 0
    pub reason: String,
}

/// Partial result message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialMessage {
    /// Sender's rank
    pub rank: usize,
    /// The rank's contribution
    pub partial: PartialResult,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Sender's rank
    pub rank: usize,
    /// Error description
    pub error: String,
}

/// Serialize a message to bytes with its length prefix
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg)
        .context("Failed to serialize message")?;

    let msg_len = u32::try_from(msg_bytes.len())
        .context("Message length does not fit the frame header")?;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Read a complete message from a TCP stream
pub async fn read_message(stream: &mut tokio::net::TcpStream) -> Result<Message> {
    use tokio::io::AsyncReadExt;

    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await
        .context("Failed to read message length")?;

    let msg_len = u32::from_le_bytes(len_buf) as usize;

    if msg_len > MAX_MESSAGE_SIZE {
        anyhow::bail!("Message too large: {} bytes (max {})", msg_len, MAX_MESSAGE_SIZE);
    }

    let mut msg_buf = vec![0u8; msg_len];
    stream.read_exact(&mut msg_buf).await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf)
        .context("Failed to deserialize message")?;

    Ok(msg)
}

/// Write a message to a TCP stream and flush it
pub async fn write_message(stream: &mut tokio::net::TcpStream, msg: &Message) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let framed = serialize_message(msg)?;

    stream.write_all(&framed).await
        .context("Failed to write message")?;

    stream.flush().await
        .context("Failed to flush stream")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    /// Deserialize a message from bytes
    ///
    /// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
    fn deserialize_message(buf: &[u8]) -> Result<(Message, usize)> {
        if buf.len() < 4 {
            anyhow::bail!("Buffer too small for message length (got {} bytes)", buf.len());
        }

        let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

        if buf.len() < 4 + msg_len {
            anyhow::bail!(
                "Incomplete message (need {} bytes, got {})",
                4 + msg_len,
                buf.len()
            );
        }

        let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])
            .context("Failed to deserialize message")?;

        Ok((msg, 4 + msg_len))
    }

    #[test]
    fn test_serialize_deserialize_request() {
        let request = IntegrationRequest::new(-1.0, 2.5, 1_000, 7).unwrap();
        let msg = Message::Request(RequestMessage {
            protocol_version: PROTOCOL_VERSION,
            request,
            integrand: BuiltinIntegrand::Sine,
        });

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());

        match deserialized {
            Message::Request(req) => {
                assert_eq!(req.protocol_version, PROTOCOL_VERSION);
                assert_eq!(req.request, request);
                assert_eq!(req.integrand, BuiltinIntegrand::Sine);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_partial_value_is_bit_exact() {
        let request = IntegrationRequest::new(0.0, 1.0, 10, 3).unwrap();
        let partial = PartialResult {
            partition: partition(&request, 2),
            value: 0.1 + 0.2,
            elapsed_ns: 42,
        };
        let msg = Message::Partial(PartialMessage { rank: 2, partial });

        let bytes = serialize_message(&msg).unwrap();
        match deserialize_message(&bytes).unwrap().0 {
            Message::Partial(p) => {
                assert_eq!(p.rank, 2);
                assert_eq!(p.partial.value.to_bits(), (0.1f64 + 0.2).to_bits());
                assert_eq!(p.partial.partition, partial.partition);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_incomplete_buffer() {
        let bytes = serialize_message(&Message::Abort(AbortMessage {
            reason: "Invalid first argument: abc. Please enter a number.".to_string(),
        }))
        .unwrap();

        assert!(deserialize_message(&bytes[..2]).is_err());
        assert!(deserialize_message(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_message_framing() {
        let msg = Message::Hello(HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            rank: 3,
            node_id: "node-3".to_string(),
        });
        let bytes = serialize_message(&msg).unwrap();

        assert!(bytes.len() >= 4);
        let msg_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(bytes.len(), 4 + msg_len);
    }
}
