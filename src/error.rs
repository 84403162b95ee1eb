use std::time::Duration;
use thiserror::Error;

use crate::state::ConnectionState;

/// Errors raised inside the client.
///
/// None of these reach the caller of `Client` operations: they are logged
/// where they occur and the client keeps healing itself. They are returned
/// from the lower-level building blocks (codec, transports, signers) so those
/// can be composed with `?`.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Incoming payload is not valid JSON
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),
    /// A reply decoded as JSON but its body does not match its method
    #[error("unexpected '{method}' reply: {reason}")]
    UnexpectedReply { method: String, reason: String },
    /// Outgoing command could not be serialized
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// Sending a frame over the transport failed
    #[error("send failed: {0}")]
    TransportSend(String),
    /// The broker answered with an error field
    #[error("broker error on channel {}: {error}", channel.as_deref().unwrap_or("<none>"))]
    Broker {
        channel: Option<String>,
        error: String,
    },
    /// A state change that the lifecycle does not allow
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// Transport closed unexpectedly or the peer stopped answering pings
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// The transport did not finish its handshake in time
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
    /// Signing the client token failed
    #[error("credential error: {0}")]
    Credential(String),
    /// I/O-level error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// WebSocket-level error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
