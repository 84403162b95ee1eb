use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Options forwarded to a [`Connector`] for every connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Upper bound on the transport's own opening handshake
    pub handshake_timeout: Duration,
}

/// Something that happened on an open transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// One complete payload from the broker
    Message(Bytes),
    /// A transport error; a `Closed` event follows
    Error(ClientError),
    /// The transport is gone. Yielded once; the handle is discarded after it.
    Closed,
}

/// An open byte-message transport to the broker.
///
/// Dropping the handle terminates it without a closing handshake.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, payload: Bytes) -> Result<()>;

    /// Wait for the next event. Must be cancel-safe: the driver polls it
    /// inside `select!`.
    async fn next_event(&mut self) -> TransportEvent;

    /// Close gracefully.
    async fn close(&mut self);
}

/// Opens transports. A new transport is opened for every connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &str, options: &TransportOptions) -> Result<Box<dyn Transport>>;
}
