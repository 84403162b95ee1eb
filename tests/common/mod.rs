//! Shared fixtures: an in-memory transport whose far end the test plays
//! as the broker.
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use iridium_centrifugo::{ClientError, Connector, Transport, TransportEvent, TransportOptions};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Broker half of one in-memory connection.
pub struct BrokerSide {
    from_client: mpsc::UnboundedReceiver<Bytes>,
    to_client: mpsc::UnboundedSender<TransportEvent>,
}

impl BrokerSide {
    /// Next frame the client wrote, parsed as JSON. `None` once the client
    /// dropped or closed its end.
    pub async fn recv(&mut self) -> Option<Value> {
        let bytes = tokio::time::timeout(Duration::from_secs(3600), self.from_client.recv())
            .await
            .ok()??;
        Some(serde_json::from_slice(&bytes).expect("client sent invalid json"))
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        self.from_client
            .try_recv()
            .ok()
            .map(|b| serde_json::from_slice(&b).expect("client sent invalid json"))
    }

    pub fn reply(&self, value: Value) {
        let _ = self
            .to_client
            .send(TransportEvent::Message(Bytes::from(value.to_string())));
    }

    pub fn reply_raw(&self, raw: &'static [u8]) {
        let _ = self
            .to_client
            .send(TransportEvent::Message(Bytes::from_static(raw)));
    }

    pub fn reply_connected(&self) {
        self.reply(serde_json::json!({
            "uid": "1",
            "method": "connect",
            "body": {"version": "1.7.3", "client": "c1", "expires": false, "expired": false, "ttl": 0}
        }));
    }

    /// Hang up from the broker side.
    pub fn hang_up(self) {
        let _ = self.to_client.send(TransportEvent::Closed);
    }
}

/// Connector handing each new connection's broker half to the test.
#[derive(Clone)]
pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<BrokerSide>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

pub struct MemoryBroker {
    accepted: mpsc::UnboundedReceiver<BrokerSide>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MemoryBroker {
    pub async fn accept(&mut self) -> BrokerSide {
        self.accepted.recv().await.expect("connector dropped")
    }

    pub fn try_accept(&mut self) -> Option<BrokerSide> {
        self.accepted.try_recv().ok()
    }

    /// Transports opened so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Graceful closes performed by the client.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub fn memory_transport() -> (MemoryConnector, MemoryBroker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let opens = Arc::new(AtomicUsize::new(0));
    let closes = Arc::new(AtomicUsize::new(0));
    (
        MemoryConnector {
            accepted: tx,
            opens: opens.clone(),
            closes: closes.clone(),
        },
        MemoryBroker {
            accepted: rx,
            opens,
            closes,
        },
    )
}

struct MemoryTransport {
    to_broker: mpsc::UnboundedSender<Bytes>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(
        &self,
        _url: &str,
        _options: &TransportOptions,
    ) -> iridium_centrifugo::Result<Box<dyn Transport>> {
        let (to_broker, from_client) = mpsc::unbounded_channel();
        let (to_client, events) = mpsc::unbounded_channel();
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.accepted
            .send(BrokerSide {
                from_client,
                to_client,
            })
            .map_err(|_| ClientError::ConnectionLost("broker gone".into()))?;
        Ok(Box::new(MemoryTransport {
            to_broker,
            events,
            closes: self.closes.clone(),
        }))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, payload: Bytes) -> iridium_centrifugo::Result<()> {
        self.to_broker
            .send(payload)
            .map_err(|_| ClientError::TransportSend("broker side dropped".into()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        self.events.recv().await.unwrap_or(TransportEvent::Closed)
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.events.close();
    }
}

/// Deterministic signer for tests.
pub fn test_signer(user: &str, timestamp: &str, _info: &str) -> String {
    format!("{}:{}", user, timestamp)
}
