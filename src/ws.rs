//! WebSocket transport built on tokio-tungstenite.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::transport::{Connector, Transport, TransportEvent, TransportOptions};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens a fresh WebSocket per connection attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str, options: &TransportOptions) -> Result<Box<dyn Transport>> {
        let (stream, _response) =
            tokio::time::timeout(options.handshake_timeout, connect_async(url))
                .await
                .map_err(|_| ClientError::HandshakeTimeout(options.handshake_timeout))??;
        debug!(url, "websocket open");
        Ok(Box::new(WsTransport {
            stream,
            finished: false,
        }))
    }
}

/// Text frames carry the JSON protocol; binary frames are accepted as well.
/// Control frames are handled by tungstenite and never surface.
pub struct WsTransport {
    stream: WsStream,
    finished: bool,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, payload: Bytes) -> Result<()> {
        let text = String::from_utf8(payload.to_vec())
            .map_err(|e| ClientError::TransportSend(e.to_string()))?;
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ClientError::TransportSend(e.to_string()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        if self.finished {
            return TransportEvent::Closed;
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Message(Bytes::from(text)),
                Some(Ok(Message::Binary(data))) => return TransportEvent::Message(Bytes::from(data)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "websocket close frame");
                    self.finished = true;
                    return TransportEvent::Closed;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.finished = true;
                    return TransportEvent::Error(e.into());
                }
                None => {
                    self.finished = true;
                    return TransportEvent::Closed;
                }
            }
        }
    }

    async fn close(&mut self) {
        if !self.finished {
            self.finished = true;
            let _ = self.stream.close(None).await;
        }
    }
}
