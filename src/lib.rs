//! Persistent Centrifugo client.
//!
//! One [`Client`] keeps one authenticated connection to the broker alive:
//! it connects on first use, pings to detect dead peers, reconnects on a
//! fixed delay, and resubscribes every channel (in batches) after each
//! reconnect, optionally replaying missed messages from a last-seen id.
//!
//! The lifecycle itself lives in [`Connection`], a state machine that does
//! no I/O and can be driven directly; [`Client`] runs it on a tokio task
//! against a [`Transport`] (WebSocket by default).

pub mod channel;
pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod heartbeat;
pub mod reconnect;
pub mod signer;
pub mod state;
pub mod transport;
pub mod ws;

pub use channel::{Channel, ChannelRegistry, SubscriptionState};
pub use client::Client;
pub use codec::{Command, CommandCodec, Inbound, Outgoing, Reply, decode_frame};
pub use config::ClientConfig;
pub use connection::{Action, Connection};
pub use dispatcher::{MessageDispatcher, MessageHandler};
pub use error::{ClientError, Result};
pub use heartbeat::{HeartbeatMonitor, Tick};
pub use reconnect::ReconnectScheduler;
pub use signer::{CredentialSigner, HmacSigner};
pub use state::{ConnectionState, transition};
pub use transport::{Connector, Transport, TransportEvent, TransportOptions};
pub use ws::WsConnector;
