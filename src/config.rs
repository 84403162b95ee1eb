use std::time::Duration;

use crate::transport::TransportOptions;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);
/// Shortest heartbeat period; tokio intervals cannot have a zero period.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1);
/// Subscriptions per resubscribe frame, kept under the broker's client queue limit.
pub const DEFAULT_SUBSCRIBE_BATCH_SIZE: usize = 100;

/// Settings for a [`Client`](crate::Client).
///
/// Built with [`ClientConfig::new`] and adjusted with the builder-style
/// setters:
///
/// ```
/// use std::time::Duration;
/// use iridium_centrifugo::ClientConfig;
///
/// let config = ClientConfig::new("ws://localhost:8000/connection/websocket", "user-42")
///     .heartbeat_interval(Duration::from_secs(10))
///     .subscribe_batch_size(50);
/// assert_eq!(config.subscribe_batch_size, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Broker endpoint
    pub url: String,
    /// Client identity, sent as `user` and signed into the token
    pub user: String,
    /// Connection info, signed into the token. Usually empty.
    pub info: String,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    pub handshake_timeout: Duration,
    pub subscribe_batch_size: usize,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: user.into(),
            info: String::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            subscribe_batch_size: DEFAULT_SUBSCRIBE_BATCH_SIZE,
        }
    }

    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Values below [`MIN_HEARTBEAT_INTERVAL`] are raised to it.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval.max(MIN_HEARTBEAT_INTERVAL);
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn subscribe_batch_size(mut self, size: usize) -> Self {
        self.subscribe_batch_size = size.max(1);
        self
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            handshake_timeout: self.handshake_timeout,
        }
    }
}
