use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::codec::Outgoing;
use crate::config::ClientConfig;
use crate::connection::{Action, Connection};
use crate::dispatcher::MessageHandler;
use crate::signer::CredentialSigner;
use crate::state::ConnectionState;
use crate::transport::{Connector, Transport, TransportEvent};
use crate::ws::WsConnector;

enum ClientCommand {
    Connect,
    Subscribe {
        channel: String,
        cursor: Option<String>,
    },
    Unsubscribe(String),
    SetHandler(Box<dyn MessageHandler>),
    Close,
}

/// Handle to a persistent broker connection.
///
/// Creating a `Client` spawns a background task that owns the transport,
/// the heartbeat and the reconnect timer; the handle only queues requests
/// for it, so none of its methods block or fail. The first `subscribe`
/// (or an explicit `connect`) opens the connection. After a disconnect the
/// task reconnects on a fixed delay and resubscribes every channel, until
/// [`close`](Client::close) is called.
///
/// Must be created inside a tokio runtime. Clones share the same connection.
///
/// ```no_run
/// use iridium_centrifugo::{Client, ClientConfig, HmacSigner};
///
/// # async fn run() {
/// let config = ClientConfig::new("ws://localhost:8000/connection/websocket", "user-42");
/// let client = Client::new(config, HmacSigner::new("secret"));
/// client
///     .set_on_message(|channel: &str, data: serde_json::Value| println!("{channel}: {data}"))
///     .subscribe("news")
///     .subscribe_with_cursor("scores", "last-seen-id");
/// // ...
/// client.close();
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    id: Arc<str>,
    commands: mpsc::UnboundedSender<ClientCommand>,
    state: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
}

impl Client {
    /// Connect over WebSocket.
    pub fn new(config: ClientConfig, signer: impl CredentialSigner) -> Self {
        Self::with_connector(config, signer, WsConnector)
    }

    /// Connect through a custom transport.
    pub fn with_connector(
        config: ClientConfig,
        signer: impl CredentialSigner,
        connector: impl Connector,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let shutdown = CancellationToken::new();
        let id: Arc<str> = Arc::from(config.user.as_str());

        let driver = Driver {
            connection: Connection::new(config, Arc::new(signer)),
            connector: Box::new(connector),
            transport: None,
            heartbeat: crate::heartbeat::HeartbeatTimer::new(),
            reconnect: crate::reconnect::ReconnectScheduler::new(),
            commands: command_rx,
            state_tx,
            shutdown: shutdown.clone(),
        };
        tokio::spawn(driver.run());

        Client {
            id,
            commands,
            state,
            shutdown,
        }
    }

    /// The client identity this connection authenticates as.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connect(&self) -> &Self {
        self.request(ClientCommand::Connect)
    }

    pub fn subscribe(&self, channel: impl Into<String>) -> &Self {
        self.request(ClientCommand::Subscribe {
            channel: channel.into(),
            cursor: None,
        })
    }

    /// Subscribe and ask the broker to replay what was published after
    /// `last_message_id`. The cursor is used for the first successful
    /// subscribe only.
    pub fn subscribe_with_cursor(
        &self,
        channel: impl Into<String>,
        last_message_id: impl Into<String>,
    ) -> &Self {
        self.request(ClientCommand::Subscribe {
            channel: channel.into(),
            cursor: Some(last_message_id.into()),
        })
    }

    pub fn unsubscribe(&self, channel: impl Into<String>) -> &Self {
        self.request(ClientCommand::Unsubscribe(channel.into()))
    }

    /// Replace the message handler. Messages already being delivered still
    /// go to the previous one.
    pub fn set_on_message(&self, handler: impl MessageHandler) -> &Self {
        self.request(ClientCommand::SetHandler(Box::new(handler)))
    }

    /// Close for good. Safe to call repeatedly; after the first call no
    /// further messages, pings or reconnects happen.
    pub fn close(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let _ = self.commands.send(ClientCommand::Close);
        self.shutdown.cancel();
    }

    pub fn connection_state(&self) -> ConnectionState {
        if self.shutdown.is_cancelled() {
            return ConnectionState::Closed;
        }
        *self.state.borrow()
    }

    /// Observe state changes as the background task publishes them.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the background task has shut down the connection.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| s.is_closed()).await;
    }

    fn request(&self, command: ClientCommand) -> &Self {
        if self.commands.send(command).is_err() {
            debug!("client task stopped, request dropped");
        }
        self
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("state", &self.connection_state())
            .finish()
    }
}

/// Background task: the single execution context every event of one
/// client is serialized onto.
struct Driver {
    connection: Connection,
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    heartbeat: crate::heartbeat::HeartbeatTimer,
    reconnect: crate::reconnect::ReconnectScheduler,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => self.connection.close(),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    // every handle dropped
                    None => self.connection.close(),
                },
                event = next_event(&mut self.transport) => self.handle_transport_event(event),
                _ = self.heartbeat.tick() => self.connection.handle_heartbeat_tick(),
                _ = self.reconnect.fired() => self.connection.handle_reconnect_due(),
            }

            self.apply_actions().await;
            if self.connection.state().is_closed() {
                break;
            }
        }
        debug!("client task stopped");
    }

    fn handle_command(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Connect => self.connection.connect(),
            ClientCommand::Subscribe { channel, cursor } => {
                self.connection.subscribe(&channel, cursor)
            }
            ClientCommand::Unsubscribe(channel) => self.connection.unsubscribe(&channel),
            ClientCommand::SetHandler(handler) => self.connection.set_handler(handler),
            ClientCommand::Close => self.connection.close(),
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(payload) => {
                if !self.shutdown.is_cancelled() {
                    self.connection.handle_transport_message(&payload);
                }
            }
            TransportEvent::Error(e) => self.connection.handle_transport_error(&e),
            TransportEvent::Closed => {
                self.transport = None;
                self.connection.handle_transport_closed();
            }
        }
    }

    async fn apply_actions(&mut self) {
        self.publish_state();
        while let Some(action) = self.connection.poll_action() {
            match action {
                Action::Open => self.open().await,
                Action::Send(out) => self.send(out).await,
                Action::Close => {
                    if let Some(mut transport) = self.transport.take() {
                        transport.close().await;
                    }
                }
                Action::Terminate => {
                    self.transport = None;
                    self.connection.handle_transport_closed();
                }
                Action::StartHeartbeat(interval) => self.heartbeat.start(interval),
                Action::StopHeartbeat => self.heartbeat.stop(),
                Action::ScheduleReconnect(delay) => {
                    debug!(?delay, "reconnect scheduled");
                    self.reconnect.schedule(delay);
                }
                Action::CancelReconnect => self.reconnect.cancel(),
            }
            self.publish_state();
        }
    }

    async fn open(&mut self) {
        self.transport = None;
        let url = self.connection.config().url.clone();
        let options = self.connection.config().transport_options();

        let opened = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            result = self.connector.open(&url, &options) => Some(result),
        };
        match opened {
            None => self.connection.close(),
            Some(Ok(transport)) => {
                debug!(url = %url, "transport open");
                self.transport = Some(transport);
                self.connection.handle_transport_open(current_millis());
            }
            Some(Err(e)) => {
                error!(url = %url, error = %e, "could not open transport");
                self.connection.handle_transport_closed();
            }
        }
    }

    async fn send(&mut self, out: Outgoing) {
        let Some(transport) = self.transport.as_mut() else {
            warn!("no transport, frame dropped");
            return;
        };
        let payload = match out.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "frame dropped");
                return;
            }
        };
        let commands = out.commands();
        if let (Some(first), Some(last)) = (commands.first(), commands.last()) {
            debug!(method = %first.method, uid = %first.uid, last_uid = %last.uid, count = commands.len(), "send");
        }
        if let Err(e) = transport.send(payload).await {
            error!(error = %e, "send failed");
        }
    }

    fn publish_state(&self) {
        self.state_tx.send_if_modified(|current| {
            let next = self.connection.state();
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn next_event(transport: &mut Option<Box<dyn Transport>>) -> TransportEvent {
    match transport.as_mut() {
        Some(transport) => transport.next_event().await,
        None => futures::future::pending().await,
    }
}

fn current_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
