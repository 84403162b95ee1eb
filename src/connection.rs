use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::channel::ChannelRegistry;
use crate::codec::{self, CommandCodec, Inbound, Outgoing, Reply};
use crate::config::ClientConfig;
use crate::dispatcher::{MessageDispatcher, MessageHandler};
use crate::error::ClientError;
use crate::heartbeat::{HeartbeatMonitor, Tick};
use crate::signer::CredentialSigner;
use crate::state::{self, ConnectionState};

/// Side effects requested by [`Connection`], executed in order by whoever
/// owns the transport and the timers.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Open a new transport, discarding any previous one. Report the result
    /// through `handle_transport_open` or `handle_transport_closed`.
    Open,
    /// Write one frame to the current transport
    Send(Outgoing),
    /// Close the transport gracefully; no close event is expected back
    Close,
    /// Drop the transport at once, then report `handle_transport_closed`
    Terminate,
    StartHeartbeat(Duration),
    StopHeartbeat,
    ScheduleReconnect(Duration),
    CancelReconnect,
}

/// The connection lifecycle and channel subscription state machine.
///
/// `Connection` performs no I/O. Every input (a caller operation, a
/// transport event, a timer firing) is a method call; every output is an
/// [`Action`] queued for the driver, collected with
/// [`poll_action`](Connection::poll_action). Inputs must be fed one at a
/// time, in arrival order.
pub struct Connection {
    config: ClientConfig,
    signer: Arc<dyn CredentialSigner>,
    state: ConnectionState,
    channels: ChannelRegistry,
    codec: CommandCodec,
    heartbeat: HeartbeatMonitor,
    dispatcher: MessageDispatcher,
    actions: VecDeque<Action>,
}

impl Connection {
    pub fn new(config: ClientConfig, signer: Arc<dyn CredentialSigner>) -> Self {
        let heartbeat = HeartbeatMonitor::new(config.heartbeat_interval);
        Self {
            config,
            signer,
            state: ConnectionState::Disconnected,
            channels: ChannelRegistry::new(),
            codec: CommandCodec::new(),
            heartbeat,
            dispatcher: MessageDispatcher::new(),
            actions: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn heartbeat(&self) -> &HeartbeatMonitor {
        &self.heartbeat
    }

    pub fn has_handler(&self) -> bool {
        self.dispatcher.has_handler()
    }

    pub fn poll_action(&mut self) -> Option<Action> {
        self.actions.pop_front()
    }

    pub fn drain_actions(&mut self) -> Vec<Action> {
        self.actions.drain(..).collect()
    }

    fn transition(&mut self, to: ConnectionState) -> bool {
        match state::transition(self.state, to) {
            Ok(next) => {
                debug!(from = %self.state, to = %next, "state transition");
                self.state = next;
                true
            }
            Err(e) => {
                warn!(error = %e, "transition rejected");
                false
            }
        }
    }

    fn push(&mut self, action: Action) {
        self.actions.push_back(action);
    }

    fn send(&mut self, out: impl Into<Outgoing>) {
        self.actions.push_back(Action::Send(out.into()));
    }

    /// Start a connection attempt. No-op unless disconnected.
    pub fn connect(&mut self) {
        if !self.transition(ConnectionState::Connecting) {
            return;
        }
        self.push(Action::CancelReconnect);
        self.push(Action::Open);
    }

    /// Register `name`, connecting first if needed.
    ///
    /// An existing entry for `name` is replaced; when connected the old
    /// subscription is dropped on the broker before the new one is sent.
    /// Rejected once closed.
    pub fn subscribe(&mut self, name: &str, cursor: Option<String>) {
        if self.state.is_closed() {
            debug!(channel = name, "client closed, subscribe ignored");
            return;
        }
        if self.state == ConnectionState::Disconnected {
            self.connect();
        }

        let replaced = self.channels.add(name, cursor);
        if self.state != ConnectionState::Connected {
            return;
        }
        if replaced {
            let cmd = self.codec.encode_unsubscribe(name);
            self.send(cmd);
        }
        let cmd = self
            .channels
            .get(name)
            .map(|channel| self.codec.encode_subscribe(channel));
        if let Some(cmd) = cmd {
            self.send(cmd);
            self.channels.mark_confirmed(name);
        }
    }

    pub fn unsubscribe(&mut self, name: &str) {
        if self.state.is_closed() {
            return;
        }
        if self.channels.remove(name) && self.state == ConnectionState::Connected {
            let cmd = self.codec.encode_unsubscribe(name);
            self.send(cmd);
        }
    }

    /// Replace the message handler. Ignored once closed.
    pub fn set_handler(&mut self, handler: Box<dyn MessageHandler>) {
        if self.state.is_closed() {
            return;
        }
        self.dispatcher.set_handler(handler);
    }

    /// Enter the terminal state. Idempotent: a second call does nothing.
    pub fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        if self.state == ConnectionState::Connected {
            let cmd = self.codec.encode_disconnect();
            self.send(cmd);
        }
        self.transition(ConnectionState::Closed);
        self.heartbeat.stop();
        self.dispatcher.clear();
        self.channels.clear();
        self.push(Action::StopHeartbeat);
        self.push(Action::CancelReconnect);
        self.push(Action::Close);
    }

    /// The transport opened: authenticate. `timestamp_ms` is the current
    /// Unix time in milliseconds.
    pub fn handle_transport_open(&mut self, timestamp_ms: u64) {
        if self.state != ConnectionState::Connecting {
            debug!(state = %self.state, "transport opened outside of connecting, ignored");
            return;
        }
        let timestamp = timestamp_ms.to_string();
        let token = match self
            .signer
            .sign(&self.config.user, &timestamp, &self.config.info)
        {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "could not sign client token");
                self.push(Action::Terminate);
                return;
            }
        };
        let cmd = self
            .codec
            .encode_auth(&self.config.user, &timestamp, &self.config.info, &token);
        self.send(cmd);
    }

    pub fn handle_transport_message(&mut self, payload: &[u8]) {
        if self.state.is_closed() {
            return;
        }
        let replies = match codec::decode_frame(payload) {
            Ok(replies) => replies,
            Err(e) => {
                error!(error = %e, "dropping frame");
                return;
            }
        };
        self.heartbeat.mark_alive();
        for reply in replies {
            match reply {
                Ok(reply) => self.handle_reply(reply),
                Err(e) => warn!(error = %e, "dropping frame element"),
            }
        }
    }

    pub fn handle_transport_error(&mut self, err: &ClientError) {
        error!(error = %err, "transport error");
    }

    /// The transport went away. Reconnects after the configured delay unless closed.
    pub fn handle_transport_closed(&mut self) {
        if !matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            return;
        }
        let lost = ClientError::ConnectionLost(format!("transport closed while {}", self.state));
        self.transition(ConnectionState::Disconnected);
        self.heartbeat.stop();
        error!(error = %lost, "connection closed");
        self.push(Action::StopHeartbeat);
        self.push(Action::ScheduleReconnect(self.config.reconnect_delay));
    }

    pub fn handle_heartbeat_tick(&mut self) {
        match self.heartbeat.tick() {
            Tick::Idle => {}
            Tick::Ping => {
                if self.state == ConnectionState::Connected {
                    let cmd = self.codec.encode_ping();
                    self.send(cmd);
                }
            }
            Tick::Expired => {
                let lost = ClientError::ConnectionLost(format!(
                    "no traffic for {:?}",
                    self.heartbeat.interval()
                ));
                error!(error = %lost, "terminating transport");
                self.push(Action::StopHeartbeat);
                self.push(Action::Terminate);
            }
        }
    }

    pub fn handle_reconnect_due(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!(state = %self.state, "reconnect skipped");
            return;
        }
        debug!("reconnecting");
        self.connect();
    }

    fn handle_reply(&mut self, reply: Reply) {
        let uid = reply.uid.clone();
        match reply.into_inbound() {
            Err(e) => warn!(?uid, error = %e, "ignoring reply"),
            Ok(Inbound::Error {
                method,
                channel,
                error,
            }) => {
                let err = ClientError::Broker { channel, error };
                error!(?uid, ?method, error = %err, "broker error");
            }
            Ok(Inbound::Connect) => self.on_connected(),
            Ok(Inbound::Ping) => debug!(?uid, "pong"),
            Ok(Inbound::Disconnect { reason }) => {
                error!(reason = reason.as_deref().unwrap_or(""), "broker disconnect");
            }
            Ok(Inbound::Message { channel, data }) => self.deliver(&channel, data),
            Ok(Inbound::Subscribe {
                channel,
                messages,
                recovered,
            }) => {
                debug!(channel = %channel, backlog = messages.len(), recovered, "subscribed");
                for data in messages {
                    self.deliver(&channel, data);
                }
                self.channels.mark_confirmed(&channel);
            }
            Ok(Inbound::Other { method }) => debug!(?uid, ?method, "reply ignored"),
        }
    }

    fn deliver(&mut self, channel: &str, data: Value) {
        if !self.dispatcher.dispatch(channel, data) {
            debug!(channel, "no message handler, dropped");
        }
    }

    fn on_connected(&mut self) {
        if !self.transition(ConnectionState::Connected) {
            return;
        }
        self.heartbeat.start();
        self.push(Action::StartHeartbeat(self.heartbeat.interval()));
        self.resubscribe_all();
    }

    /// Send every registered channel, in insertion order, as array frames of
    /// at most `subscribe_batch_size` commands.
    fn resubscribe_all(&mut self) {
        self.channels.reset_confirmations();
        let pending = self.channels.all_unconfirmed();
        let batch_size = self.config.subscribe_batch_size.max(1);
        for batch in pending.chunks(batch_size) {
            let commands = batch
                .iter()
                .map(|channel| self.codec.encode_subscribe(channel))
                .collect();
            for channel in batch {
                self.channels.mark_confirmed(channel.name());
            }
            self.send(Outgoing::Batch(commands));
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("channels", &self.channels.len())
            .field("heartbeat", &self.heartbeat)
            .field("pending_actions", &self.actions.len())
            .finish()
    }
}
