use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::Channel;
use crate::error::{ClientError, Result};

pub const METHOD_CONNECT: &str = "connect";
pub const METHOD_DISCONNECT: &str = "disconnect";
pub const METHOD_SUBSCRIBE: &str = "subscribe";
pub const METHOD_UNSUBSCRIBE: &str = "unsubscribe";
pub const METHOD_PING: &str = "ping";
pub const METHOD_MESSAGE: &str = "message";

/// A single outgoing command: `{"method", "params"?, "uid"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    pub uid: String,
}

/// Command parameters. Serialized without a tag, as plain objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Params {
    Connect(ConnectParams),
    Channel(ChannelParams),
}

/// Authentication parameters sent right after the transport opens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectParams {
    pub user: String,
    pub info: String,
    /// Unix epoch milliseconds, as a string
    pub timestamp: String,
    pub token: String,
}

/// Parameters of `subscribe` and `unsubscribe`.
///
/// `last` and `recover` are only present when a subscribe asks the broker
/// to replay messages published after `last`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelParams {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub recover: bool,
}

impl ChannelParams {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            last: None,
            recover: false,
        }
    }
}

/// What goes out in one transport write: a command or an array of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outgoing {
    Single(Command),
    Batch(Vec<Command>),
}

impl Outgoing {
    pub fn commands(&self) -> &[Command] {
        match self {
            Outgoing::Single(cmd) => std::slice::from_ref(cmd),
            Outgoing::Batch(cmds) => cmds,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Outgoing::Batch(_))
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(ClientError::Encode)
    }
}

impl From<Command> for Outgoing {
    fn from(cmd: Command) -> Self {
        Outgoing::Single(cmd)
    }
}

/// Builds outgoing commands and stamps each one with a uid.
///
/// The uid counter lives as long as the client: it starts at 1 and is never
/// reset across reconnects, so uids are unique within every epoch.
#[derive(Debug)]
pub struct CommandCodec {
    next_uid: u64,
}

impl CommandCodec {
    pub fn new() -> Self {
        Self { next_uid: 1 }
    }

    fn command(&mut self, method: &str, params: Option<Params>) -> Command {
        let uid = self.next_uid;
        self.next_uid += 1;
        Command {
            method: method.to_string(),
            params,
            uid: uid.to_string(),
        }
    }

    /// Subscribe to `channel`, requesting recovery when it still carries a cursor.
    pub fn encode_subscribe(&mut self, channel: &Channel) -> Command {
        let mut params = ChannelParams::new(channel.name());
        if let Some(cursor) = channel.recovery_cursor() {
            params.last = Some(cursor.to_string());
            params.recover = true;
        }
        self.command(METHOD_SUBSCRIBE, Some(Params::Channel(params)))
    }

    pub fn encode_unsubscribe(&mut self, name: &str) -> Command {
        self.command(
            METHOD_UNSUBSCRIBE,
            Some(Params::Channel(ChannelParams::new(name))),
        )
    }

    pub fn encode_ping(&mut self) -> Command {
        self.command(METHOD_PING, None)
    }

    pub fn encode_disconnect(&mut self) -> Command {
        self.command(METHOD_DISCONNECT, None)
    }

    pub fn encode_auth(&mut self, user: &str, timestamp: &str, info: &str, token: &str) -> Command {
        let params = ConnectParams {
            user: user.to_string(),
            info: info.to_string(),
            timestamp: timestamp.to_string(),
            token: token.to_string(),
        };
        self.command(METHOD_CONNECT, Some(Params::Connect(params)))
    }
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// One broker reply as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub uid: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub body: Option<Value>,
}

/// A reply classified by method, with its body decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Authentication accepted
    Connect,
    /// Answer to our ping
    Ping,
    /// Broker is about to drop us
    Disconnect { reason: Option<String> },
    /// Publication on a subscribed channel
    Message { channel: String, data: Value },
    /// Subscription accepted, possibly with recovered messages in order
    Subscribe {
        channel: String,
        messages: Vec<Value>,
        recovered: bool,
    },
    /// Any reply carrying a non-empty `error`
    Error {
        method: Option<String>,
        channel: Option<String>,
        error: String,
    },
    /// A method this client does not act on (e.g. `unsubscribe`)
    Other { method: Option<String> },
}

#[derive(Deserialize)]
struct DisconnectBody {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct MessageBody {
    channel: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct SubscribeBody {
    channel: String,
    #[serde(default)]
    messages: Option<Vec<HistoryMessage>>,
    #[serde(default)]
    recovered: bool,
}

#[derive(Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    data: Value,
}

impl Reply {
    /// The error text, when the broker set one. `null`, `false` and `""`
    /// mean no error.
    pub fn error_text(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn body_channel(&self) -> Option<String> {
        self.body
            .as_ref()
            .and_then(|b| b.get("channel"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn into_inbound(self) -> Result<Inbound> {
        if let Some(error) = self.error_text() {
            return Ok(Inbound::Error {
                channel: self.body_channel(),
                method: self.method,
                error,
            });
        }

        let method = self.method.unwrap_or_default();
        let body = self.body.unwrap_or(Value::Null);
        let inbound = match method.as_str() {
            METHOD_CONNECT => Inbound::Connect,
            METHOD_PING => Inbound::Ping,
            METHOD_DISCONNECT => {
                let body: Option<DisconnectBody> = decode_body(&method, body)?;
                Inbound::Disconnect {
                    reason: body.and_then(|b| b.reason),
                }
            }
            METHOD_MESSAGE => {
                let body: MessageBody = decode_body(&method, body)?;
                Inbound::Message {
                    channel: body.channel,
                    data: body.data,
                }
            }
            METHOD_SUBSCRIBE => {
                let body: SubscribeBody = decode_body(&method, body)?;
                Inbound::Subscribe {
                    channel: body.channel,
                    messages: body
                        .messages
                        .unwrap_or_default()
                        .into_iter()
                        .map(|m| m.data)
                        .collect(),
                    recovered: body.recovered,
                }
            }
            "" => Inbound::Other { method: None },
            _ => Inbound::Other {
                method: Some(method),
            },
        };
        Ok(inbound)
    }
}

fn decode_body<T: DeserializeOwned>(method: &str, body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| ClientError::UnexpectedReply {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

/// Decode one transport payload into its replies.
///
/// The payload is either a single JSON object or an array of them; both
/// come back as a sequence in wire order. Only a payload that is not JSON
/// at all fails as a whole. Each element carries its own result, so one
/// element of the wrong shape does not take its siblings down with it.
pub fn decode_frame(raw: &[u8]) -> Result<Vec<Result<Reply>>> {
    let value: Value = serde_json::from_slice(raw).map_err(ClientError::MalformedFrame)?;
    let items = match value {
        Value::Array(items) => items,
        single => vec![single],
    };
    Ok(items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(ClientError::MalformedFrame))
        .collect())
}
