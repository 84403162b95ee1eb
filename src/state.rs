use std::fmt;

use crate::error::ClientError;

/// Lifecycle of the single broker connection owned by a client.
///
/// `Closed` is terminal: once entered every further transition is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 4] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether the lifecycle may move from `current` to `requested`.
///
/// Returns the new state on success. Rejections are not fatal: callers log
/// them and carry on in `current`.
///
/// | from         | allowed targets                 |
/// |--------------|---------------------------------|
/// | Disconnected | Connecting, Closed              |
/// | Connecting   | Connected, Disconnected, Closed |
/// | Connected    | Disconnected, Closed            |
/// | Closed       | -                               |
pub fn transition(
    current: ConnectionState,
    requested: ConnectionState,
) -> Result<ConnectionState, ClientError> {
    use ConnectionState::*;

    let allowed = match (current, requested) {
        (Closed, _) => false,
        (_, Closed) => true,
        (Disconnected, Connecting) => true,
        (Connecting, Connected) => true,
        // a connection attempt that never authenticated
        (Connecting, Disconnected) => true,
        (Connected, Disconnected) => true,
        _ => false,
    };

    if allowed {
        Ok(requested)
    } else {
        Err(ClientError::IllegalTransition {
            from: current,
            to: requested,
        })
    }
}
