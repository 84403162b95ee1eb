//! Display and source chains of ClientError

use iridium_centrifugo::{ClientError, ConnectionState, decode_frame};
use std::error::Error;
use std::io;
use std::time::Duration;

#[test]
fn malformed_frame_display_and_source() {
    let err = decode_frame(b"{oops").unwrap_err();
    assert!(matches!(err, ClientError::MalformedFrame(_)));
    assert!(format!("{}", err).starts_with("malformed frame:"));
    assert!(err.source().is_some());
}

#[test]
fn unexpected_reply_display() {
    let err = ClientError::UnexpectedReply {
        method: "message".into(),
        reason: "missing field `channel`".into(),
    };
    assert_eq!(
        format!("{}", err),
        "unexpected 'message' reply: missing field `channel`"
    );
}

#[test]
fn broker_error_display() {
    let err = ClientError::Broker {
        channel: Some("secret".into()),
        error: "permission denied".into(),
    };
    assert_eq!(
        format!("{}", err),
        "broker error on channel secret: permission denied"
    );

    let err = ClientError::Broker {
        channel: None,
        error: "invalid token".into(),
    };
    assert_eq!(format!("{}", err), "broker error on channel <none>: invalid token");
}

#[test]
fn illegal_transition_display() {
    let err = ClientError::IllegalTransition {
        from: ConnectionState::Closed,
        to: ConnectionState::Connecting,
    };
    assert_eq!(format!("{}", err), "illegal transition from closed to connecting");
}

#[test]
fn connection_lost_and_timeout_display() {
    let err = ClientError::ConnectionLost("no traffic for 30s".into());
    assert_eq!(format!("{}", err), "connection lost: no traffic for 30s");

    let err = ClientError::HandshakeTimeout(Duration::from_secs(1));
    assert_eq!(format!("{}", err), "handshake timed out after 1s");
}

#[test]
fn io_error_converts() {
    let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
    let err: ClientError = io_err.into();
    assert!(matches!(err, ClientError::Io(_)));
    assert!(format!("{}", err).contains("connection refused"));
}

#[test]
fn error_debug() {
    let err = ClientError::Credential("no key".into());
    assert!(format!("{:?}", err).contains("Credential"));
    assert_eq!(format!("{}", err), "credential error: no key");
}
