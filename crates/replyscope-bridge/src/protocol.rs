// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON frames exchanged with the protocol sidecar.
//!
//! Every frame is a single WebSocket text message tagged by `type`.

use replyscope_core::{
    BatchKind, ClientEvent, ConnectionUpdate, CredentialSet, RawMessage, SessionId,
};
use serde::{Deserialize, Serialize};

/// Commands sent to the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Start the session, pairing from scratch when `credentials` is empty.
    Open {
        session_id: SessionId,
        credentials: CredentialSet,
    },
    /// Send a text message; answered by `sent` or `error` with the same id.
    Send {
        request_id: String,
        address: String,
        text: String,
    },
    /// Log the socket off without logging the account out.
    Close,
}

/// Connection state reported by the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionFrame {
    Qr {
        code: String,
    },
    Open {
        address: String,
    },
    Close {
        #[serde(default)]
        code: Option<u16>,
        #[serde(default)]
        reason: String,
    },
}

/// Frames received from the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Credentials {
        credentials: CredentialSet,
    },
    Messages {
        kind: BatchKind,
        #[serde(default)]
        messages: Vec<RawMessage>,
    },
    Connection {
        #[serde(flatten)]
        update: ConnectionFrame,
    },
    Sent {
        request_id: String,
        message_id: String,
        timestamp: i64,
    },
    Error {
        #[serde(default)]
        request_id: Option<String>,
        message: String,
    },
}

impl From<ConnectionFrame> for ConnectionUpdate {
    fn from(frame: ConnectionFrame) -> Self {
        match frame {
            ConnectionFrame::Qr { code } => ConnectionUpdate::Qr { code },
            ConnectionFrame::Open { address } => ConnectionUpdate::Open { address },
            ConnectionFrame::Close { code, reason } => ConnectionUpdate::Close { code, reason },
        }
    }
}

/// How the reader should handle one decoded frame.
#[derive(Debug)]
pub enum Routed {
    /// Forward to the supervisor.
    Event(ClientEvent),
    /// Resolve a pending send.
    Reply {
        request_id: String,
        result: Result<(String, i64), String>,
    },
    /// A sidecar error not tied to a request.
    Fault(String),
}

impl Frame {
    pub fn route(self) -> Routed {
        match self {
            Frame::Credentials { credentials } => {
                Routed::Event(ClientEvent::CredentialsUpdated(credentials))
            }
            Frame::Messages { kind, messages } => Routed::Event(ClientEvent::Messages {
                batch: messages,
                kind,
            }),
            Frame::Connection { update } => Routed::Event(ClientEvent::Connection(update.into())),
            Frame::Sent {
                request_id,
                message_id,
                timestamp,
            } => Routed::Reply {
                request_id,
                result: Ok((message_id, timestamp)),
            },
            Frame::Error {
                request_id: Some(request_id),
                message,
            } => Routed::Reply {
                request_id,
                result: Err(message),
            },
            Frame::Error {
                request_id: None,
                message,
            } => Routed::Fault(message),
        }
    }
}
