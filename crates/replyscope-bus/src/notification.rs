// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifications published by the supervisor and the analytics pipeline.

use chrono::{DateTime, Utc};
use replyscope_core::{Contact, Direction, SessionId};
use serde::{Deserialize, Serialize};

/// Something subscribers may want to know about a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Notification {
    /// A pairing code to render for the user.
    Qr {
        session_id: SessionId,
        code: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// The session is online.
    Open {
        session_id: SessionId,
        address: String,
    },
    /// The connection closed.
    Close {
        session_id: SessionId,
        code: Option<u16>,
        reason: String,
        will_reconnect: bool,
        logged_out: bool,
    },
    /// Too many pairing codes in one window; the session is paused until a
    /// manual connect.
    QrLoop { session_id: SessionId, attempts: u32 },
    /// A message was ingested.
    Message {
        session_id: SessionId,
        instance_id: String,
        contact: Contact,
        direction: Direction,
        body: String,
        is_new_contact: bool,
        is_returning_contact: bool,
    },
}

impl Notification {
    pub fn session_id(&self) -> &SessionId {
        match self {
            Notification::Qr { session_id, .. }
            | Notification::Open { session_id, .. }
            | Notification::Close { session_id, .. }
            | Notification::QrLoop { session_id, .. }
            | Notification::Message { session_id, .. } => session_id,
        }
    }

    /// The serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Qr { .. } => "qr",
            Notification::Open { .. } => "open",
            Notification::Close { .. } => "close",
            Notification::QrLoop { .. } => "qr-loop",
            Notification::Message { .. } => "message",
        }
    }
}

/// A notification stamped by the bus on publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    /// Monotonic per-bus publish counter, starting at 1.
    pub sequence: u64,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub notification: Notification,
}
