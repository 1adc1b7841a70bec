// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events emitted by a network client and the payloads they carry.
//!
//! These are the normalized shapes every [`NetworkClient`](crate::NetworkClient)
//! implementation must produce. The supervisor consumes them strictly in
//! arrival order, one session at a time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::traits::network::NetworkClient;
use crate::types::{CredentialSet, SessionId};

/// Everything a network client can report about its session.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The client rotated or extended its credential blob.
    CredentialsUpdated(CredentialSet),
    /// A batch of messages arrived.
    Messages {
        batch: Vec<RawMessage>,
        kind: BatchKind,
    },
    /// The connection changed state.
    Connection(ConnectionUpdate),
}

/// Origin of a message batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    /// Live traffic delivered as it happens.
    Notify,
    /// Messages appended from another device of the same account.
    Append,
}

/// Connection lifecycle reported by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    /// A new pairing code is ready to be scanned.
    Qr { code: String },
    /// The session is paired and online under `address`.
    Open { address: String },
    /// The socket closed. `code` is the network's disconnect reason, if any.
    Close { code: Option<u16>, reason: String },
}

/// A message as delivered by the network, before text extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Network message id, when the network supplied one.
    #[serde(default)]
    pub id: Option<String>,
    /// Address of the chat the message belongs to.
    pub remote_address: String,
    /// True when the message was sent from this account.
    #[serde(default)]
    pub from_me: bool,
    /// Sender-supplied display name.
    #[serde(default)]
    pub push_name: Option<String>,
    /// Unix seconds.
    pub timestamp: i64,
    /// Content fields present on the message.
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

/// One content field of a network message.
///
/// A message may carry several (e.g. an image with a caption inside a reply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Conversation {
        text: String,
    },
    ExtendedText {
        text: String,
    },
    Image {
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        #[serde(default)]
        caption: Option<String>,
    },
    Audio {
        #[serde(default)]
        voice_note: bool,
    },
    Document {
        #[serde(default)]
        caption: Option<String>,
        #[serde(default)]
        file_name: Option<String>,
    },
    Sticker,
    ButtonsResponse {
        #[serde(default)]
        selected_text: Option<String>,
    },
    ListResponse {
        #[serde(default)]
        title: Option<String>,
    },
    TemplateButtonReply {
        #[serde(default)]
        selected_text: Option<String>,
    },
    Location {
        #[serde(default)]
        name: Option<String>,
    },
    ContactCard {
        #[serde(default)]
        display_name: Option<String>,
    },
    Reaction {
        text: String,
    },
    Protocol,
}

/// Acknowledgement returned by a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentReceipt {
    pub message_id: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Parameters for opening a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub session_id: SessionId,
    /// Credentials stored for the session; empty when pairing from scratch.
    pub credentials: CredentialSet,
}

/// A freshly opened client and the receiving end of its event stream.
pub struct ClientHandle {
    pub client: Arc<dyn NetworkClient>,
    pub events: mpsc::Receiver<ClientEvent>,
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle").finish_non_exhaustive()
    }
}
