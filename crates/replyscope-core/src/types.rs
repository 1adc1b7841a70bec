// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, the supervisor, and the analytics engine.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a session (the credential key backing one instance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(value)
    }
}

/// Opaque key/value credential blob for one session.
pub type CredentialSet = BTreeMap<String, String>;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
    Observability,
}

/// Which side of the conversation produced a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by the customer to the instance.
    Inbound,
    /// Sent by staff from the instance.
    Outbound,
}

/// Connection status of an instance as persisted in the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Tag describing what kind of content a stored message body came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    ButtonReply,
    ListReply,
    Location,
    ContactCard,
}

/// One logical connection endpoint owned by a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub tenant_id: String,
    pub session_id: SessionId,
    pub name: String,
    /// Last network address reported by a successful open.
    pub address: Option<String>,
    pub status: InstanceStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Instance {
    /// Build a new disconnected instance with generated ids.
    pub fn new(tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string();
        Self {
            session_id: SessionId(format!("session-{id}")),
            id,
            tenant_id: tenant_id.into(),
            name: name.into(),
            address: None,
            status: InstanceStatus::Disconnected,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A counterpart address seen by an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub instance_id: String,
    pub address: String,
    pub name: Option<String>,
    /// Unix seconds of the first message to or from this address.
    pub first_seen: i64,
    /// Unix seconds of the latest message to or from this address.
    pub last_seen: i64,
    pub sent_count: i64,
    pub received_count: i64,
    pub return_count: i64,
}

/// Fields needed to create a contact row.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub instance_id: String,
    pub address: String,
    pub name: Option<String>,
    pub seen_at: i64,
}

/// A persisted message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub instance_id: String,
    pub contact_id: i64,
    pub network_message_id: Option<String>,
    pub direction: Direction,
    pub body: String,
    pub content_kind: ContentKind,
    /// Unix seconds reported by the network.
    pub timestamp: i64,
    /// Unix seconds at which the pipeline accepted the message.
    pub received_at: i64,
}

/// Fields needed to append a message row.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub instance_id: String,
    pub contact_id: i64,
    pub network_message_id: Option<String>,
    pub direction: Direction,
    pub body: String,
    pub content_kind: ContentKind,
    pub timestamp: i64,
    pub received_at: i64,
}

/// One message together with the contact bookkeeping it implies.
///
/// [`StorageAdapter::record_message`](crate::StorageAdapter::record_message)
/// applies all of it or none of it.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub instance_id: String,
    pub address: String,
    /// Display name offered by the sender; ignored for outbound messages.
    pub sender_name: Option<String>,
    pub network_message_id: Option<String>,
    pub direction: Direction,
    pub body: String,
    pub content_kind: ContentKind,
    pub timestamp: i64,
    pub received_at: i64,
    /// Calendar day whose rollup is credited.
    pub date: NaiveDate,
    /// Silence, in seconds, after which an inbound message counts as a return.
    pub returning_gap_secs: i64,
}

impl MessageRecord {
    /// Name to store for the contact: inbound and non-blank only.
    pub fn contact_name(&self) -> Option<&str> {
        match self.direction {
            Direction::Inbound => self
                .sender_name
                .as_deref()
                .filter(|n| !n.trim().is_empty()),
            Direction::Outbound => None,
        }
    }

    /// Whether this message brings back a contact last seen at `last_seen`.
    /// The threshold is inclusive.
    pub fn is_return_after(&self, last_seen: i64) -> bool {
        self.direction == Direction::Inbound
            && self.timestamp.saturating_sub(last_seen) >= self.returning_gap_secs
    }

    /// Message row for an already resolved contact.
    pub fn message_for(&self, contact_id: i64) -> NewMessage {
        NewMessage {
            instance_id: self.instance_id.clone(),
            contact_id,
            network_message_id: self.network_message_id.clone(),
            direction: self.direction,
            body: self.body.clone(),
            content_kind: self.content_kind,
            timestamp: self.timestamp,
            received_at: self.received_at,
        }
    }
}

/// What a successful [`MessageRecord`] write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    /// The contact after the message was applied.
    pub contact: Contact,
    pub message_id: i64,
    pub is_new_contact: bool,
    pub is_returning_contact: bool,
}

/// Per-instance, per-day counter rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMetric {
    pub instance_id: String,
    pub date: NaiveDate,
    pub new_contacts: i64,
    pub messages_received: i64,
    pub messages_sent: i64,
    pub returning_contacts: i64,
}

/// Additive deltas merged into a [`DailyMetric`] row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricDelta {
    pub new_contacts: i64,
    pub messages_received: i64,
    pub messages_sent: i64,
    pub returning_contacts: i64,
}

impl MetricDelta {
    /// Delta contributed by a single ingested message.
    pub fn for_message(direction: Direction, is_new: bool, is_returning: bool) -> Self {
        Self {
            new_contacts: i64::from(is_new),
            messages_received: i64::from(direction == Direction::Inbound),
            messages_sent: i64::from(direction == Direction::Outbound),
            returning_contacts: i64::from(is_returning),
        }
    }
}

/// A contact annotated with its most recent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactActivity {
    pub contact: Contact,
    pub last_body: Option<String>,
    pub last_at: Option<i64>,
    pub last_direction: Option<Direction>,
}

/// An inbound message paired with the earliest later outbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePair {
    pub contact_id: i64,
    pub inbound_at: i64,
    pub reply_at: Option<i64>,
}

/// A contact's first-ever message paired with its first-ever outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstContactPair {
    pub contact_id: i64,
    pub first_at: i64,
    pub first_outbound_at: Option<i64>,
}
