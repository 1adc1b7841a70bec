// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Replyscope.
//!
//! This crate provides the trait definitions, error types, and domain types
//! shared by the store, the connection supervisor, and the analytics engine.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use error::{BoxError, ReplyscopeError};
pub use events::{
    BatchKind, ClientConfig, ClientEvent, ClientHandle, ConnectionUpdate, ContentPart,
    RawMessage, SentReceipt,
};
pub use types::{
    AdapterType, Contact, ContactActivity, ContentKind, CredentialSet, DailyMetric, Direction,
    FirstContactPair, HealthStatus, Instance, InstanceStatus, MessageRecord, MetricDelta,
    NewContact, NewMessage, RecordedMessage, ResponsePair, SessionId, StoredMessage,
};

pub use traits::{NetworkClient, NetworkClientFactory, PluginAdapter, StorageAdapter};
