// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Network client abstraction.
//!
//! A factory opens one client per session. The client sends text and can be
//! closed; everything it observes arrives on the event channel returned in
//! the [`ClientHandle`].

use async_trait::async_trait;

use crate::error::ReplyscopeError;
use crate::events::{ClientConfig, ClientHandle, SentReceipt};
use crate::traits::adapter::PluginAdapter;

/// A live connection to the messaging network for one session.
#[async_trait]
pub trait NetworkClient: Send + Sync + 'static {
    /// Send a text message to `address`.
    async fn send(&self, address: &str, text: &str) -> Result<SentReceipt, ReplyscopeError>;

    /// Close the connection. The client emits no further events afterwards.
    async fn close(&self) -> Result<(), ReplyscopeError>;
}

/// Opens network clients.
#[async_trait]
pub trait NetworkClientFactory: PluginAdapter {
    /// Open a client for the given session using its stored credentials.
    ///
    /// Failure here surfaces as [`ReplyscopeError::SessionCreation`].
    async fn open(&self, config: ClientConfig) -> Result<ClientHandle, ReplyscopeError>;
}
