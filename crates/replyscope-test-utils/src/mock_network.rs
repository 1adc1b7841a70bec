// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock network client for deterministic testing.
//!
//! `MockNetworkFactory` hands out `MockClient`s whose events are injected by
//! the test and whose sends are captured for assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use replyscope_core::{
    AdapterType, BatchKind, ClientConfig, ClientEvent, ClientHandle, ConnectionUpdate,
    ContentPart, CredentialSet, HealthStatus, NetworkClient, NetworkClientFactory, PluginAdapter,
    RawMessage, ReplyscopeError, SentReceipt, SessionId,
};

const EVENT_BUFFER: usize = 64;

/// A message captured by [`MockClient::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub address: String,
    pub text: String,
    pub message_id: String,
}

/// A mock network client for one session.
pub struct MockClient {
    session_id: SessionId,
    credentials: CredentialSet,
    events: mpsc::Sender<ClientEvent>,
    sent: Mutex<Vec<SentText>>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    next_id: AtomicU64,
    clock: AtomicI64,
}

impl MockClient {
    fn new(config: ClientConfig, events: mpsc::Sender<ClientEvent>) -> Self {
        Self {
            session_id: config.session_id,
            credentials: config.credentials,
            events,
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            clock: AtomicI64::new(chrono::Utc::now().timestamp()),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Credentials the client was opened with.
    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Timestamp stamped on the next send receipt.
    pub fn set_clock(&self, unix_secs: i64) {
        self.clock.store(unix_secs, Ordering::SeqCst);
    }

    /// Make every subsequent send fail with a channel error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Push an event to the supervisor. Returns false once the receiver is gone.
    pub async fn emit(&self, event: ClientEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    pub async fn emit_qr(&self, code: &str) -> bool {
        self.emit(ClientEvent::Connection(ConnectionUpdate::Qr {
            code: code.to_string(),
        }))
        .await
    }

    pub async fn emit_open(&self, address: &str) -> bool {
        self.emit(ClientEvent::Connection(ConnectionUpdate::Open {
            address: address.to_string(),
        }))
        .await
    }

    pub async fn emit_close(&self, code: Option<u16>, reason: &str) -> bool {
        self.emit(ClientEvent::Connection(ConnectionUpdate::Close {
            code,
            reason: reason.to_string(),
        }))
        .await
    }

    pub async fn emit_credentials(&self, credentials: CredentialSet) -> bool {
        self.emit(ClientEvent::CredentialsUpdated(credentials)).await
    }

    pub async fn emit_messages(&self, batch: Vec<RawMessage>) -> bool {
        self.emit(ClientEvent::Messages {
            batch,
            kind: BatchKind::Notify,
        })
        .await
    }

    /// Messages captured so far.
    pub async fn sent_messages(&self) -> Vec<SentText> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NetworkClient for MockClient {
    async fn send(&self, address: &str, text: &str) -> Result<SentReceipt, ReplyscopeError> {
        if self.is_closed() {
            return Err(ReplyscopeError::Channel {
                message: "mock client is closed".into(),
                source: None,
            });
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ReplyscopeError::Channel {
                message: "mock send failure".into(),
                source: None,
            });
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message_id = format!("mock-{}-{n}", self.session_id);
        self.sent.lock().await.push(SentText {
            address: address.to_string(),
            text: text.to_string(),
            message_id: message_id.clone(),
        });
        Ok(SentReceipt {
            message_id,
            timestamp: self.clock.load(Ordering::SeqCst),
        })
    }

    async fn close(&self) -> Result<(), ReplyscopeError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct FactoryState {
    clients: HashMap<SessionId, Vec<Arc<MockClient>>>,
    scripted_failures: VecDeque<String>,
}

/// A [`NetworkClientFactory`] producing [`MockClient`]s.
pub struct MockNetworkFactory {
    state: Mutex<FactoryState>,
}

impl MockNetworkFactory {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FactoryState::default()),
        }
    }

    /// Make the next `open` call fail with `reason`. Calls queue up.
    pub async fn fail_next_open(&self, reason: &str) {
        self.state
            .lock()
            .await
            .scripted_failures
            .push_back(reason.to_string());
    }

    /// The most recently opened client for the session.
    pub async fn client(&self, session_id: &SessionId) -> Option<Arc<MockClient>> {
        self.state
            .lock()
            .await
            .clients
            .get(session_id)
            .and_then(|clients| clients.last().cloned())
    }

    /// How many clients were successfully opened for the session.
    pub async fn open_count(&self, session_id: &SessionId) -> usize {
        self.state
            .lock()
            .await
            .clients
            .get(session_id)
            .map_or(0, Vec::len)
    }

    /// Wait until at least `count` clients were opened for the session.
    pub async fn wait_for_open_count(
        &self,
        session_id: &SessionId,
        count: usize,
    ) -> Option<Arc<MockClient>> {
        for _ in 0..500 {
            {
                let state = self.state.lock().await;
                if let Some(clients) = state.clients.get(session_id)
                    && clients.len() >= count
                {
                    return clients.last().cloned();
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        None
    }
}

impl Default for MockNetworkFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockNetworkFactory {
    fn name(&self) -> &str {
        "mock-network"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ReplyscopeError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ReplyscopeError> {
        Ok(())
    }
}

#[async_trait]
impl NetworkClientFactory for MockNetworkFactory {
    async fn open(&self, config: ClientConfig) -> Result<ClientHandle, ReplyscopeError> {
        let mut state = self.state.lock().await;
        if let Some(reason) = state.scripted_failures.pop_front() {
            return Err(ReplyscopeError::SessionCreation {
                session_id: config.session_id.to_string(),
                message: reason,
                source: None,
            });
        }
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let session_id = config.session_id.clone();
        let client = Arc::new(MockClient::new(config, tx));
        state
            .clients
            .entry(session_id)
            .or_default()
            .push(Arc::clone(&client));
        Ok(ClientHandle {
            client,
            events: rx,
        })
    }
}

/// An inbound text message from `address`.
pub fn inbound_text(id: &str, address: &str, text: &str, timestamp: i64) -> RawMessage {
    RawMessage {
        id: Some(id.to_string()),
        remote_address: address.to_string(),
        from_me: false,
        push_name: None,
        timestamp,
        parts: vec![ContentPart::Conversation {
            text: text.to_string(),
        }],
    }
}

/// A text message sent from this account (e.g. from the phone) to `address`.
pub fn outbound_text(id: &str, address: &str, text: &str, timestamp: i64) -> RawMessage {
    RawMessage {
        from_me: true,
        ..inbound_text(id, address, text, timestamp)
    }
}
