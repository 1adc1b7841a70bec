// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection lifecycle supervisor.
//!
//! One registry entry and one event task per session. The event task consumes
//! client events strictly in arrival order; messages in a batch are ingested
//! one at a time. The supervisor is the only writer of instance status and
//! session credentials.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use replyscope_analytics::{AnalyticsEngine, IngestOutcome, IngestRequest};
use replyscope_bus::{EventBus, Notification};
use replyscope_config::model::SupervisorConfig;
use replyscope_core::{
    BatchKind, ClientConfig, ClientEvent, ClientHandle, ConnectionUpdate, ContentKind, Direction,
    NetworkClient, NetworkClientFactory, RawMessage, ReplyscopeError, SentReceipt, SessionId,
    StorageAdapter,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::address::{is_trackable, normalize_address};
use crate::extract::extract_text;
use crate::policy::{CloseClass, QrLoopGuard, QrVerdict, ReconnectPolicy};
use crate::session::{SessionEntry, SessionSnapshot, SessionState};

/// Result of [`ConnectionSupervisor::send_message`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub receipt: SentReceipt,
    /// Normalized address the message went to.
    pub address: String,
    /// Analytics outcome; `None` if recording failed or the id was already stored.
    pub outcome: Option<IngestOutcome>,
}

/// Owns every live session and drives its network client.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn StorageAdapter>,
    factory: Arc<dyn NetworkClientFactory>,
    analytics: Arc<AnalyticsEngine>,
    bus: EventBus,
    config: SupervisorConfig,
    policy: ReconnectPolicy,
    sessions: DashMap<SessionId, SessionEntry>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

/// What to do after a close event.
enum ClosePlan {
    Ignore,
    Terminal { instance_id: String },
    Retry {
        instance_id: String,
        attempt: u32,
        delay: Duration,
        cancel: CancellationToken,
    },
    Abandon { instance_id: String, attempts: u32 },
}

impl ConnectionSupervisor {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        factory: Arc<dyn NetworkClientFactory>,
        analytics: Arc<AnalyticsEngine>,
        bus: EventBus,
        config: SupervisorConfig,
    ) -> Self {
        let policy = ReconnectPolicy::from_config(&config);
        Self {
            inner: Arc::new(Inner {
                storage,
                factory,
                analytics,
                bus,
                config,
                policy,
                sessions: DashMap::new(),
                generation: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn analytics(&self) -> &Arc<AnalyticsEngine> {
        &self.inner.analytics
    }

    /// Open (or reopen) the session's network client.
    ///
    /// A healthy connected session is left untouched unless `force_new` is
    /// set, in which case the session is torn down and its credentials wiped
    /// so pairing starts from scratch. Any other existing state (paused,
    /// reconnecting, awaiting a scan) is discarded and counters reset.
    pub async fn connect(
        &self,
        session_id: &SessionId,
        force_new: bool,
    ) -> Result<SessionState, ReplyscopeError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(ReplyscopeError::Internal(
                "supervisor is shutting down".into(),
            ));
        }

        let instance = self
            .inner
            .storage
            .get_instance_by_session(session_id)
            .await?
            .ok_or_else(|| ReplyscopeError::NotFound {
                kind: "instance",
                id: session_id.to_string(),
            })?;

        if !force_new
            && let Some(entry) = self.inner.sessions.get(session_id)
            && entry.state == SessionState::Connected
            && entry.client.is_some()
        {
            debug!(%session_id, "session already connected");
            return Ok(SessionState::Connected);
        }

        if force_new {
            self.inner.teardown(session_id).await;
            self.inner.storage.delete_credentials(session_id).await?;
        } else {
            self.inner.teardown(session_id).await;
        }

        info!(%session_id, instance_id = %instance.id, force_new, "connecting session");
        let result = self
            .inner
            .open_client(
                session_id,
                &instance.id,
                QrLoopGuard::from_config(&self.inner.config),
                0,
                None,
            )
            .await;
        if let Err(e) = &result {
            error!(%session_id, error = %e, "failed to open network client");
            self.inner
                .set_status(&instance.id, SessionState::Idle)
                .await;
        }
        result
    }

    /// Close the session's client and drop it from memory. Credentials stay.
    ///
    /// Idempotent.
    pub async fn disconnect(&self, session_id: &SessionId) -> Result<(), ReplyscopeError> {
        if let Some(instance_id) = self.inner.teardown(session_id).await {
            self.inner.set_status(&instance_id, SessionState::Idle).await;
            info!(%session_id, "session disconnected");
        }
        Ok(())
    }

    /// Disconnect and wipe the session's credentials.
    ///
    /// Idempotent; used for instance deletion and forced logout.
    pub async fn remove(&self, session_id: &SessionId) -> Result<(), ReplyscopeError> {
        self.disconnect(session_id).await?;
        self.inner.storage.delete_credentials(session_id).await?;
        info!(%session_id, "session removed");
        Ok(())
    }

    /// Send `text` to `address` through a connected session and record it.
    ///
    /// Rejected immediately with [`ReplyscopeError::Send`] unless the session
    /// is connected; nothing is queued.
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        address: &str,
        text: &str,
    ) -> Result<SentMessage, ReplyscopeError> {
        let reject = |reason: String| ReplyscopeError::Send {
            session_id: session_id.to_string(),
            reason,
        };

        let (client, instance_id) = {
            let entry = self
                .inner
                .sessions
                .get(session_id)
                .ok_or_else(|| reject("session is not active".into()))?;
            if entry.state != SessionState::Connected {
                return Err(reject(format!("session is {}", entry.state)));
            }
            let client = entry
                .client
                .clone()
                .ok_or_else(|| reject("session has no client".into()))?;
            (client, entry.instance_id.clone())
        };

        let target = normalize_address(address)
            .ok_or_else(|| reject(format!("invalid address {address:?}")))?;
        if !is_trackable(&target) {
            return Err(reject("group and broadcast chats are not supported".into()));
        }
        if text.trim().is_empty() {
            return Err(reject("message text is empty".into()));
        }

        let receipt = client.send(&target, text).await?;
        debug!(%session_id, message_id = %receipt.message_id, "message sent");

        let request = IngestRequest {
            direction: Direction::Outbound,
            body: text.to_string(),
            content_kind: ContentKind::Text,
            timestamp: receipt.timestamp,
            network_message_id: Some(receipt.message_id.clone()),
            sender_name: None,
        };
        let outcome = match self.inner.analytics.ingest(&instance_id, &target, request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%session_id, instance_id, error = %e, "sent message was not recorded");
                None
            }
        };
        if let Some(outcome) = &outcome {
            self.inner.publish_message(
                session_id,
                &instance_id,
                outcome,
                Direction::Outbound,
                text.to_string(),
            );
        }

        Ok(SentMessage {
            receipt,
            address: target,
            outcome,
        })
    }

    /// Every session in memory, ordered by session id.
    pub fn active_sessions(&self) -> Vec<SessionSnapshot> {
        let mut sessions: Vec<SessionSnapshot> = self
            .inner
            .sessions
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        sessions
    }

    pub fn session_state(&self, session_id: &SessionId) -> Option<SessionState> {
        self.inner.sessions.get(session_id).map(|entry| entry.state)
    }

    /// Reconnect every session with stored credentials. Returns how many
    /// clients were opened.
    pub async fn restore_sessions(&self) -> usize {
        let sessions = match self.inner.storage.sessions_with_credentials().await {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "failed to list stored sessions, nothing restored");
                return 0;
            }
        };

        let mut restored = 0;
        for session_id in sessions {
            match self.connect(&session_id, false).await {
                Ok(_) => restored += 1,
                Err(ReplyscopeError::NotFound { .. }) => {
                    debug!(%session_id, "stored credentials have no instance, skipping");
                }
                Err(e) => warn!(%session_id, error = %e, "failed to restore session"),
            }
        }
        info!(restored, "session restore complete");
        restored
    }

    /// Evict every session without wiping credentials and refuse new connects.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let session_ids: Vec<SessionId> = self
            .inner
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        info!(count = session_ids.len(), "evicting sessions");
        for session_id in session_ids {
            if let Some(instance_id) = self.inner.teardown(&session_id).await {
                self.inner.set_status(&instance_id, SessionState::Idle).await;
            }
        }
    }
}

impl Inner {
    /// Persist the instance status that `state` maps to.
    async fn set_status(&self, instance_id: &str, state: SessionState) {
        let status = state.instance_status();
        if let Err(e) = self.storage.update_instance_status(instance_id, status).await {
            warn!(instance_id, %state, %status, error = %e, "failed to update instance status");
        }
    }

    /// Remove the session from memory, cancel its tasks, and close its client.
    /// Returns the instance id if the session was present.
    async fn teardown(&self, session_id: &SessionId) -> Option<String> {
        let (_, entry) = self.sessions.remove(session_id)?;
        entry.cancel.cancel();
        if let Some(client) = entry.client {
            close_quietly(session_id, client).await;
        }
        Some(entry.instance_id)
    }

    /// Open a client and install it in the registry.
    ///
    /// With `expected_generation` set (reconnects), the client is only
    /// installed if the registry entry still belongs to that generation.
    async fn open_client(
        self: &Arc<Self>,
        session_id: &SessionId,
        instance_id: &str,
        qr: QrLoopGuard,
        reconnect_attempts: u32,
        expected_generation: Option<u64>,
    ) -> Result<SessionState, ReplyscopeError> {
        let credentials = self
            .storage
            .load_credentials(session_id)
            .await
            .map_err(|e| session_creation(session_id, "failed to load credentials", e))?;
        let paired = !credentials.is_empty();

        let ClientHandle { client, events } = self
            .factory
            .open(ClientConfig {
                session_id: session_id.clone(),
                credentials,
            })
            .await
            .map_err(|e| session_creation(session_id, "network client failed to open", e))?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = self.shutdown.child_token();
        let entry = SessionEntry {
            instance_id: instance_id.to_string(),
            generation,
            state: SessionState::Connecting,
            client: Some(Arc::clone(&client)),
            qr,
            reconnect_attempts,
            cancel: cancel.clone(),
        };

        let (installed, replaced) = match self.sessions.entry(session_id.clone()) {
            Entry::Occupied(mut slot) => match expected_generation {
                Some(expected) if slot.get().generation != expected => (false, None),
                _ => (true, Some(slot.insert(entry))),
            },
            Entry::Vacant(slot) => {
                if expected_generation.is_some() {
                    (false, None)
                } else {
                    slot.insert(entry);
                    (true, None)
                }
            }
        };

        if let Some(old) = replaced {
            old.cancel.cancel();
            if let Some(old_client) = old.client {
                close_quietly(session_id, old_client).await;
            }
        }
        if !installed {
            close_quietly(session_id, client).await;
            return Err(ReplyscopeError::Internal(format!(
                "session {session_id} changed while reconnecting"
            )));
        }

        self.set_status(instance_id, SessionState::Connecting).await;
        tokio::spawn(Arc::clone(self).run_events(
            session_id.clone(),
            generation,
            events,
            cancel,
        ));
        debug!(%session_id, generation, paired, "network client opened");
        Ok(SessionState::Connecting)
    }

    async fn run_events(
        self: Arc<Self>,
        session_id: SessionId,
        generation: u64,
        mut events: mpsc::Receiver<ClientEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            let flow = match event {
                Some(event) => self.handle_event(&session_id, generation, event).await,
                None => {
                    self.handle_close(&session_id, generation, None, "event stream ended".into())
                        .await;
                    ControlFlow::Break(())
                }
            };
            if flow.is_break() {
                break;
            }
        }
        debug!(%session_id, generation, "event loop stopped");
    }

    async fn handle_event(
        self: &Arc<Self>,
        session_id: &SessionId,
        generation: u64,
        event: ClientEvent,
    ) -> ControlFlow<()> {
        match event {
            ClientEvent::CredentialsUpdated(credentials) => {
                if self.current_instance(session_id, generation).is_none() {
                    return ControlFlow::Break(());
                }
                if let Err(e) = self.storage.save_credentials(session_id, &credentials).await {
                    error!(%session_id, error = %e, "failed to persist credentials");
                }
                ControlFlow::Continue(())
            }
            ClientEvent::Messages { batch, kind } => {
                if batch.is_empty() {
                    return ControlFlow::Continue(());
                }
                let Some(instance_id) = self.current_instance(session_id, generation) else {
                    return ControlFlow::Break(());
                };
                for raw in batch {
                    self.forward_message(session_id, &instance_id, kind, raw)
                        .await;
                }
                ControlFlow::Continue(())
            }
            ClientEvent::Connection(ConnectionUpdate::Qr { code }) => {
                self.handle_qr(session_id, generation, code).await
            }
            ClientEvent::Connection(ConnectionUpdate::Open { address }) => {
                self.handle_open(session_id, generation, address).await
            }
            ClientEvent::Connection(ConnectionUpdate::Close { code, reason }) => {
                self.handle_close(session_id, generation, code, reason).await;
                ControlFlow::Break(())
            }
        }
    }

    fn current_instance(&self, session_id: &SessionId, generation: u64) -> Option<String> {
        self.sessions
            .get(session_id)
            .filter(|entry| entry.generation == generation)
            .map(|entry| entry.instance_id.clone())
    }

    async fn handle_qr(
        &self,
        session_id: &SessionId,
        generation: u64,
        code: String,
    ) -> ControlFlow<()> {
        let (verdict, max_attempts, client, instance_id) = {
            let Some(mut entry) = self.sessions.get_mut(session_id) else {
                return ControlFlow::Break(());
            };
            if entry.generation != generation {
                return ControlFlow::Break(());
            }
            let verdict = entry.qr.record(Instant::now());
            let client = match verdict {
                QrVerdict::Issue { .. } => {
                    entry.state = SessionState::AwaitingScan;
                    None
                }
                QrVerdict::Loop { .. } => {
                    entry.state = SessionState::Paused;
                    entry.client.take()
                }
            };
            (
                verdict,
                entry.qr.max_attempts(),
                client,
                entry.instance_id.clone(),
            )
        };

        match verdict {
            QrVerdict::Issue { attempt } => {
                debug!(%session_id, attempt, max_attempts, "pairing code received");
                self.bus.publish(Notification::Qr {
                    session_id: session_id.clone(),
                    code,
                    attempt,
                    max_attempts,
                });
                ControlFlow::Continue(())
            }
            QrVerdict::Loop { attempts } => {
                warn!(%session_id, attempts, "too many pairing codes, pausing session");
                if let Some(client) = client {
                    close_quietly(session_id, client).await;
                }
                self.set_status(&instance_id, SessionState::Paused).await;
                self.bus.publish(Notification::QrLoop {
                    session_id: session_id.clone(),
                    attempts,
                });
                ControlFlow::Break(())
            }
        }
    }

    async fn handle_open(
        &self,
        session_id: &SessionId,
        generation: u64,
        address: String,
    ) -> ControlFlow<()> {
        let instance_id = {
            let Some(mut entry) = self.sessions.get_mut(session_id) else {
                return ControlFlow::Break(());
            };
            if entry.generation != generation {
                return ControlFlow::Break(());
            }
            entry.qr.reset();
            entry.reconnect_attempts = 0;
            entry.state = SessionState::Connected;
            entry.instance_id.clone()
        };

        if let Err(e) = self
            .storage
            .update_instance_address(&instance_id, &address)
            .await
        {
            warn!(%session_id, error = %e, "failed to store instance address");
        }
        self.set_status(&instance_id, SessionState::Connected).await;
        info!(%session_id, instance_id, %address, "session connected");
        self.bus.publish(Notification::Open {
            session_id: session_id.clone(),
            address,
        });
        ControlFlow::Continue(())
    }

    async fn handle_close(
        self: &Arc<Self>,
        session_id: &SessionId,
        generation: u64,
        code: Option<u16>,
        reason: String,
    ) {
        let class = CloseClass::classify(code);
        let plan = match self.sessions.get_mut(session_id) {
            None => ClosePlan::Ignore,
            Some(entry) if entry.generation != generation => ClosePlan::Ignore,
            Some(entry) if entry.state == SessionState::Paused => ClosePlan::Ignore,
            Some(entry) if class.is_terminal() => ClosePlan::Terminal {
                instance_id: entry.instance_id.clone(),
            },
            Some(mut entry) => {
                entry.reconnect_attempts += 1;
                entry.client = None;
                let attempt = entry.reconnect_attempts;
                match self.policy.delay(attempt) {
                    Some(delay) => {
                        entry.state = SessionState::Reconnecting { attempt };
                        ClosePlan::Retry {
                            instance_id: entry.instance_id.clone(),
                            attempt,
                            delay,
                            cancel: entry.cancel.clone(),
                        }
                    }
                    None => ClosePlan::Abandon {
                        instance_id: entry.instance_id.clone(),
                        attempts: attempt - 1,
                    },
                }
            }
        };

        match plan {
            ClosePlan::Ignore => {
                debug!(%session_id, generation, ?code, "close ignored");
            }
            ClosePlan::Terminal { instance_id } => {
                self.evict_generation(session_id, generation);
                if let Err(e) = self.storage.delete_credentials(session_id).await {
                    error!(%session_id, error = %e, "failed to wipe credentials");
                }
                self.set_status(&instance_id, SessionState::Closed).await;
                info!(%session_id, ?code, %reason, "session logged out, credentials wiped");
                self.bus.publish(Notification::Close {
                    session_id: session_id.clone(),
                    code,
                    reason,
                    will_reconnect: false,
                    logged_out: true,
                });
            }
            ClosePlan::Retry {
                instance_id,
                attempt,
                delay,
                cancel,
            } => {
                self.set_status(&instance_id, SessionState::Reconnecting { attempt })
                    .await;
                info!(
                    %session_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    ?code,
                    %reason,
                    "connection closed, reconnect scheduled"
                );
                self.bus.publish(Notification::Close {
                    session_id: session_id.clone(),
                    code,
                    reason,
                    will_reconnect: true,
                    logged_out: false,
                });
                self.schedule_reconnect(session_id.clone(), generation, delay, cancel);
            }
            ClosePlan::Abandon {
                instance_id,
                attempts,
            } => {
                self.evict_generation(session_id, generation);
                self.set_status(&instance_id, SessionState::Idle).await;
                warn!(
                    %session_id,
                    attempts,
                    ?code,
                    %reason,
                    "reconnect attempts exhausted, session abandoned"
                );
                self.bus.publish(Notification::Close {
                    session_id: session_id.clone(),
                    code,
                    reason,
                    will_reconnect: false,
                    logged_out: false,
                });
            }
        }
    }

    fn evict_generation(&self, session_id: &SessionId, generation: u64) {
        if let Some((_, entry)) = self
            .sessions
            .remove_if(session_id, |_, entry| entry.generation == generation)
        {
            entry.cancel.cancel();
        }
    }

    fn schedule_reconnect(
        self: &Arc<Self>,
        session_id: SessionId,
        generation: u64,
        delay: Duration,
        cancel: CancellationToken,
    ) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%session_id, "reconnect timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    inner.reconnect(session_id, generation).await;
                }
            }
        });
    }

    async fn reconnect(self: Arc<Self>, session_id: SessionId, generation: u64) {
        let (instance_id, qr, attempts) = {
            let Some(entry) = self.sessions.get(&session_id) else {
                return;
            };
            if entry.generation != generation
                || !matches!(entry.state, SessionState::Reconnecting { .. })
            {
                return;
            }
            (
                entry.instance_id.clone(),
                entry.qr.clone(),
                entry.reconnect_attempts,
            )
        };

        info!(%session_id, attempt = attempts, "reconnecting session");
        if let Err(e) = self
            .open_client(&session_id, &instance_id, qr, attempts, Some(generation))
            .await
        {
            warn!(%session_id, attempt = attempts, error = %e, "reconnect attempt failed");
            self.handle_close(&session_id, generation, None, e.to_string())
                .await;
        }
    }

    async fn forward_message(
        &self,
        session_id: &SessionId,
        instance_id: &str,
        kind: BatchKind,
        raw: RawMessage,
    ) {
        if !is_trackable(&raw.remote_address) {
            debug!(
                %session_id,
                address = %raw.remote_address,
                "skipping group or broadcast message"
            );
            return;
        }
        let Some(extracted) = extract_text(&raw.parts) else {
            debug!(%session_id, id = ?raw.id, "skipping message without text");
            return;
        };

        let direction = if raw.from_me {
            Direction::Outbound
        } else {
            Direction::Inbound
        };
        let request = IngestRequest {
            direction,
            body: extracted.body.clone(),
            content_kind: extracted.kind,
            timestamp: raw.timestamp,
            network_message_id: raw.id.clone(),
            sender_name: raw.push_name.clone(),
        };

        match self
            .analytics
            .ingest(instance_id, &raw.remote_address, request)
            .await
        {
            Ok(Some(outcome)) => {
                self.publish_message(session_id, instance_id, &outcome, direction, extracted.body);
            }
            Ok(None) => {
                debug!(%session_id, ?kind, id = ?raw.id, "message already recorded");
            }
            Err(e) => {
                error!(%session_id, instance_id, ?kind, error = %e, "dropping message");
            }
        }
    }

    fn publish_message(
        &self,
        session_id: &SessionId,
        instance_id: &str,
        outcome: &IngestOutcome,
        direction: Direction,
        body: String,
    ) {
        self.bus.publish(Notification::Message {
            session_id: session_id.clone(),
            instance_id: instance_id.to_string(),
            contact: outcome.contact.clone(),
            direction,
            body,
            is_new_contact: outcome.is_new_contact,
            is_returning_contact: outcome.is_returning_contact,
        });
    }
}

async fn close_quietly(session_id: &SessionId, client: Arc<dyn NetworkClient>) {
    if let Err(e) = client.close().await {
        debug!(%session_id, error = %e, "client close failed");
    }
}

fn session_creation(
    session_id: &SessionId,
    message: &str,
    source: ReplyscopeError,
) -> ReplyscopeError {
    match source {
        e @ ReplyscopeError::SessionCreation { .. } => e,
        other => ReplyscopeError::SessionCreation {
            session_id: session_id.to_string(),
            message: format!("{message}: {other}"),
            source: Some(Box::new(other)),
        },
    }
}
