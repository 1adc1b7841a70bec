// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One sidecar socket per session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use replyscope_core::{
    ClientEvent, ConnectionUpdate, NetworkClient, ReplyscopeError, SentReceipt, SessionId,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::protocol::{Command, Frame, Routed};

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<Result<SentReceipt, String>>>>>;

/// A [`NetworkClient`] backed by a sidecar WebSocket.
pub struct BridgeClient {
    session_id: SessionId,
    commands: mpsc::Sender<Command>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    request_timeout: Duration,
}

impl BridgeClient {
    /// Wire up reader and writer tasks over an established socket.
    ///
    /// The returned receiver carries every event the sidecar reports. When
    /// the socket drops without a local `close`, a synthetic close event is
    /// emitted so the supervisor can reconnect.
    pub(crate) fn spawn<S>(
        session_id: SessionId,
        socket: WebSocketStream<S>,
        event_buffer: usize,
        request_timeout: Duration,
    ) -> (Self, mpsc::Receiver<ClientEvent>)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = socket.split();
        let (command_tx, command_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(write_loop(session_id.clone(), sink, command_rx));
        tokio::spawn(read_loop(
            session_id.clone(),
            stream,
            event_tx,
            Arc::clone(&pending),
            Arc::clone(&closed),
        ));

        let client = Self {
            session_id,
            commands: command_tx,
            pending,
            closed,
            request_timeout,
        };
        (client, event_rx)
    }

    /// Queue a command for the writer task.
    pub(crate) async fn submit(&self, command: Command) -> Result<(), ReplyscopeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ReplyscopeError::Channel {
                message: format!("bridge socket for {} is closed", self.session_id),
                source: None,
            })
    }
}

#[async_trait]
impl NetworkClient for BridgeClient {
    async fn send(&self, address: &str, text: &str) -> Result<SentReceipt, ReplyscopeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ReplyscopeError::Channel {
                message: format!("bridge socket for {} is closed", self.session_id),
                source: None,
            });
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id.clone(), tx);

        if let Err(e) = self
            .submit(Command::Send {
                request_id: request_id.clone(),
                address: address.to_string(),
                text: text.to_string(),
            })
            .await
        {
            self.pending.lock().await.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(Ok(receipt))) => Ok(receipt),
            Ok(Ok(Err(message))) => Err(ReplyscopeError::Channel {
                message: format!("sidecar rejected send: {message}"),
                source: None,
            }),
            Ok(Err(_)) => Err(ReplyscopeError::Channel {
                message: "bridge socket closed before the send was acknowledged".into(),
                source: None,
            }),
            Err(_) => {
                self.pending.lock().await.remove(&request_id);
                Err(ReplyscopeError::Timeout {
                    duration: self.request_timeout,
                })
            }
        }
    }

    async fn close(&self) -> Result<(), ReplyscopeError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(session_id = %self.session_id, "closing bridge socket");
        // The writer may already be gone if the socket dropped.
        let _ = self.commands.send(Command::Close).await;
        Ok(())
    }
}

async fn write_loop<S>(
    session_id: SessionId,
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut commands: mpsc::Receiver<Command>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(command) = commands.recv().await {
        let is_close = matches!(command, Command::Close);
        let json = match serde_json::to_string(&command) {
            Ok(json) => json,
            Err(e) => {
                warn!(%session_id, error = %e, "failed to encode bridge command");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::text(json)).await {
            debug!(%session_id, error = %e, "bridge write failed");
            break;
        }
        if is_close {
            let _ = sink.send(Message::Close(None)).await;
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop<S>(
    session_id: SessionId,
    mut stream: SplitStream<WebSocketStream<S>>,
    events: mpsc::Sender<ClientEvent>,
    pending: Pending,
    closed: Arc<AtomicBool>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut close_forwarded = false;
    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(%session_id, error = %e, "bridge read failed");
                break;
            }
        };

        let frame: Frame = match serde_json::from_str(text.as_str()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%session_id, error = %e, "ignoring malformed sidecar frame");
                continue;
            }
        };

        match frame.route() {
            Routed::Event(event) => {
                let is_close = matches!(
                    event,
                    ClientEvent::Connection(ConnectionUpdate::Close { .. })
                );
                if events.send(event).await.is_err() {
                    break;
                }
                if is_close {
                    close_forwarded = true;
                }
            }
            Routed::Reply { request_id, result } => {
                let waiter = pending.lock().await.remove(&request_id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(result.map(|(message_id, timestamp)| SentReceipt {
                            message_id,
                            timestamp,
                        }));
                    }
                    None => debug!(%session_id, request_id, "reply for unknown request"),
                }
            }
            Routed::Fault(message) => warn!(%session_id, %message, "sidecar reported an error"),
        }
    }

    // Drop outstanding waiters so their sends fail fast.
    pending.lock().await.clear();

    if !closed.load(Ordering::SeqCst) && !close_forwarded {
        let _ = events
            .send(ClientEvent::Connection(ConnectionUpdate::Close {
                code: None,
                reason: "bridge connection lost".into(),
            }))
            .await;
    }
    debug!(%session_id, "bridge reader stopped");
}
