// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session state machine and registry entries.
//!
//! A session moves Idle -> Connecting -> AwaitingScan -> Connected. A
//! transient close moves it to Reconnecting; too many pairing codes move it
//! to Paused until a manual connect. Closed is terminal.
//!
//! The persisted instance status is always derived from the state through
//! [`SessionState::instance_status`].

use std::fmt;
use std::sync::Arc;

use replyscope_core::{InstanceStatus, NetworkClient, SessionId};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::policy::QrLoopGuard;

/// States in the session FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Not held in memory. Stored credentials, if any, are kept.
    Idle,
    /// Client opened, waiting for the first connection event.
    Connecting,
    /// A pairing code is on screen.
    AwaitingScan,
    /// Paired and online.
    Connected,
    /// Waiting out the backoff before reconnect `attempt`.
    Reconnecting { attempt: u32 },
    /// Paused after a QR loop; only a manual connect resumes it.
    Paused,
    /// Logged out or refused; the session is gone.
    Closed,
}

impl SessionState {
    /// Instance status persisted for this state.
    pub fn instance_status(self) -> InstanceStatus {
        match self {
            SessionState::Connected => InstanceStatus::Connected,
            SessionState::Connecting
            | SessionState::AwaitingScan
            | SessionState::Reconnecting { .. } => InstanceStatus::Connecting,
            SessionState::Idle | SessionState::Paused | SessionState::Closed => {
                InstanceStatus::Disconnected
            }
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::AwaitingScan => write!(f, "awaiting_scan"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Reconnecting { attempt } => write!(f, "reconnecting({attempt})"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Registry entry for one live session.
pub(crate) struct SessionEntry {
    pub instance_id: String,
    /// Bumped every time a new client is opened; events from older clients
    /// are ignored.
    pub generation: u64,
    pub state: SessionState,
    pub client: Option<Arc<dyn NetworkClient>>,
    pub qr: QrLoopGuard,
    pub reconnect_attempts: u32,
    /// Cancels the event task and any pending reconnect timer.
    pub cancel: CancellationToken,
}

impl SessionEntry {
    pub fn snapshot(&self, session_id: &SessionId) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.clone(),
            instance_id: self.instance_id.clone(),
            state: self.state,
            qr_attempts: self.qr.count(),
            reconnect_attempts: self.reconnect_attempts,
        }
    }
}

/// Read-only view of a session for callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub instance_id: String,
    #[serde(flatten)]
    pub state: SessionState,
    pub qr_attempts: u32,
    pub reconnect_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_map_to_instance_status() {
        assert_eq!(
            SessionState::Connected.instance_status(),
            InstanceStatus::Connected
        );
        assert_eq!(
            SessionState::Reconnecting { attempt: 3 }.instance_status(),
            InstanceStatus::Connecting
        );
        assert_eq!(
            SessionState::Paused.instance_status(),
            InstanceStatus::Disconnected
        );
        assert_eq!(
            SessionState::Idle.instance_status(),
            InstanceStatus::Disconnected
        );
        assert_eq!(
            SessionState::Closed.instance_status(),
            InstanceStatus::Disconnected
        );
    }

    #[test]
    fn display_includes_attempt() {
        assert_eq!(
            SessionState::Reconnecting { attempt: 2 }.to_string(),
            "reconnecting(2)"
        );
        assert_eq!(SessionState::AwaitingScan.to_string(), "awaiting_scan");
    }
}
