// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in listener that writes every notification to the log.

use replyscope_core::BoxError;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, ListenerHandle};
use crate::notification::{Envelope, Notification};

/// Log one notification at a level matching its importance.
pub fn log_notification(envelope: &Envelope) {
    let seq = envelope.sequence;
    match &envelope.notification {
        Notification::Qr {
            session_id,
            attempt,
            max_attempts,
            ..
        } => info!(%session_id, seq, attempt, max_attempts, "pairing code issued"),
        Notification::Open {
            session_id,
            address,
        } => info!(%session_id, seq, %address, "session connected"),
        Notification::Close {
            session_id,
            code,
            reason,
            will_reconnect,
            logged_out,
        } => info!(
            %session_id,
            seq,
            code = ?code,
            %reason,
            will_reconnect,
            logged_out,
            "session closed"
        ),
        Notification::QrLoop {
            session_id,
            attempts,
        } => warn!(%session_id, seq, attempts, "pairing paused after repeated codes"),
        Notification::Message {
            session_id,
            instance_id,
            contact,
            direction,
            is_new_contact,
            is_returning_contact,
            ..
        } => debug!(
            %session_id,
            seq,
            %instance_id,
            contact_id = contact.id,
            %direction,
            is_new_contact,
            is_returning_contact,
            "message recorded"
        ),
    }
}

/// Attach the logging listener to `bus`.
pub fn register_logging_listener(bus: &EventBus) -> ListenerHandle {
    bus.register_listener("logging", |envelope| async move {
        log_notification(&envelope);
        Ok::<(), BoxError>(())
    })
}
