// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use metrics::{describe_counter, describe_gauge};
use replyscope_bus::Notification;
use replyscope_core::Direction;

/// Register all Replyscope metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "replyscope_messages_ingested_total",
        "Messages recorded by the analytics engine"
    );
    describe_counter!("replyscope_new_contacts_total", "First messages from new contacts");
    describe_counter!(
        "replyscope_returning_contacts_total",
        "Inbound messages after a long silence"
    );
    describe_counter!("replyscope_qr_codes_total", "Pairing codes issued");
    describe_counter!("replyscope_qr_loops_total", "Sessions paused after a QR loop");
    describe_counter!("replyscope_reconnects_total", "Reconnects scheduled after a close");
    describe_counter!("replyscope_logouts_total", "Sessions closed by logout or refusal");
    describe_gauge!("replyscope_active_sessions", "Sessions held in memory");
    describe_gauge!("replyscope_connected_sessions", "Sessions currently online");
}

/// Record an ingested message.
pub fn record_message(direction: Direction, is_new: bool, is_returning: bool) {
    metrics::counter!("replyscope_messages_ingested_total", "direction" => direction.to_string())
        .increment(1);
    if is_new {
        metrics::counter!("replyscope_new_contacts_total").increment(1);
    }
    if is_returning {
        metrics::counter!("replyscope_returning_contacts_total").increment(1);
    }
}

pub fn record_qr_code() {
    metrics::counter!("replyscope_qr_codes_total").increment(1);
}

pub fn record_qr_loop() {
    metrics::counter!("replyscope_qr_loops_total").increment(1);
}

pub fn record_reconnect() {
    metrics::counter!("replyscope_reconnects_total").increment(1);
}

pub fn record_logout() {
    metrics::counter!("replyscope_logouts_total").increment(1);
}

/// Set the session gauges.
pub fn set_sessions(active: usize, connected: usize) {
    metrics::gauge!("replyscope_active_sessions").set(active as f64);
    metrics::gauge!("replyscope_connected_sessions").set(connected as f64);
}

/// Update counters for one bus notification.
pub fn observe(notification: &Notification) {
    match notification {
        Notification::Qr { .. } => record_qr_code(),
        Notification::QrLoop { .. } => record_qr_loop(),
        Notification::Close {
            will_reconnect: true,
            ..
        } => record_reconnect(),
        Notification::Close {
            logged_out: true, ..
        } => record_logout(),
        Notification::Close { .. } | Notification::Open { .. } => {}
        Notification::Message {
            direction,
            is_new_contact,
            is_returning_contact,
            ..
        } => record_message(*direction, *is_new_contact, *is_returning_contact),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use replyscope_core::{Contact, SessionId};

    fn contact() -> Contact {
        Contact {
            id: 1,
            instance_id: "i".into(),
            address: "1@s.whatsapp.net".into(),
            name: None,
            first_seen: 0,
            last_seen: 0,
            sent_count: 0,
            received_count: 1,
            return_count: 0,
        }
    }

    #[test]
    fn notifications_update_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            observe(&Notification::Message {
                session_id: SessionId::from("s"),
                instance_id: "i".into(),
                contact: contact(),
                direction: Direction::Inbound,
                body: "hi".into(),
                is_new_contact: true,
                is_returning_contact: false,
            });
            observe(&Notification::Close {
                session_id: SessionId::from("s"),
                code: Some(428),
                reason: "lost".into(),
                will_reconnect: true,
                logged_out: false,
            });
            observe(&Notification::QrLoop {
                session_id: SessionId::from("s"),
                attempts: 6,
            });
            set_sessions(3, 2);
        });

        let text = handle.render();
        assert!(text.contains(r#"replyscope_messages_ingested_total{direction="inbound"} 1"#));
        assert!(text.contains("replyscope_new_contacts_total 1"));
        assert!(text.contains("replyscope_reconnects_total 1"));
        assert!(text.contains("replyscope_qr_loops_total 1"));
        assert!(text.contains("replyscope_connected_sessions 2"));
        assert!(!text.contains("replyscope_logouts_total 1"));
    }
}
