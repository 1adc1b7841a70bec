// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle scenarios driven through mock network clients.

use replyscope_bus::Notification;
use replyscope_core::{CredentialSet, InstanceStatus, ReplyscopeError, SessionId};
use replyscope_supervisor::SessionState;
use replyscope_test_utils::{TestHarness, eventually, next_of_kind};

const ME: &str = "5511900000000@s.whatsapp.net";

fn creds(pairs: &[(&str, &str)]) -> CredentialSet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn status_of(harness: &TestHarness, session: &SessionId) -> Option<InstanceStatus> {
    harness.instance_for(session).await.map(|i| i.status)
}

#[tokio::test]
async fn connect_unknown_session_is_not_found() {
    let harness = TestHarness::new().await.unwrap();
    let err = harness
        .supervisor
        .connect(&SessionId::from("nope"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ReplyscopeError::NotFound { kind: "instance", .. }));
}

#[tokio::test]
async fn open_failure_surfaces_session_creation() {
    let harness = TestHarness::new().await.unwrap();
    let instance = harness.create_instance("desk").await.unwrap();
    harness.factory.fail_next_open("sidecar unreachable").await;

    let err = harness
        .supervisor
        .connect(&instance.session_id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ReplyscopeError::SessionCreation { .. }));
    assert!(harness.supervisor.session_state(&instance.session_id).is_none());
    assert_eq!(
        status_of(&harness, &instance.session_id).await,
        Some(InstanceStatus::Disconnected)
    );
}

#[tokio::test]
async fn qr_then_open_marks_instance_connected() {
    let harness = TestHarness::new().await.unwrap();
    let mut rx = harness.bus.subscribe();
    let (instance, client) = harness.connect_instance("desk").await.unwrap();
    let session = &instance.session_id;
    assert_eq!(
        harness.supervisor.session_state(session),
        Some(SessionState::Connecting)
    );

    client.emit_qr("2@first").await;
    let qr = next_of_kind(&mut rx, "qr").await.unwrap();
    match qr.notification {
        Notification::Qr {
            code,
            attempt,
            max_attempts,
            ..
        } => {
            assert_eq!(code, "2@first");
            assert_eq!(attempt, 1);
            assert_eq!(max_attempts, 5);
        }
        other => panic!("unexpected notification {other:?}"),
    }
    assert_eq!(
        harness.supervisor.session_state(session),
        Some(SessionState::AwaitingScan)
    );

    client.emit_open(ME).await;
    next_of_kind(&mut rx, "open").await.unwrap();
    assert_eq!(
        harness.supervisor.session_state(session),
        Some(SessionState::Connected)
    );
    let stored = harness.instance_for(session).await.unwrap();
    assert_eq!(stored.status, InstanceStatus::Connected);
    assert_eq!(stored.address.as_deref(), Some(ME));

    // A healthy session is returned as-is.
    let state = harness.supervisor.connect(session, false).await.unwrap();
    assert_eq!(state, SessionState::Connected);
    assert_eq!(harness.factory.open_count(session).await, 1);
}

#[tokio::test]
async fn sixth_qr_pauses_until_manual_connect() {
    let harness = TestHarness::new().await.unwrap();
    let mut rx = harness.bus.subscribe();
    let (instance, client) = harness.connect_instance("desk").await.unwrap();
    let session = &instance.session_id;
    client.emit_credentials(creds(&[("noise", "k1")])).await;

    for n in 1..=6 {
        client.emit_qr(&format!("2@code{n}")).await;
    }
    for _ in 1..=5 {
        next_of_kind(&mut rx, "qr").await.unwrap();
    }
    let paused = next_of_kind(&mut rx, "qr-loop").await.unwrap();
    assert!(matches!(
        paused.notification,
        Notification::QrLoop { attempts: 6, .. }
    ));
    assert_eq!(
        harness.supervisor.session_state(session),
        Some(SessionState::Paused)
    );
    assert!(client.is_closed());
    assert_eq!(
        status_of(&harness, session).await,
        Some(InstanceStatus::Disconnected)
    );
    // Pausing keeps credentials.
    let stored = harness.storage.load_credentials(session).await.unwrap();
    assert_eq!(stored.get("noise").map(String::as_str), Some("k1"));

    // A close from the paused client schedules nothing.
    client.emit_close(Some(428), "closed").await;

    let state = harness.supervisor.connect(session, false).await.unwrap();
    assert_eq!(state, SessionState::Connecting);
    let fresh = harness.factory.client(session).await.unwrap();
    assert_eq!(fresh.credentials().get("noise").map(String::as_str), Some("k1"));
    fresh.emit_qr("2@again").await;
    let qr = next_of_kind(&mut rx, "qr").await.unwrap();
    assert!(matches!(qr.notification, Notification::Qr { attempt: 1, .. }));
}

#[tokio::test]
async fn logout_wipes_credentials_and_removes_session() {
    let harness = TestHarness::new().await.unwrap();
    let (instance, client, mut rx) = harness.online_instance("desk", ME).await.unwrap();
    let session = &instance.session_id;
    client.emit_credentials(creds(&[("me", "x")])).await;
    client.emit_close(Some(401), "logged out").await;

    let close = next_of_kind(&mut rx, "close").await.unwrap();
    assert!(matches!(
        close.notification,
        Notification::Close {
            will_reconnect: false,
            logged_out: true,
            code: Some(401),
            ..
        }
    ));
    assert!(harness.supervisor.session_state(session).is_none());
    assert!(harness.storage.load_credentials(session).await.unwrap().is_empty());
    assert_eq!(
        status_of(&harness, session).await,
        Some(InstanceStatus::Disconnected)
    );
}

#[tokio::test]
async fn transient_close_reconnects_with_same_credentials() {
    let harness = TestHarness::builder()
        .with_fast_reconnect(10)
        .build()
        .await
        .unwrap();
    let (instance, client, mut rx) = harness.online_instance("desk", ME).await.unwrap();
    let session = &instance.session_id;
    client.emit_credentials(creds(&[("me", "x")])).await;
    client.emit_close(Some(428), "connection lost").await;

    let close = next_of_kind(&mut rx, "close").await.unwrap();
    assert!(matches!(
        close.notification,
        Notification::Close {
            will_reconnect: true,
            logged_out: false,
            ..
        }
    ));
    assert_eq!(
        status_of(&harness, session).await,
        Some(InstanceStatus::Connecting)
    );

    let second = harness.factory.wait_for_open_count(session, 2).await.unwrap();
    assert_eq!(second.credentials().get("me").map(String::as_str), Some("x"));
    let snapshot = harness
        .supervisor
        .active_sessions()
        .into_iter()
        .find(|s| &s.session_id == session)
        .unwrap();
    assert_eq!(snapshot.reconnect_attempts, 1);

    second.emit_open(ME).await;
    next_of_kind(&mut rx, "open").await.unwrap();
    let snapshot = harness.supervisor.active_sessions().remove(0);
    assert_eq!(snapshot.state, SessionState::Connected);
    assert_eq!(snapshot.reconnect_attempts, 0);
}

#[tokio::test]
async fn reconnect_gives_up_after_attempt_limit() {
    let harness = TestHarness::builder()
        .with_fast_reconnect(2)
        .build()
        .await
        .unwrap();
    let (instance, client, mut rx) = harness.online_instance("desk", ME).await.unwrap();
    let session = &instance.session_id;
    client.emit_credentials(creds(&[("me", "x")])).await;
    harness.factory.fail_next_open("down").await;
    harness.factory.fail_next_open("still down").await;

    client.emit_close(Some(500), "stream error").await;

    let mut final_close = None;
    for _ in 0..3 {
        let close = next_of_kind(&mut rx, "close").await.unwrap();
        if let Notification::Close {
            will_reconnect: false,
            ..
        } = close.notification
        {
            final_close = Some(close);
            break;
        }
    }
    let final_close = final_close.expect("session should be abandoned");
    assert!(matches!(
        final_close.notification,
        Notification::Close {
            logged_out: false,
            ..
        }
    ));
    assert!(harness.supervisor.session_state(session).is_none());
    assert_eq!(harness.factory.open_count(session).await, 1);
    // Abandoning keeps credentials for a later manual connect.
    assert!(!harness.storage.load_credentials(session).await.unwrap().is_empty());
    assert_eq!(
        status_of(&harness, session).await,
        Some(InstanceStatus::Disconnected)
    );
}

#[tokio::test]
async fn manual_connect_cancels_pending_reconnect() {
    let harness = TestHarness::new().await.unwrap();
    let (instance, client, mut rx) = harness.online_instance("desk", ME).await.unwrap();
    let session = &instance.session_id;
    client.emit_close(Some(428), "lost").await;
    next_of_kind(&mut rx, "close").await.unwrap();
    assert_eq!(
        harness.supervisor.session_state(session),
        Some(SessionState::Reconnecting { attempt: 1 })
    );

    harness.supervisor.connect(session, false).await.unwrap();
    assert_eq!(harness.factory.open_count(session).await, 2);
    let snapshot = harness.supervisor.active_sessions().remove(0);
    assert_eq!(snapshot.state, SessionState::Connecting);
    assert_eq!(snapshot.reconnect_attempts, 0);
}

#[tokio::test]
async fn force_new_discards_credentials() {
    let harness = TestHarness::new().await.unwrap();
    let (instance, client, _rx) = harness.online_instance("desk", ME).await.unwrap();
    let session = &instance.session_id;
    client.emit_credentials(creds(&[("me", "x")])).await;
    assert!(
        eventually(|| async {
            !harness.storage.load_credentials(session).await.unwrap().is_empty()
        })
        .await
    );

    harness.supervisor.connect(session, true).await.unwrap();
    assert!(client.is_closed());
    let fresh = harness.factory.client(session).await.unwrap();
    assert!(fresh.credentials().is_empty());
}

#[tokio::test]
async fn disconnect_and_remove_are_idempotent() {
    let harness = TestHarness::new().await.unwrap();
    let (instance, client, _rx) = harness.online_instance("desk", ME).await.unwrap();
    let session = &instance.session_id;
    client.emit_credentials(creds(&[("me", "x")])).await;
    assert!(
        eventually(|| async {
            !harness.storage.load_credentials(session).await.unwrap().is_empty()
        })
        .await
    );

    harness.supervisor.disconnect(session).await.unwrap();
    harness.supervisor.disconnect(session).await.unwrap();
    assert!(client.is_closed());
    assert!(!harness.storage.load_credentials(session).await.unwrap().is_empty());

    harness.supervisor.remove(session).await.unwrap();
    harness.supervisor.remove(session).await.unwrap();
    assert!(harness.storage.load_credentials(session).await.unwrap().is_empty());
    assert!(harness.supervisor.active_sessions().is_empty());
}

#[tokio::test]
async fn restore_reconnects_sessions_with_credentials() {
    let harness = TestHarness::new().await.unwrap();
    let paired = harness.create_instance("paired").await.unwrap();
    let unpaired = harness.create_instance("unpaired").await.unwrap();
    harness
        .storage
        .save_credentials(&paired.session_id, &creds(&[("me", "x")]))
        .await
        .unwrap();
    // Orphaned credentials without an instance row are skipped.
    harness
        .storage
        .save_credentials(&SessionId::from("ghost"), &creds(&[("me", "y")]))
        .await
        .unwrap();

    let restored = harness.supervisor.restore_sessions().await;
    assert_eq!(restored, 1);
    assert_eq!(harness.factory.open_count(&paired.session_id).await, 1);
    assert_eq!(harness.factory.open_count(&unpaired.session_id).await, 0);
}

#[tokio::test]
async fn shutdown_evicts_without_wiping() {
    let harness = TestHarness::new().await.unwrap();
    let (instance, client, _rx) = harness.online_instance("desk", ME).await.unwrap();
    let session = &instance.session_id;
    client.emit_credentials(creds(&[("me", "x")])).await;
    assert!(
        eventually(|| async {
            !harness.storage.load_credentials(session).await.unwrap().is_empty()
        })
        .await
    );

    harness.supervisor.shutdown().await;
    assert!(harness.supervisor.active_sessions().is_empty());
    assert!(client.is_closed());
    assert!(!harness.storage.load_credentials(session).await.unwrap().is_empty());
    assert_eq!(
        status_of(&harness, session).await,
        Some(InstanceStatus::Disconnected)
    );
    assert!(harness.supervisor.connect(session, false).await.is_err());
}
