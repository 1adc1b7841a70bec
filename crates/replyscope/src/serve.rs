// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `replyscope serve` command implementation.
//!
//! Wires SQLite storage, the analytics engine, the notification bus, the
//! sidecar bridge, and the connection supervisor together, restores stored
//! sessions, and runs until SIGINT/SIGTERM.

use std::sync::Arc;

use replyscope_analytics::AnalyticsEngine;
use replyscope_bridge::BridgeFactory;
use replyscope_bus::{EventBus, ListenerHandle, register_logging_listener};
use replyscope_config::model::ReplyscopeConfig;
use replyscope_core::{HealthStatus, PluginAdapter, ReplyscopeError, StorageAdapter};
use replyscope_storage::SqliteStorage;
use replyscope_supervisor::{ConnectionSupervisor, install_signal_handler};
use tracing::{info, warn};

#[cfg(feature = "prometheus")]
use std::time::Duration;

#[cfg(feature = "prometheus")]
use replyscope_prometheus::PrometheusAdapter;
#[cfg(feature = "prometheus")]
use tokio_util::sync::CancellationToken;

/// How often the session gauges are refreshed.
#[cfg(feature = "prometheus")]
const GAUGE_INTERVAL: Duration = Duration::from_secs(15);

/// Runs the `replyscope serve` command.
pub async fn run_serve(config: ReplyscopeConfig) -> Result<(), ReplyscopeError> {
    info!(name = %config.service.name, "starting replyscope serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let store: Arc<dyn StorageAdapter> = storage.clone();

    let analytics = Arc::new(AnalyticsEngine::new(store.clone(), config.analytics.clone()));
    let bus = EventBus::new(config.supervisor.event_buffer);
    #[cfg_attr(not(feature = "prometheus"), allow(unused_mut))]
    let mut listeners: Vec<ListenerHandle> = vec![register_logging_listener(&bus)];

    #[cfg(feature = "prometheus")]
    let prometheus = if config.prometheus.enabled {
        match PrometheusAdapter::new(&config.prometheus) {
            Ok(adapter) => {
                listeners.push(replyscope_prometheus::register_metrics_listener(&bus));
                info!(address = %adapter.listen_address(), "prometheus metrics enabled");
                Some(adapter)
            }
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        None
    };

    let factory = Arc::new(BridgeFactory::new(
        config.bridge.clone(),
        config.supervisor.event_buffer,
    ));
    match factory.health_check().await? {
        HealthStatus::Healthy => info!(url = %config.bridge.url, "bridge sidecar reachable"),
        HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => {
            warn!(%reason, "bridge sidecar not ready, connects will fail until it is up")
        }
    }

    let supervisor = ConnectionSupervisor::new(
        store,
        factory.clone(),
        analytics,
        bus,
        config.supervisor.clone(),
    );

    let cancel = install_signal_handler();

    #[cfg(feature = "prometheus")]
    let gauges = prometheus
        .as_ref()
        .map(|_| tokio::spawn(refresh_session_gauges(supervisor.clone(), cancel.clone())));

    if config.supervisor.restore_on_startup {
        supervisor.restore_sessions().await;
    }

    info!("replyscope serve ready");
    cancel.cancelled().await;
    info!("shutdown signal received, evicting sessions");

    supervisor.shutdown().await;

    #[cfg(feature = "prometheus")]
    if let Some(task) = gauges {
        let _ = task.await;
    }

    for listener in listeners {
        listener.abort();
    }
    if let Err(e) = factory.shutdown().await {
        warn!(error = %e, "bridge shutdown failed");
    }
    storage.close().await?;

    info!("replyscope serve shutdown complete");
    Ok(())
}

/// Publish session counts to the gauges until cancelled.
#[cfg(feature = "prometheus")]
async fn refresh_session_gauges(supervisor: ConnectionSupervisor, cancel: CancellationToken) {
    use replyscope_supervisor::SessionState;

    let mut interval = tokio::time::interval(GAUGE_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let sessions = supervisor.active_sessions();
                let connected = sessions
                    .iter()
                    .filter(|s| s.state == SessionState::Connected)
                    .count();
                replyscope_prometheus::set_sessions(sessions.len(), connected);
            }
        }
    }
    replyscope_prometheus::set_sessions(0, 0);
}
