// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for Replyscope.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Counters are fed
//! by an event bus listener; session gauges are refreshed by the serve loop.

pub mod recording;

use std::net::SocketAddr;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use replyscope_bus::{EventBus, ListenerHandle};
use replyscope_config::model::PrometheusConfig;
use replyscope_core::{AdapterType, BoxError, HealthStatus, PluginAdapter, ReplyscopeError};

pub use recording::{observe, register_metrics, set_sessions};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder globally and serves the scrape endpoint
/// on `listen_address`.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
    listen_address: SocketAddr,
}

impl PrometheusAdapter {
    /// Install the recorder and spawn the HTTP exporter.
    ///
    /// Only one recorder can be installed per process. Must be called from
    /// within a Tokio runtime.
    pub fn new(config: &PrometheusConfig) -> Result<Self, ReplyscopeError> {
        let listen_address: SocketAddr = config.listen_address.parse().map_err(|e| {
            ReplyscopeError::Config(format!(
                "invalid prometheus.listen_address {:?}: {e}",
                config.listen_address
            ))
        })?;

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(listen_address)
            .build()
            .map_err(|e| {
                ReplyscopeError::Internal(format!("failed to build Prometheus exporter: {e}"))
            })?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|e| {
            ReplyscopeError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        tokio::spawn(async move {
            if let Err(e) = exporter.await {
                tracing::error!(error = ?e, "prometheus exporter stopped");
            }
        });

        register_metrics();
        tracing::info!(%listen_address, "prometheus metrics recorder installed");

        Ok(Self {
            handle,
            listen_address,
        })
    }

    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Feed every bus notification into the metric counters.
pub fn register_metrics_listener(bus: &EventBus) -> ListenerHandle {
    bus.register_listener("metrics", |envelope| async move {
        observe(&envelope.notification);
        Ok::<(), BoxError>(())
    })
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, ReplyscopeError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ReplyscopeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use replyscope_bus::Notification;
    use replyscope_core::SessionId;

    #[tokio::test]
    async fn bus_listener_feeds_counters() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        // Current-thread runtime: the listener task sees this thread's recorder.
        let _guard = metrics::set_default_local_recorder(&recorder);

        let bus = EventBus::new(8);
        let listener = register_metrics_listener(&bus);
        bus.publish(Notification::Close {
            session_id: SessionId::from("session-x"),
            code: Some(401),
            reason: "logged out".into(),
            will_reconnect: false,
            logged_out: true,
        });

        for _ in 0..100 {
            if handle.render().contains("replyscope_logouts_total 1") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(handle.render().contains("replyscope_logouts_total 1"));
        assert!(!handle.render().contains("replyscope_reconnects_total 1"));
        listener.abort();
    }

    #[test]
    fn bad_listen_address_is_a_config_error() {
        let config = PrometheusConfig {
            enabled: true,
            listen_address: "not an address".into(),
        };
        assert!(matches!(
            PrometheusAdapter::new(&config),
            Err(ReplyscopeError::Config(_))
        ));
    }
}
