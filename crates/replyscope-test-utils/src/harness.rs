// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles temp SQLite storage, the analytics engine, the
//! event bus, and a supervisor driving [`MockNetworkFactory`] clients.

use std::sync::Arc;
use std::time::Duration;

use replyscope_analytics::AnalyticsEngine;
use replyscope_bus::{Envelope, EventBus};
use replyscope_config::model::{AnalyticsConfig, StorageConfig, SupervisorConfig};
use replyscope_core::{Instance, ReplyscopeError, SessionId, StorageAdapter};
use replyscope_storage::SqliteStorage;
use replyscope_supervisor::ConnectionSupervisor;
use tokio::sync::broadcast;

use crate::mock_network::{MockClient, MockNetworkFactory};

const WAIT: Duration = Duration::from_secs(5);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    supervisor: SupervisorConfig,
    analytics: AnalyticsConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }

    pub fn with_supervisor_config(mut self, config: SupervisorConfig) -> Self {
        self.supervisor = config;
        self
    }

    pub fn with_analytics_config(mut self, config: AnalyticsConfig) -> Self {
        self.analytics = config;
        self
    }

    /// Reconnect quickly so backoff paths finish within a test.
    pub fn with_fast_reconnect(mut self, max_attempts: u32) -> Self {
        self.supervisor.reconnect_base_delay_ms = 10;
        self.supervisor.reconnect_max_delay_ms = 40;
        self.supervisor.reconnect_max_attempts = max_attempts;
        self
    }

    pub async fn build(self) -> Result<TestHarness, ReplyscopeError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ReplyscopeError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let analytics = Arc::new(AnalyticsEngine::new(
            Arc::clone(&storage),
            self.analytics,
        ));
        let bus = EventBus::new(self.supervisor.event_buffer);
        let factory = Arc::new(MockNetworkFactory::new());
        let supervisor = ConnectionSupervisor::new(
            Arc::clone(&storage),
            factory.clone(),
            Arc::clone(&analytics),
            bus.clone(),
            self.supervisor,
        );

        Ok(TestHarness {
            storage,
            analytics,
            bus,
            factory,
            supervisor,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock network and temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    pub analytics: Arc<AnalyticsEngine>,
    pub bus: EventBus,
    pub factory: Arc<MockNetworkFactory>,
    pub supervisor: ConnectionSupervisor,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default configuration.
    pub async fn new() -> Result<Self, ReplyscopeError> {
        Self::builder().build().await
    }

    /// Persist a fresh instance.
    pub async fn create_instance(&self, name: &str) -> Result<Instance, ReplyscopeError> {
        let instance = Instance::new("tenant-test", name);
        self.storage.create_instance(&instance).await?;
        Ok(instance)
    }

    /// Create an instance, connect it, and return the mock client.
    pub async fn connect_instance(
        &self,
        name: &str,
    ) -> Result<(Instance, Arc<MockClient>), ReplyscopeError> {
        let instance = self.create_instance(name).await?;
        self.supervisor.connect(&instance.session_id, false).await?;
        let client = self
            .factory
            .client(&instance.session_id)
            .await
            .ok_or_else(|| ReplyscopeError::Internal("mock client not opened".into()))?;
        Ok((instance, client))
    }

    /// Create and connect an instance, then bring it online.
    pub async fn online_instance(
        &self,
        name: &str,
        address: &str,
    ) -> Result<(Instance, Arc<MockClient>, broadcast::Receiver<Envelope>), ReplyscopeError> {
        let mut rx = self.bus.subscribe();
        let (instance, client) = self.connect_instance(name).await?;
        client.emit_open(address).await;
        next_of_kind(&mut rx, "open")
            .await
            .ok_or_else(|| ReplyscopeError::Internal("session never opened".into()))?;
        Ok((instance, client, rx))
    }

    pub async fn instance_for(&self, session_id: &SessionId) -> Option<Instance> {
        self.storage
            .get_instance_by_session(session_id)
            .await
            .ok()
            .flatten()
    }
}

/// Wait up to five seconds for the next notification of `kind`, skipping others.
pub async fn next_of_kind(rx: &mut broadcast::Receiver<Envelope>, kind: &str) -> Option<Envelope> {
    tokio::time::timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(envelope) if envelope.notification.kind() == kind => return Some(envelope),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Poll `check` every 10ms for up to five seconds.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
