// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle contract for the pluggable backends.

use async_trait::async_trait;

use crate::error::ReplyscopeError;
use crate::types::{AdapterType, HealthStatus};

/// Implemented by the SQLite store, the bridge client factory and the
/// Prometheus exporter so `serve` can probe and stop them uniformly.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    /// Probe the backend. `Unhealthy` is a value, not an error; `Err` means
    /// the probe itself could not run.
    async fn health_check(&self) -> Result<HealthStatus, ReplyscopeError>;

    /// Release connections and background tasks. Called once at exit.
    async fn shutdown(&self) -> Result<(), ReplyscopeError>;
}
