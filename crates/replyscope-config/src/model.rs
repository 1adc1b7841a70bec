// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Replyscope.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Replyscope configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyscopeConfig {
    /// Process identity and log level.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Connection lifecycle policy.
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Analytics engine settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Protocol sidecar connection settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Prometheus exporter settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Process identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name used in log output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "replyscope".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("replyscope").join("replyscope.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("replyscope.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Pairing, reconnect, and restore policy for network sessions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// QR codes tolerated inside one window before the session is paused.
    #[serde(default = "default_qr_max_attempts")]
    pub qr_max_attempts: u32,

    /// Length of the rolling QR window in seconds.
    #[serde(default = "default_qr_window_secs")]
    pub qr_window_secs: u64,

    /// Delay before the first reconnect attempt.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Multiplier applied per further attempt.
    #[serde(default = "default_reconnect_factor")]
    pub reconnect_factor: f64,

    /// Upper bound on any single reconnect delay.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,

    /// Reconnect attempts before a session is abandoned.
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,

    /// Capacity of the per-session client event channel and the notification bus.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Reconnect every instance with stored credentials at startup.
    #[serde(default = "default_restore_on_startup")]
    pub restore_on_startup: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            qr_max_attempts: default_qr_max_attempts(),
            qr_window_secs: default_qr_window_secs(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_factor: default_reconnect_factor(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            event_buffer: default_event_buffer(),
            restore_on_startup: default_restore_on_startup(),
        }
    }
}

fn default_qr_max_attempts() -> u32 {
    5
}

fn default_qr_window_secs() -> u64 {
    600
}

fn default_reconnect_base_delay_ms() -> u64 {
    5000
}

fn default_reconnect_factor() -> f64 {
    1.5
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_reconnect_max_attempts() -> u32 {
    10
}

fn default_event_buffer() -> usize {
    256
}

fn default_restore_on_startup() -> bool {
    true
}

/// Analytics engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Silence after which an inbound message marks a returning contact.
    #[serde(default = "default_returning_gap_hours")]
    pub returning_gap_hours: u32,

    /// Size of the active-contacts list on the dashboard.
    #[serde(default = "default_active_contacts_limit")]
    pub active_contacts_limit: usize,

    /// Offset from UTC used to assign messages to calendar dates.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            returning_gap_hours: default_returning_gap_hours(),
            active_contacts_limit: default_active_contacts_limit(),
            utc_offset_minutes: 0,
        }
    }
}

fn default_returning_gap_hours() -> u32 {
    24
}

fn default_active_contacts_limit() -> usize {
    10
}

/// Protocol sidecar configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// WebSocket URL of the sidecar (`ws://` or `wss://`).
    #[serde(default = "default_bridge_url")]
    pub url: String,

    /// Timeout for establishing the socket and the `open` handshake.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout for a single send acknowledgement.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: default_bridge_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bridge_url() -> String {
    "ws://127.0.0.1:8787".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Socket address for the scrape endpoint.
    #[serde(default = "default_prometheus_listen")]
    pub listen_address: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: default_prometheus_listen(),
        }
    }
}

fn default_prometheus_listen() -> String {
    "127.0.0.1:9464".to_string()
}
