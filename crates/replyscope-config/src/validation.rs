// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as backoff shape, timezone offsets, and URL schemes.

use crate::diagnostic::ConfigError;
use crate::model::ReplyscopeConfig;

/// Largest UTC offset in use anywhere (UTC+14:00).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ReplyscopeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let sup = &config.supervisor;
    if sup.qr_max_attempts == 0 {
        fail("supervisor.qr_max_attempts must be at least 1".to_string());
    }
    if sup.qr_window_secs == 0 {
        fail("supervisor.qr_window_secs must be at least 1".to_string());
    }
    if sup.reconnect_max_attempts == 0 {
        fail("supervisor.reconnect_max_attempts must be at least 1".to_string());
    }
    if sup.reconnect_base_delay_ms == 0 {
        fail("supervisor.reconnect_base_delay_ms must be at least 1".to_string());
    }
    if !(sup.reconnect_factor.is_finite() && sup.reconnect_factor > 1.0) {
        fail(format!(
            "supervisor.reconnect_factor must be greater than 1, got {}",
            sup.reconnect_factor
        ));
    }
    if sup.reconnect_base_delay_ms > sup.reconnect_max_delay_ms {
        fail(format!(
            "supervisor.reconnect_base_delay_ms ({}) must not exceed reconnect_max_delay_ms ({})",
            sup.reconnect_base_delay_ms, sup.reconnect_max_delay_ms
        ));
    }
    if sup.event_buffer == 0 {
        fail("supervisor.event_buffer must be at least 1".to_string());
    }

    let analytics = &config.analytics;
    if analytics.returning_gap_hours == 0 {
        fail("analytics.returning_gap_hours must be at least 1".to_string());
    }
    if analytics.active_contacts_limit == 0 {
        fail("analytics.active_contacts_limit must be at least 1".to_string());
    }
    if analytics.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        fail(format!(
            "analytics.utc_offset_minutes must be within ±{MAX_UTC_OFFSET_MINUTES}, got {}",
            analytics.utc_offset_minutes
        ));
    }

    let url = config.bridge.url.trim();
    if url.is_empty() {
        fail("bridge.url must not be empty".to_string());
    } else if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        fail(format!("bridge.url `{url}` must use the ws:// or wss:// scheme"));
    }
    if config.bridge.connect_timeout_secs == 0 {
        fail("bridge.connect_timeout_secs must be at least 1".to_string());
    }
    if config.bridge.request_timeout_secs == 0 {
        fail("bridge.request_timeout_secs must be at least 1".to_string());
    }

    if config.prometheus.enabled
        && config
            .prometheus
            .listen_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        fail(format!(
            "prometheus.listen_address `{}` is not a valid socket address",
            config.prometheus.listen_address
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &ReplyscopeConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        let config = ReplyscopeConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ReplyscopeConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::Validation { message } if message.contains("database_path")
        )));
    }

    #[test]
    fn non_growing_backoff_is_rejected() {
        let mut config = ReplyscopeConfig::default();
        config.supervisor.reconnect_factor = 1.0;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("reconnect_factor")));
    }

    #[test]
    fn base_delay_above_cap_is_rejected() {
        let mut config = ReplyscopeConfig::default();
        config.supervisor.reconnect_base_delay_ms = 90_000;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("reconnect_base_delay_ms")));
    }

    #[test]
    fn offset_outside_fourteen_hours_is_rejected() {
        let mut config = ReplyscopeConfig::default();
        config.analytics.utc_offset_minutes = -15 * 60;
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("utc_offset_minutes")));

        config.analytics.utc_offset_minutes = 14 * 60;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn http_bridge_url_is_rejected() {
        let mut config = ReplyscopeConfig::default();
        config.bridge.url = "http://localhost:8787".to_string();
        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("ws://")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ReplyscopeConfig::default();
        config.supervisor.qr_max_attempts = 0;
        config.supervisor.qr_window_secs = 0;
        config.bridge.url = String::new();
        assert_eq!(validate_config(&config).unwrap_err().len(), 3);
    }

    #[test]
    fn prometheus_address_checked_only_when_enabled() {
        let mut config = ReplyscopeConfig::default();
        config.prometheus.listen_address = "not an address".to_string();
        assert!(validate_config(&config).is_ok());
        config.prometheus.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
