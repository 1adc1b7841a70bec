// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./replyscope.toml` > `~/.config/replyscope/replyscope.toml`
//! > `/etc/replyscope/replyscope.toml` with environment variable overrides via
//! the `REPLYSCOPE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and large

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ReplyscopeConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/replyscope/replyscope.toml";
pub(crate) const LOCAL_CONFIG: &str = "replyscope.toml";

/// Path of the per-user config file, if a config dir exists.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("replyscope/replyscope.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/replyscope/replyscope.toml`
/// 3. `~/.config/replyscope/replyscope.toml`
/// 4. `./replyscope.toml`
/// 5. `REPLYSCOPE_*` environment variables
pub fn load_config() -> Result<ReplyscopeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ReplyscopeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReplyscopeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ReplyscopeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReplyscopeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ReplyscopeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Map `REPLYSCOPE_SECTION_KEY` onto `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `REPLYSCOPE_SUPERVISOR_QR_MAX_ATTEMPTS` maps to `supervisor.qr_max_attempts`.
fn env_provider() -> Env {
    Env::prefixed("REPLYSCOPE_").map(|key| env_key_to_path(key.as_str()).into())
}

const SECTIONS: &[&str] = &[
    "service",
    "storage",
    "supervisor",
    "analytics",
    "bridge",
    "prometheus",
];

pub(crate) fn env_key_to_path(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(
            env_key_to_path("supervisor_qr_max_attempts"),
            "supervisor.qr_max_attempts"
        );
        assert_eq!(env_key_to_path("storage_database_path"), "storage.database_path");
        assert_eq!(env_key_to_path("bridge_url"), "bridge.url");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(env_key_to_path("unrelated_key"), "unrelated_key");
    }
}
