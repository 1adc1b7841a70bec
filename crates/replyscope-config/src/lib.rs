// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Replyscope.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and miette
//! diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use replyscope_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, ConfigSource, render_errors, render_to_string};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AnalyticsConfig, BridgeConfig, PrometheusConfig, ReplyscopeConfig, ServiceConfig,
    StorageConfig, SupervisorConfig,
};

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<ReplyscopeConfig, Vec<ConfigError>> {
    checked(loader::load_config(), searched_sources)
}

/// Load a single explicit config file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<ReplyscopeConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_source(path.display().to_string(), path).into_iter().collect()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<ReplyscopeConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![ConfigSource::new("<inline>", toml_content)]
    })
}

/// Validate a loaded config, or turn the figment failure into diagnostics.
///
/// Sources are only read back on failure, for span resolution.
fn checked(
    loaded: Result<ReplyscopeConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<ConfigSource>,
) -> Result<ReplyscopeConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => validation::validate_config(&config).map(|()| config),
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_source(name: String, path: impl AsRef<Path>) -> Option<ConfigSource> {
    std::fs::read_to_string(path)
        .ok()
        .map(|content| ConfigSource::new(name, content))
}

/// Every file the XDG lookup may have merged.
fn searched_sources() -> Vec<ConfigSource> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG).display().to_string())
        .unwrap_or_else(|_| loader::LOCAL_CONFIG.to_string());

    let mut candidates = vec![(local, loader::LOCAL_CONFIG.into())];
    if let Some(user) = loader::user_config_path() {
        candidates.push((user.display().to_string(), user));
    }
    candidates.push((loader::SYSTEM_CONFIG.to_string(), loader::SYSTEM_CONFIG.into()));

    candidates
        .into_iter()
        .filter_map(|(name, path): (String, std::path::PathBuf)| read_source(name, path))
        .collect()
}
