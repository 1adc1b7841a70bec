// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `replyscope report` command implementation.

use std::sync::Arc;

use chrono::NaiveDate;
use replyscope_analytics::{AnalyticsEngine, DashboardMetrics};
use replyscope_config::model::ReplyscopeConfig;
use replyscope_core::{ReplyscopeError, StorageAdapter};

use crate::instance::{open_storage, resolve_instance};

pub async fn run_report(
    config: &ReplyscopeConfig,
    instance: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<(), ReplyscopeError> {
    let storage = Arc::new(open_storage(config).await?);
    let engine = AnalyticsEngine::new(storage.clone(), config.analytics.clone());
    let metrics = build_report(&engine, storage.as_ref(), instance, from, to).await?;
    println!("{}", to_json(&metrics)?);
    storage.close().await
}

/// Resolve `instance` and compute its dashboard snapshot.
pub async fn build_report(
    engine: &AnalyticsEngine,
    storage: &dyn StorageAdapter,
    instance: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<DashboardMetrics, ReplyscopeError> {
    let instance = resolve_instance(storage, instance).await?;
    Ok(engine.dashboard_metrics(&instance.id, from, to).await)
}

fn to_json(metrics: &DashboardMetrics) -> Result<String, ReplyscopeError> {
    serde_json::to_string_pretty(metrics)
        .map_err(|e| ReplyscopeError::Internal(format!("failed to encode report: {e}")))
}
