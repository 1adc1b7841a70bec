// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message-driven analytics for Replyscope.
//!
//! This crate provides:
//! - **Ingestion**: contact identity, returning-contact detection, and additive daily rollups
//! - **Dashboard reads**: response-time and first-response statistics, pending and active contacts
//! - **Reconciliation**: re-deriving a day's counters from the message log

pub mod calendar;
pub mod engine;
pub mod report;
pub mod stats;

pub use calendar::Calendar;
pub use engine::{AnalyticsEngine, IngestOutcome, IngestRequest};
pub use report::{AwaitingContact, DashboardMetrics, DayReconciliation, MetricTotals};
pub use stats::{FirstResponseStats, ResponseTimeStats, format_duration};
