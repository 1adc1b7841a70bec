// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side shapes returned by the analytics engine.

use chrono::NaiveDate;
use replyscope_core::{Contact, ContactActivity, DailyMetric};
use serde::Serialize;

use crate::stats::{FirstResponseStats, ResponseTimeStats};

/// Summed daily counters over a date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricTotals {
    pub new_contacts: i64,
    pub messages_received: i64,
    pub messages_sent: i64,
    pub returning_contacts: i64,
}

impl MetricTotals {
    pub fn sum(rows: &[DailyMetric]) -> Self {
        rows.iter().fold(Self::default(), |acc, row| Self {
            new_contacts: acc.new_contacts + row.new_contacts,
            messages_received: acc.messages_received + row.messages_received,
            messages_sent: acc.messages_sent + row.messages_sent,
            returning_contacts: acc.returning_contacts + row.returning_contacts,
        })
    }
}

/// Dashboard snapshot for one instance and date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub instance_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub totals: MetricTotals,
    pub daily: Vec<DailyMetric>,
    pub response_time: ResponseTimeStats,
    pub first_response: FirstResponseStats,
    /// Contacts whose latest message is inbound.
    pub pending_contacts: i64,
    pub active_contacts: Vec<ContactActivity>,
}

/// A contact waiting on a staff reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwaitingContact {
    pub contact: Contact,
    pub last_body: Option<String>,
    /// Unix second of the unanswered message.
    pub waiting_since: i64,
    pub waiting_secs: i64,
}

/// Stored rollup for a day next to counts re-derived from message rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReconciliation {
    pub instance_id: String,
    pub date: NaiveDate,
    pub stored: MetricTotals,
    pub derived: MetricTotals,
}

impl DayReconciliation {
    /// Message and new-contact counts agree. Returning counts cannot be
    /// re-derived and are not compared.
    pub fn is_consistent(&self) -> bool {
        self.stored.messages_received == self.derived.messages_received
            && self.stored.messages_sent == self.derived.messages_sent
            && self.stored.new_contacts == self.derived.new_contacts
    }
}
