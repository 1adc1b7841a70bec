// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The analytics engine: ingestion and dashboard reads.
//!
//! Ingestion is one atomic storage write per message, so the live event path
//! and outbound sends never interleave inside a contact update. Read
//! operations never fail; store errors degrade to empty results and are
//! logged.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use replyscope_config::model::AnalyticsConfig;
use replyscope_core::{
    Contact, ContactActivity, ContentKind, Direction, MessageRecord, ReplyscopeError,
    StorageAdapter, StoredMessage,
};

use crate::calendar::Calendar;
use crate::report::{AwaitingContact, DashboardMetrics, DayReconciliation, MetricTotals};
use crate::stats::{FirstResponseStats, ResponseTimeStats};

const SECS_PER_HOUR: i64 = 3600;

/// One message handed to [`AnalyticsEngine::ingest`].
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub direction: Direction,
    pub body: String,
    pub content_kind: ContentKind,
    /// Unix seconds reported by the network.
    pub timestamp: i64,
    pub network_message_id: Option<String>,
    /// Sender-supplied display name; only used for inbound messages.
    pub sender_name: Option<String>,
}

/// Result of a successful ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// The contact after the message was applied.
    pub contact: Contact,
    pub is_new_contact: bool,
    pub is_returning_contact: bool,
}

/// Turns message events into contact records and daily rollups, and answers
/// dashboard queries.
pub struct AnalyticsEngine {
    storage: Arc<dyn StorageAdapter>,
    config: AnalyticsConfig,
    calendar: Calendar,
}

impl AnalyticsEngine {
    pub fn new(storage: Arc<dyn StorageAdapter>, config: AnalyticsConfig) -> Self {
        let calendar = Calendar::new(config.utc_offset_minutes);
        Self {
            storage,
            config,
            calendar,
        }
    }

    /// Calendar used to bucket timestamps into days.
    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Record one message for `address` on `instance_id`.
    ///
    /// Every write the message implies lands in a single storage transaction.
    /// Returns `Ok(None)` when the network message id is already stored.
    /// Store failures surface as [`ReplyscopeError::Persistence`] and leave
    /// nothing behind, so a redelivery is ingested normally.
    pub async fn ingest(
        &self,
        instance_id: &str,
        address: &str,
        request: IngestRequest,
    ) -> Result<Option<IngestOutcome>, ReplyscopeError> {
        let record = MessageRecord {
            instance_id: instance_id.to_string(),
            address: address.to_string(),
            sender_name: request.sender_name,
            network_message_id: request.network_message_id,
            direction: request.direction,
            body: request.body,
            content_kind: request.content_kind,
            timestamp: request.timestamp,
            received_at: Utc::now().timestamp(),
            date: self.calendar.date_of(request.timestamp),
            returning_gap_secs: i64::from(self.config.returning_gap_hours) * SECS_PER_HOUR,
        };

        let recorded = self
            .storage
            .record_message(&record)
            .await
            .map_err(|e| ReplyscopeError::persistence("failed to record message", e))?;
        let Some(recorded) = recorded else {
            debug!(
                instance_id,
                network_id = record.network_message_id.as_deref().unwrap_or_default(),
                "duplicate message skipped"
            );
            return Ok(None);
        };

        debug!(
            instance_id,
            contact_id = recorded.contact.id,
            message_id = recorded.message_id,
            direction = %record.direction,
            is_new = recorded.is_new_contact,
            is_returning = recorded.is_returning_contact,
            "message ingested"
        );
        Ok(Some(IngestOutcome {
            contact: recorded.contact,
            is_new_contact: recorded.is_new_contact,
            is_returning_contact: recorded.is_returning_contact,
        }))
    }

    /// Dashboard snapshot. Missing dates default to today; reversed ranges are swapped.
    pub async fn dashboard_metrics(
        &self,
        instance_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> DashboardMetrics {
        let today = self.calendar.today();
        let mut start = start_date.unwrap_or(today);
        let mut end = end_date.unwrap_or(today);
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        let (from, to) = self.calendar.range(start, end);

        let daily = degrade(
            "daily metrics",
            instance_id,
            self.storage.daily_metrics(instance_id, start, end).await,
        );
        let response_pairs = degrade(
            "response pairs",
            instance_id,
            self.storage.response_pairs(instance_id, from, to).await,
        );
        let first_pairs = degrade(
            "first response pairs",
            instance_id,
            self.storage.first_response_pairs(instance_id, from, to).await,
        );
        let pending_contacts = degrade(
            "pending contacts",
            instance_id,
            self.storage.count_awaiting_reply(instance_id).await,
        );
        let active_contacts = self.active_contacts(instance_id).await;

        DashboardMetrics {
            instance_id: instance_id.to_string(),
            start_date: start,
            end_date: end,
            totals: MetricTotals::sum(&daily),
            daily,
            response_time: ResponseTimeStats::from_pairs(&response_pairs),
            first_response: FirstResponseStats::from_pairs(&first_pairs),
            pending_contacts,
            active_contacts,
        }
    }

    /// Most recently seen contacts, up to the configured limit.
    pub async fn active_contacts(&self, instance_id: &str) -> Vec<ContactActivity> {
        degrade(
            "active contacts",
            instance_id,
            self.storage
                .list_active_contacts(instance_id, self.config.active_contacts_limit)
                .await,
        )
    }

    /// Full conversation with a contact, oldest first.
    pub async fn conversation(&self, instance_id: &str, address: &str) -> Vec<StoredMessage> {
        let contact = degrade(
            "conversation contact",
            instance_id,
            self.storage.find_contact(instance_id, address).await,
        );
        match contact {
            Some(contact) => degrade(
                "conversation",
                instance_id,
                self.storage.messages_for_contact(contact.id).await,
            ),
            None => Vec::new(),
        }
    }

    /// Contacts that came back after a silence, most recently seen first.
    pub async fn returning_contacts(&self, instance_id: &str) -> Vec<ContactActivity> {
        degrade(
            "returning contacts",
            instance_id,
            self.storage.list_returning_contacts(instance_id).await,
        )
    }

    /// Contacts waiting on a reply, longest wait first, measured against `now`.
    pub async fn awaiting_reply(&self, instance_id: &str, now: i64) -> Vec<AwaitingContact> {
        degrade(
            "awaiting reply",
            instance_id,
            self.storage.list_awaiting_reply(instance_id).await,
        )
        .into_iter()
        .map(|activity| {
            let since = activity.last_at.unwrap_or(activity.contact.last_seen);
            AwaitingContact {
                contact: activity.contact,
                last_body: activity.last_body,
                waiting_since: since,
                waiting_secs: (now - since).max(0),
            }
        })
        .collect()
    }

    /// Compare the stored rollup for `date` with counts re-derived from message rows.
    pub async fn reconcile_day(
        &self,
        instance_id: &str,
        date: NaiveDate,
    ) -> Result<DayReconciliation, ReplyscopeError> {
        let (from, to) = self.calendar.range(date, date);
        let stored = self.storage.daily_metrics(instance_id, date, date).await?;
        let derived = MetricTotals {
            new_contacts: self.storage.count_new_contacts(instance_id, from, to).await?,
            messages_received: self
                .storage
                .count_messages(instance_id, from, to, Direction::Inbound)
                .await?,
            messages_sent: self
                .storage
                .count_messages(instance_id, from, to, Direction::Outbound)
                .await?,
            returning_contacts: 0,
        };
        let report = DayReconciliation {
            instance_id: instance_id.to_string(),
            date,
            stored: MetricTotals::sum(&stored),
            derived,
        };
        if !report.is_consistent() {
            warn!(
                instance_id,
                %date,
                stored_received = report.stored.messages_received,
                derived_received = report.derived.messages_received,
                stored_sent = report.stored.messages_sent,
                derived_sent = report.derived.messages_sent,
                "daily rollup drifted from message log"
            );
        }
        Ok(report)
    }
}

/// Log a failed read and fall back to the type's default.
fn degrade<T: Default>(what: &str, instance_id: &str, result: Result<T, ReplyscopeError>) -> T {
    result.unwrap_or_else(|e| {
        warn!(instance_id, error = %e, "failed to load {what}, using empty result");
        T::default()
    })
}
