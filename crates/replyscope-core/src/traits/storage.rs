// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ReplyscopeError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Contact, ContactActivity, CredentialSet, DailyMetric, Direction, FirstContactPair, Instance,
    InstanceStatus, MessageRecord, NewContact, NewMessage, RecordedMessage, ResponsePair,
    SessionId, StoredMessage,
};

/// Adapter for the persistent store behind instances, contacts, messages,
/// daily metrics, and session credentials.
///
/// Timestamps are unix seconds. Range bounds are inclusive on `from` and
/// exclusive on `to`.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ReplyscopeError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), ReplyscopeError>;

    // --- Instance operations ---

    async fn create_instance(&self, instance: &Instance) -> Result<(), ReplyscopeError>;

    async fn get_instance(&self, id: &str) -> Result<Option<Instance>, ReplyscopeError>;

    async fn get_instance_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Instance>, ReplyscopeError>;

    async fn list_instances(&self) -> Result<Vec<Instance>, ReplyscopeError>;

    async fn update_instance_status(
        &self,
        id: &str,
        status: InstanceStatus,
    ) -> Result<(), ReplyscopeError>;

    async fn update_instance_address(
        &self,
        id: &str,
        address: &str,
    ) -> Result<(), ReplyscopeError>;

    /// Delete an instance and everything it owns.
    async fn delete_instance(&self, id: &str) -> Result<(), ReplyscopeError>;

    // --- Contact operations ---

    async fn find_contact(
        &self,
        instance_id: &str,
        address: &str,
    ) -> Result<Option<Contact>, ReplyscopeError>;

    async fn create_contact(&self, contact: &NewContact) -> Result<Contact, ReplyscopeError>;

    /// Contacts ordered by most recent activity, newest first.
    async fn list_active_contacts(
        &self,
        instance_id: &str,
        limit: usize,
    ) -> Result<Vec<ContactActivity>, ReplyscopeError>;

    /// Contacts with a non-zero return count, most recently seen first.
    async fn list_returning_contacts(
        &self,
        instance_id: &str,
    ) -> Result<Vec<ContactActivity>, ReplyscopeError>;

    /// Contacts whose latest message is inbound, oldest wait first.
    async fn list_awaiting_reply(
        &self,
        instance_id: &str,
    ) -> Result<Vec<ContactActivity>, ReplyscopeError>;

    async fn count_awaiting_reply(&self, instance_id: &str) -> Result<i64, ReplyscopeError>;

    /// Contacts whose `first_seen` falls in `[from, to)`.
    async fn count_new_contacts(
        &self,
        instance_id: &str,
        from: i64,
        to: i64,
    ) -> Result<i64, ReplyscopeError>;

    // --- Message operations ---

    async fn create_message(&self, message: &NewMessage) -> Result<i64, ReplyscopeError>;

    /// Apply one message atomically: resolve or create the contact, update
    /// its counters and `last_seen`, append the message row and credit the
    /// daily rollup, all in one transaction.
    ///
    /// Returns `Ok(None)` without writing when the record's network message
    /// id is already stored for the instance.
    async fn record_message(
        &self,
        record: &MessageRecord,
    ) -> Result<Option<RecordedMessage>, ReplyscopeError>;

    /// Messages exchanged with one contact, oldest first.
    async fn messages_for_contact(
        &self,
        contact_id: i64,
    ) -> Result<Vec<StoredMessage>, ReplyscopeError>;

    async fn count_messages(
        &self,
        instance_id: &str,
        from: i64,
        to: i64,
        direction: Direction,
    ) -> Result<i64, ReplyscopeError>;

    /// Every inbound message in range paired with the earliest later outbound
    /// message to the same contact.
    async fn response_pairs(
        &self,
        instance_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<ResponsePair>, ReplyscopeError>;

    /// For contacts first seen in range, their first message paired with their
    /// first outbound message.
    async fn first_response_pairs(
        &self,
        instance_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<FirstContactPair>, ReplyscopeError>;

    // --- Daily metric operations ---

    /// Rows with `from <= date <= to`, ordered by date.
    async fn daily_metrics(
        &self,
        instance_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetric>, ReplyscopeError>;

    // --- Credential operations ---

    async fn load_credentials(
        &self,
        session_id: &SessionId,
    ) -> Result<CredentialSet, ReplyscopeError>;

    /// Merge `credentials` into the stored set, overwriting keys present in both.
    async fn save_credentials(
        &self,
        session_id: &SessionId,
        credentials: &CredentialSet,
    ) -> Result<(), ReplyscopeError>;

    /// Wipe every stored key for the session.
    async fn delete_credentials(&self, session_id: &SessionId) -> Result<(), ReplyscopeError>;

    /// Sessions that have at least one stored credential key.
    async fn sessions_with_credentials(&self) -> Result<Vec<SessionId>, ReplyscopeError>;
}
