// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OnceCell;
use tracing::debug;

use replyscope_config::model::StorageConfig;
use replyscope_core::{
    AdapterType, Contact, ContactActivity, CredentialSet, DailyMetric, Direction,
    FirstContactPair, HealthStatus, Instance, InstanceStatus, MessageRecord, NewContact,
    NewMessage, PluginAdapter, RecordedMessage, ReplyscopeError, ResponsePair, SessionId,
    StorageAdapter, StoredMessage,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database, skipping `initialize`.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: ":memory:".to_string(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, ReplyscopeError> {
        self.db.get().ok_or_else(|| ReplyscopeError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), ReplyscopeError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ReplyscopeError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ReplyscopeError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ReplyscopeError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ReplyscopeError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ReplyscopeError> {
        self.db()?;
        self.checkpoint().await
    }

    // --- Instance operations ---

    async fn create_instance(&self, instance: &Instance) -> Result<(), ReplyscopeError> {
        queries::instances::create_instance(self.db()?, instance).await
    }

    async fn get_instance(&self, id: &str) -> Result<Option<Instance>, ReplyscopeError> {
        queries::instances::get_instance(self.db()?, id).await
    }

    async fn get_instance_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<Instance>, ReplyscopeError> {
        queries::instances::get_instance_by_session(self.db()?, session_id).await
    }

    async fn list_instances(&self) -> Result<Vec<Instance>, ReplyscopeError> {
        queries::instances::list_instances(self.db()?).await
    }

    async fn update_instance_status(
        &self,
        id: &str,
        status: InstanceStatus,
    ) -> Result<(), ReplyscopeError> {
        queries::instances::update_instance_status(self.db()?, id, status).await
    }

    async fn update_instance_address(
        &self,
        id: &str,
        address: &str,
    ) -> Result<(), ReplyscopeError> {
        queries::instances::update_instance_address(self.db()?, id, address).await
    }

    async fn delete_instance(&self, id: &str) -> Result<(), ReplyscopeError> {
        queries::instances::delete_instance(self.db()?, id).await
    }

    // --- Contact operations ---

    async fn find_contact(
        &self,
        instance_id: &str,
        address: &str,
    ) -> Result<Option<Contact>, ReplyscopeError> {
        queries::contacts::find_contact(self.db()?, instance_id, address).await
    }

    async fn create_contact(&self, contact: &NewContact) -> Result<Contact, ReplyscopeError> {
        queries::contacts::create_contact(self.db()?, contact).await
    }

    async fn list_active_contacts(
        &self,
        instance_id: &str,
        limit: usize,
    ) -> Result<Vec<ContactActivity>, ReplyscopeError> {
        queries::contacts::list_active_contacts(self.db()?, instance_id, limit).await
    }

    async fn list_returning_contacts(
        &self,
        instance_id: &str,
    ) -> Result<Vec<ContactActivity>, ReplyscopeError> {
        queries::contacts::list_returning_contacts(self.db()?, instance_id).await
    }

    async fn list_awaiting_reply(
        &self,
        instance_id: &str,
    ) -> Result<Vec<ContactActivity>, ReplyscopeError> {
        queries::contacts::list_awaiting_reply(self.db()?, instance_id).await
    }

    async fn count_awaiting_reply(&self, instance_id: &str) -> Result<i64, ReplyscopeError> {
        queries::contacts::count_awaiting_reply(self.db()?, instance_id).await
    }

    async fn count_new_contacts(
        &self,
        instance_id: &str,
        from: i64,
        to: i64,
    ) -> Result<i64, ReplyscopeError> {
        queries::contacts::count_new_contacts(self.db()?, instance_id, from, to).await
    }

    // --- Message operations ---

    async fn create_message(&self, message: &NewMessage) -> Result<i64, ReplyscopeError> {
        queries::messages::create_message(self.db()?, message).await
    }

    async fn record_message(
        &self,
        record: &MessageRecord,
    ) -> Result<Option<RecordedMessage>, ReplyscopeError> {
        queries::ingest::record_message(self.db()?, record).await
    }

    async fn messages_for_contact(
        &self,
        contact_id: i64,
    ) -> Result<Vec<StoredMessage>, ReplyscopeError> {
        queries::messages::messages_for_contact(self.db()?, contact_id).await
    }

    async fn count_messages(
        &self,
        instance_id: &str,
        from: i64,
        to: i64,
        direction: Direction,
    ) -> Result<i64, ReplyscopeError> {
        queries::messages::count_messages(self.db()?, instance_id, from, to, direction).await
    }

    async fn response_pairs(
        &self,
        instance_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<ResponsePair>, ReplyscopeError> {
        queries::messages::response_pairs(self.db()?, instance_id, from, to).await
    }

    async fn first_response_pairs(
        &self,
        instance_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<FirstContactPair>, ReplyscopeError> {
        queries::messages::first_response_pairs(self.db()?, instance_id, from, to).await
    }

    // --- Daily metric operations ---

    async fn daily_metrics(
        &self,
        instance_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetric>, ReplyscopeError> {
        queries::metrics::daily_metrics(self.db()?, instance_id, from, to).await
    }

    // --- Credential operations ---

    async fn load_credentials(
        &self,
        session_id: &SessionId,
    ) -> Result<CredentialSet, ReplyscopeError> {
        queries::credentials::load_credentials(self.db()?, session_id).await
    }

    async fn save_credentials(
        &self,
        session_id: &SessionId,
        credentials: &CredentialSet,
    ) -> Result<(), ReplyscopeError> {
        queries::credentials::save_credentials(self.db()?, session_id, credentials).await
    }

    async fn delete_credentials(&self, session_id: &SessionId) -> Result<(), ReplyscopeError> {
        queries::credentials::delete_credentials(self.db()?, session_id).await
    }

    async fn sessions_with_credentials(&self) -> Result<Vec<SessionId>, ReplyscopeError> {
        queries::credentials::sessions_with_credentials(self.db()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn operations_before_initialize_fail() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("uninit.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.list_instances().await.is_err());
        assert!(storage.health_check().await.is_err());
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn deleting_instance_cascades_to_owned_rows() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("cascade.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);

        let instance = Instance::new("tenant-1", "Support");
        storage.create_instance(&instance).await.unwrap();
        let contact = storage
            .create_contact(&NewContact {
                instance_id: instance.id.clone(),
                address: "a@s.whatsapp.net".to_string(),
                name: Some("Ana".to_string()),
                seen_at: 10,
            })
            .await
            .unwrap();
        storage
            .create_message(&NewMessage {
                instance_id: instance.id.clone(),
                contact_id: contact.id,
                network_message_id: Some("N1".to_string()),
                direction: Direction::Inbound,
                body: "hi".to_string(),
                content_kind: replyscope_core::ContentKind::Text,
                timestamp: 10,
                received_at: 11,
            })
            .await
            .unwrap();

        storage.delete_instance(&instance.id).await.unwrap();

        assert!(storage.get_instance(&instance.id).await.unwrap().is_none());
        assert!(
            storage
                .find_contact(&instance.id, "a@s.whatsapp.net")
                .await
                .unwrap()
                .is_none()
        );
        assert!(storage.messages_for_contact(contact.id).await.unwrap().is_empty());

        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_runs_checkpoint() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("shutdown.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage
            .create_instance(&Instance::new("tenant-1", "Support"))
            .await
            .unwrap();

        storage.shutdown().await.unwrap();
    }
}
