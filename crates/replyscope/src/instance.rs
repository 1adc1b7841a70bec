// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `replyscope instance` command implementation.

use std::fmt::Write as _;

use clap::Subcommand;
use replyscope_config::model::ReplyscopeConfig;
use replyscope_core::{Instance, ReplyscopeError, StorageAdapter};
use replyscope_storage::SqliteStorage;
use tracing::info;

/// Instance management subcommands.
#[derive(Subcommand, Debug)]
pub enum InstanceCommand {
    /// Register a new instance. It pairs on the next `serve`.
    Create {
        /// Display name, unique per deployment.
        name: String,
        /// Owning tenant.
        #[arg(long, default_value = "default")]
        tenant: String,
    },
    /// List every instance with its status.
    List,
    /// Delete an instance with its contacts, messages, and stored credentials.
    Delete {
        /// Instance id or name.
        instance: String,
    },
}

pub async fn run_instance(
    config: &ReplyscopeConfig,
    command: InstanceCommand,
) -> Result<(), ReplyscopeError> {
    let storage = open_storage(config).await?;
    let result = match command {
        InstanceCommand::Create { name, tenant } => {
            let instance = create_instance(&storage, &tenant, &name).await?;
            println!("created instance {} ({})", instance.name, instance.id);
            Ok(())
        }
        InstanceCommand::List => {
            let instances = storage.list_instances().await?;
            print!("{}", render_instances(&instances));
            Ok(())
        }
        InstanceCommand::Delete { instance } => {
            let deleted = delete_instance(&storage, &instance).await?;
            println!("deleted instance {} ({})", deleted.name, deleted.id);
            Ok(())
        }
    };
    storage.close().await?;
    result
}

/// Open the configured database and run migrations.
pub async fn open_storage(config: &ReplyscopeConfig) -> Result<SqliteStorage, ReplyscopeError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(storage)
}

/// Persist a new disconnected instance. Names must be unique.
pub async fn create_instance(
    storage: &dyn StorageAdapter,
    tenant: &str,
    name: &str,
) -> Result<Instance, ReplyscopeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ReplyscopeError::Config("instance name must not be empty".into()));
    }
    if storage
        .list_instances()
        .await?
        .iter()
        .any(|existing| existing.name == name)
    {
        return Err(ReplyscopeError::Config(format!(
            "an instance named {name:?} already exists"
        )));
    }

    let instance = Instance::new(tenant, name);
    storage.create_instance(&instance).await?;
    info!(instance_id = %instance.id, session_id = %instance.session_id, "instance created");
    Ok(instance)
}

/// Look an instance up by id, falling back to its name.
pub async fn resolve_instance(
    storage: &dyn StorageAdapter,
    key: &str,
) -> Result<Instance, ReplyscopeError> {
    if let Some(instance) = storage.get_instance(key).await? {
        return Ok(instance);
    }
    storage
        .list_instances()
        .await?
        .into_iter()
        .find(|instance| instance.name == key)
        .ok_or_else(|| ReplyscopeError::NotFound {
            kind: "instance",
            id: key.to_string(),
        })
}

/// Remove an instance and wipe the credentials of its session.
///
/// Contacts, messages, and daily metrics cascade with the instance row.
pub async fn delete_instance(
    storage: &dyn StorageAdapter,
    key: &str,
) -> Result<Instance, ReplyscopeError> {
    let instance = resolve_instance(storage, key).await?;
    storage.delete_credentials(&instance.session_id).await?;
    storage.delete_instance(&instance.id).await?;
    info!(instance_id = %instance.id, "instance deleted");
    Ok(instance)
}

/// Plain-text table of instances.
pub fn render_instances(instances: &[Instance]) -> String {
    if instances.is_empty() {
        return "no instances\n".to_string();
    }
    let name_width = instances
        .iter()
        .map(|i| i.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36}  {:<name_width$}  {:<12}  ADDRESS",
        "ID", "NAME", "STATUS"
    );
    for instance in instances {
        let _ = writeln!(
            out,
            "{:<36}  {:<name_width$}  {:<12}  {}",
            instance.id,
            instance.name,
            instance.status.to_string(),
            instance.address.as_deref().unwrap_or("-"),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use replyscope_config::model::StorageConfig;
    use replyscope_core::{CredentialSet, InstanceStatus};

    async fn temp_storage() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replyscope.db");
        let storage = SqliteStorage::new(StorageConfig {
            database_path: path.to_string_lossy().into_owned(),
            wal_mode: true,
        });
        storage.initialize().await.unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn create_rejects_duplicate_and_blank_names() {
        let (storage, _dir) = temp_storage().await;
        create_instance(&storage, "acme", "Front desk").await.unwrap();

        let dup = create_instance(&storage, "acme", "Front desk").await;
        assert!(matches!(dup, Err(ReplyscopeError::Config(_))));
        let blank = create_instance(&storage, "acme", "   ").await;
        assert!(matches!(blank, Err(ReplyscopeError::Config(_))));

        assert_eq!(storage.list_instances().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolve_accepts_id_or_name() {
        let (storage, _dir) = temp_storage().await;
        let created = create_instance(&storage, "acme", "Sales").await.unwrap();

        assert_eq!(resolve_instance(&storage, &created.id).await.unwrap(), created);
        assert_eq!(resolve_instance(&storage, "Sales").await.unwrap(), created);
        assert!(matches!(
            resolve_instance(&storage, "Support").await,
            Err(ReplyscopeError::NotFound { kind: "instance", .. })
        ));
    }

    #[tokio::test]
    async fn delete_wipes_credentials() {
        let (storage, _dir) = temp_storage().await;
        let created = create_instance(&storage, "acme", "Sales").await.unwrap();
        let mut creds = CredentialSet::new();
        creds.insert("noise-key".into(), "abc".into());
        storage
            .save_credentials(&created.session_id, &creds)
            .await
            .unwrap();

        delete_instance(&storage, "Sales").await.unwrap();

        assert!(storage.get_instance(&created.id).await.unwrap().is_none());
        assert!(
            storage
                .load_credentials(&created.session_id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn render_lists_status_and_address() {
        let mut online = Instance::new("acme", "Sales");
        online.status = InstanceStatus::Connected;
        online.address = Some("5511999990000@s.whatsapp.net".into());
        let offline = Instance::new("acme", "Support");

        let table = render_instances(&[online.clone(), offline]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("connected"));
        assert!(lines[1].contains("5511999990000@s.whatsapp.net"));
        assert!(lines[2].contains("disconnected"));
        assert!(lines[2].trim_end().ends_with('-'));
    }

    #[test]
    fn render_empty_list() {
        assert_eq!(render_instances(&[]), "no instances\n");
    }
}
