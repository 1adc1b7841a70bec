// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instance CRUD operations.

use replyscope_core::{Instance, InstanceStatus, ReplyscopeError, SessionId};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::queries::parse_text;

const COLUMNS: &str = "id, tenant_id, session_id, name, address, status, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Instance> {
    Ok(Instance {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        session_id: SessionId(row.get(2)?),
        name: row.get(3)?,
        address: row.get(4)?,
        status: parse_text(5, row.get(5)?)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert a new instance.
pub async fn create_instance(db: &Database, instance: &Instance) -> Result<(), ReplyscopeError> {
    let instance = instance.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO instances
                     (id, tenant_id, session_id, name, address, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    instance.id,
                    instance.tenant_id,
                    instance.session_id.as_str(),
                    instance.name,
                    instance.address,
                    instance.status.to_string(),
                    instance.created_at,
                    instance.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get an instance by ID.
pub async fn get_instance(db: &Database, id: &str) -> Result<Option<Instance>, ReplyscopeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM instances WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Get the instance backed by a session.
pub async fn get_instance_by_session(
    db: &Database,
    session_id: &SessionId,
) -> Result<Option<Instance>, ReplyscopeError> {
    let session_id = session_id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM instances WHERE session_id = ?1"),
                params![session_id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List all instances, oldest first.
pub async fn list_instances(db: &Database) -> Result<Vec<Instance>, ReplyscopeError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM instances ORDER BY created_at ASC, id ASC"
            ))?;
            let instances = stmt
                .query_map([], from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(instances)
        })
        .await
        .map_err(map_tr_err)
}

/// Update the connection status and `updated_at`.
pub async fn update_instance_status(
    db: &Database,
    id: &str,
    status: InstanceStatus,
) -> Result<(), ReplyscopeError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE instances
                 SET status = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![status, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record the network address resolved by the last successful open.
pub async fn update_instance_address(
    db: &Database,
    id: &str,
    address: &str,
) -> Result<(), ReplyscopeError> {
    let id = id.to_string();
    let address = address.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE instances
                 SET address = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![address, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an instance. Contacts, messages, and daily metrics cascade.
pub async fn delete_instance(db: &Database, id: &str) -> Result<(), ReplyscopeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM instances WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
