// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session credential key/value storage.

use replyscope_core::{CredentialSet, ReplyscopeError, SessionId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Load every stored key for a session. Missing sessions yield an empty set.
pub async fn load_credentials(
    db: &Database,
    session_id: &SessionId,
) -> Result<CredentialSet, ReplyscopeError> {
    let session_id = session_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT key, value FROM session_credentials WHERE session_id = ?1")?;
            let set = stmt
                .query_map(params![session_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<CredentialSet, _>>()?;
            Ok(set)
        })
        .await
        .map_err(map_tr_err)
}

/// Merge keys into the stored set in one transaction.
pub async fn save_credentials(
    db: &Database,
    session_id: &SessionId,
    credentials: &CredentialSet,
) -> Result<(), ReplyscopeError> {
    let session_id = session_id.0.clone();
    let credentials = credentials.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO session_credentials (session_id, key, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(session_id, key) DO UPDATE SET
                         value = excluded.value,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                )?;
                for (key, value) in &credentials {
                    stmt.execute(params![session_id, key, value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove every stored key for a session.
pub async fn delete_credentials(
    db: &Database,
    session_id: &SessionId,
) -> Result<(), ReplyscopeError> {
    let session_id = session_id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM session_credentials WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Sessions with at least one stored key.
pub async fn sessions_with_credentials(db: &Database) -> Result<Vec<SessionId>, ReplyscopeError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT session_id FROM session_credentials ORDER BY session_id",
            )?;
            let ids = stmt
                .query_map([], |row| Ok(SessionId(row.get(0)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, &str)]) -> CredentialSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn save_merges_and_overwrites_keys() {
        let db = Database::open_in_memory().await.unwrap();
        let session = SessionId::from("session-a");

        save_credentials(&db, &session, &set(&[("creds", "v1"), ("pre-key-1", "k")]))
            .await
            .unwrap();
        save_credentials(&db, &session, &set(&[("creds", "v2")]))
            .await
            .unwrap();

        let loaded = load_credentials(&db, &session).await.unwrap();
        assert_eq!(loaded, set(&[("creds", "v2"), ("pre-key-1", "k")]));
    }

    #[tokio::test]
    async fn delete_wipes_only_that_session() {
        let db = Database::open_in_memory().await.unwrap();
        let a = SessionId::from("session-a");
        let b = SessionId::from("session-b");
        save_credentials(&db, &a, &set(&[("creds", "a")])).await.unwrap();
        save_credentials(&db, &b, &set(&[("creds", "b")])).await.unwrap();

        delete_credentials(&db, &a).await.unwrap();

        assert!(load_credentials(&db, &a).await.unwrap().is_empty());
        assert_eq!(sessions_with_credentials(&db).await.unwrap(), vec![b]);
    }
}
