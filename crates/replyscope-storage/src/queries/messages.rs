// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message log and the response-time pairing queries built on it.

use replyscope_core::{
    Direction, FirstContactPair, NewMessage, ReplyscopeError, ResponsePair, StoredMessage,
};
use rusqlite::{Connection, params};

use crate::database::{Database, map_tr_err};
use crate::queries::parse_text;

pub(crate) fn insert_message(conn: &Connection, message: &NewMessage) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO messages (instance_id, contact_id, network_message_id, direction, \
         body, content_kind, timestamp, received_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            message.instance_id,
            message.contact_id,
            message.network_message_id,
            message.direction.to_string(),
            message.body,
            message.content_kind.to_string(),
            message.timestamp,
            message.received_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Whether a network message id is already stored for the instance.
pub(crate) fn network_id_stored(
    conn: &Connection,
    instance_id: &str,
    network_message_id: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM messages WHERE instance_id = ?1 AND network_message_id = ?2
         )",
        params![instance_id, network_message_id],
        |row| row.get(0),
    )
}

/// Append a message and return its row id.
pub async fn create_message(db: &Database, message: &NewMessage) -> Result<i64, ReplyscopeError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| insert_message(conn, &message))
        .await
        .map_err(map_tr_err)
}

/// Full conversation with one contact, oldest first.
pub async fn messages_for_contact(
    db: &Database,
    contact_id: i64,
) -> Result<Vec<StoredMessage>, ReplyscopeError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, instance_id, contact_id, network_message_id, direction, body, \
                 content_kind, timestamp, received_at \
                 FROM messages WHERE contact_id = ?1 ORDER BY timestamp ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![contact_id], |row| {
                    Ok(StoredMessage {
                        id: row.get(0)?,
                        instance_id: row.get(1)?,
                        contact_id: row.get(2)?,
                        network_message_id: row.get(3)?,
                        direction: parse_text(4, row.get(4)?)?,
                        body: row.get(5)?,
                        content_kind: parse_text(6, row.get(6)?)?,
                        timestamp: row.get(7)?,
                        received_at: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Count messages of one direction with `from <= timestamp < to`.
pub async fn count_messages(
    db: &Database,
    instance_id: &str,
    from: i64,
    to: i64,
    direction: Direction,
) -> Result<i64, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    let direction = direction.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages \
                 WHERE instance_id = ?1 AND direction = ?2 AND timestamp >= ?3 AND timestamp < ?4",
                params![instance_id, direction, from, to],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Inbound messages in range, each with the earliest strictly later outbound
/// message to the same contact.
pub async fn response_pairs(
    db: &Database,
    instance_id: &str,
    from: i64,
    to: i64,
) -> Result<Vec<ResponsePair>, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT i.contact_id, i.timestamp,
                        (SELECT MIN(o.timestamp) FROM messages o
                          WHERE o.contact_id = i.contact_id
                            AND o.direction = 'outbound'
                            AND o.timestamp > i.timestamp)
                 FROM messages i
                 WHERE i.instance_id = ?1 AND i.direction = 'inbound'
                   AND i.timestamp >= ?2 AND i.timestamp < ?3
                 ORDER BY i.timestamp ASC, i.id ASC",
            )?;
            let rows = stmt
                .query_map(params![instance_id, from, to], |row| {
                    Ok(ResponsePair {
                        contact_id: row.get(0)?,
                        inbound_at: row.get(1)?,
                        reply_at: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Contacts whose first-ever message falls in range, with their first-ever
/// outbound message (not bounded by the range).
pub async fn first_response_pairs(
    db: &Database,
    instance_id: &str,
    from: i64,
    to: i64,
) -> Result<Vec<FirstContactPair>, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT f.contact_id, f.first_at,
                        (SELECT MIN(o.timestamp) FROM messages o
                          WHERE o.contact_id = f.contact_id AND o.direction = 'outbound')
                 FROM (SELECT contact_id, MIN(timestamp) AS first_at
                         FROM messages WHERE instance_id = ?1
                        GROUP BY contact_id) f
                 WHERE f.first_at >= ?2 AND f.first_at < ?3
                 ORDER BY f.first_at ASC",
            )?;
            let rows = stmt
                .query_map(params![instance_id, from, to], |row| {
                    Ok(FirstContactPair {
                        contact_id: row.get(0)?,
                        first_at: row.get(1)?,
                        first_outbound_at: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use replyscope_core::{Contact, ContentKind, NewContact};

    use super::*;
    use crate::queries::contacts::create_contact;
    use crate::queries::test_support::db_with_instance;

    async fn contact(db: &Database, instance_id: &str, address: &str) -> Contact {
        create_contact(
            db,
            &NewContact {
                instance_id: instance_id.to_string(),
                address: address.to_string(),
                name: None,
                seen_at: 0,
            },
        )
        .await
        .unwrap()
    }

    fn msg(
        contact: &Contact,
        direction: Direction,
        ts: i64,
        network_id: Option<&str>,
    ) -> NewMessage {
        NewMessage {
            instance_id: contact.instance_id.clone(),
            contact_id: contact.id,
            network_message_id: network_id.map(str::to_string),
            direction,
            body: "body".to_string(),
            content_kind: ContentKind::Text,
            timestamp: ts,
            received_at: ts,
        }
    }

    #[tokio::test]
    async fn conversation_is_ordered_by_timestamp() {
        let (db, instance) = db_with_instance().await;
        let c = contact(&db, &instance.id, "a@s.whatsapp.net").await;
        create_message(&db, &msg(&c, Direction::Outbound, 30, None)).await.unwrap();
        create_message(&db, &msg(&c, Direction::Inbound, 10, None)).await.unwrap();

        let conv = messages_for_contact(&db, c.id).await.unwrap();
        assert_eq!(conv.len(), 2);
        assert_eq!(conv[0].timestamp, 10);
        assert_eq!(conv[0].direction, Direction::Inbound);
        assert_eq!(conv[1].timestamp, 30);
    }

    #[tokio::test]
    async fn network_id_is_unique_per_instance() {
        let (db, instance) = db_with_instance().await;
        let c = contact(&db, &instance.id, "a@s.whatsapp.net").await;
        create_message(&db, &msg(&c, Direction::Inbound, 1, Some("ABC"))).await.unwrap();

        let id = instance.id.clone();
        let (abc, xyz) = db
            .connection()
            .call(move |conn| {
                Ok::<_, rusqlite::Error>((
                    network_id_stored(conn, &id, "ABC")?,
                    network_id_stored(conn, &id, "XYZ")?,
                ))
            })
            .await
            .unwrap();
        assert!(abc);
        assert!(!xyz);
        assert!(
            create_message(&db, &msg(&c, Direction::Inbound, 2, Some("ABC")))
                .await
                .is_err()
        );
        // Null ids never collide.
        create_message(&db, &msg(&c, Direction::Inbound, 3, None)).await.unwrap();
        create_message(&db, &msg(&c, Direction::Inbound, 4, None)).await.unwrap();
    }

    #[tokio::test]
    async fn counts_respect_half_open_range() {
        let (db, instance) = db_with_instance().await;
        let c = contact(&db, &instance.id, "a@s.whatsapp.net").await;
        for ts in [100, 150, 200] {
            create_message(&db, &msg(&c, Direction::Inbound, ts, None)).await.unwrap();
        }
        create_message(&db, &msg(&c, Direction::Outbound, 160, None)).await.unwrap();

        assert_eq!(
            count_messages(&db, &instance.id, 100, 200, Direction::Inbound).await.unwrap(),
            2
        );
        assert_eq!(
            count_messages(&db, &instance.id, 100, 200, Direction::Outbound).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn response_pair_uses_earliest_strictly_later_reply() {
        let (db, instance) = db_with_instance().await;
        let c = contact(&db, &instance.id, "a@s.whatsapp.net").await;
        create_message(&db, &msg(&c, Direction::Inbound, 1000, None)).await.unwrap();
        create_message(&db, &msg(&c, Direction::Outbound, 1000, None)).await.unwrap();
        create_message(&db, &msg(&c, Direction::Outbound, 1030, None)).await.unwrap();
        create_message(&db, &msg(&c, Direction::Outbound, 1090, None)).await.unwrap();
        create_message(&db, &msg(&c, Direction::Inbound, 2000, None)).await.unwrap();

        let pairs = response_pairs(&db, &instance.id, 0, 10_000).await.unwrap();
        assert_eq!(
            pairs,
            vec![
                ResponsePair { contact_id: c.id, inbound_at: 1000, reply_at: Some(1030) },
                ResponsePair { contact_id: c.id, inbound_at: 2000, reply_at: None },
            ]
        );
    }

    #[tokio::test]
    async fn first_response_search_is_not_bounded_by_range() {
        let (db, instance) = db_with_instance().await;
        let early = contact(&db, &instance.id, "early@s.whatsapp.net").await;
        let late = contact(&db, &instance.id, "late@s.whatsapp.net").await;
        create_message(&db, &msg(&early, Direction::Inbound, 50, None)).await.unwrap();
        create_message(&db, &msg(&late, Direction::Inbound, 150, None)).await.unwrap();
        create_message(&db, &msg(&late, Direction::Outbound, 5_000, None)).await.unwrap();

        let pairs = first_response_pairs(&db, &instance.id, 100, 200).await.unwrap();
        assert_eq!(
            pairs,
            vec![FirstContactPair {
                contact_id: late.id,
                first_at: 150,
                first_outbound_at: Some(5_000),
            }]
        );
    }
}
