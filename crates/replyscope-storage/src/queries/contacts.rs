// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact identity, counters, and activity listings.

use replyscope_core::{Contact, ContactActivity, MetricDelta, NewContact, ReplyscopeError};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::queries::parse_text;

const COLUMNS: &str = "c.id, c.instance_id, c.address, c.name, c.first_seen, c.last_seen, \
                       c.sent_count, c.received_count, c.return_count";

/// Join that attaches each contact's most recent message (`m`).
const LATEST_MESSAGE_JOIN: &str = "messages m ON m.id = (
    SELECT id FROM messages WHERE contact_id = c.id ORDER BY timestamp DESC, id DESC LIMIT 1
)";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        address: row.get(2)?,
        name: row.get(3)?,
        first_seen: row.get(4)?,
        last_seen: row.get(5)?,
        sent_count: row.get(6)?,
        received_count: row.get(7)?,
        return_count: row.get(8)?,
    })
}

/// Contact columns followed by `m.body, m.timestamp, m.direction`.
fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<ContactActivity> {
    let last_direction: Option<String> = row.get(11)?;
    Ok(ContactActivity {
        contact: from_row(row)?,
        last_body: row.get(9)?,
        last_at: row.get(10)?,
        last_direction: last_direction.map(|d| parse_text(11, d)).transpose()?,
    })
}

pub(crate) fn select_contact(
    conn: &Connection,
    instance_id: &str,
    address: &str,
) -> rusqlite::Result<Option<Contact>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM contacts c WHERE c.instance_id = ?1 AND c.address = ?2"),
        params![instance_id, address],
        from_row,
    )
    .optional()
}

pub(crate) fn insert_contact(conn: &Connection, contact: &NewContact) -> rusqlite::Result<Contact> {
    conn.execute(
        "INSERT INTO contacts (instance_id, address, name, first_seen, last_seen)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![contact.instance_id, contact.address, contact.name, contact.seen_at],
    )?;
    Ok(Contact {
        id: conn.last_insert_rowid(),
        instance_id: contact.instance_id.clone(),
        address: contact.address.clone(),
        name: contact.name.clone(),
        first_seen: contact.seen_at,
        last_seen: contact.seen_at,
        sent_count: 0,
        received_count: 0,
        return_count: 0,
    })
}

/// Advance `last_seen` (never backwards), fill in the name when one is
/// given and add the message counters from `delta`.
pub(crate) fn apply_activity(
    conn: &Connection,
    contact_id: i64,
    seen_at: i64,
    name: Option<&str>,
    delta: &MetricDelta,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE contacts SET
             last_seen = MAX(last_seen, ?1),
             name = COALESCE(?2, name),
             sent_count = sent_count + ?3,
             received_count = received_count + ?4,
             return_count = return_count + ?5
         WHERE id = ?6",
        params![
            seen_at,
            name,
            delta.messages_sent,
            delta.messages_received,
            delta.returning_contacts,
            contact_id,
        ],
    )?;
    Ok(())
}

/// Look up a contact by its address within an instance.
pub async fn find_contact(
    db: &Database,
    instance_id: &str,
    address: &str,
) -> Result<Option<Contact>, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    let address = address.to_string();
    db.connection()
        .call(move |conn| select_contact(conn, &instance_id, &address))
        .await
        .map_err(map_tr_err)
}

/// Create a contact with zeroed counters and return the stored row.
pub async fn create_contact(
    db: &Database,
    contact: &NewContact,
) -> Result<Contact, ReplyscopeError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| insert_contact(conn, &contact))
        .await
        .map_err(map_tr_err)
}

/// Most recently seen contacts with their latest message.
pub async fn list_active_contacts(
    db: &Database,
    instance_id: &str,
    limit: usize,
) -> Result<Vec<ContactActivity>, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS}, m.body, m.timestamp, m.direction
                 FROM contacts c LEFT JOIN {LATEST_MESSAGE_JOIN}
                 WHERE c.instance_id = ?1
                 ORDER BY c.last_seen DESC, c.id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![instance_id, limit], activity_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Contacts that have come back at least once, most recently seen first.
pub async fn list_returning_contacts(
    db: &Database,
    instance_id: &str,
) -> Result<Vec<ContactActivity>, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS}, m.body, m.timestamp, m.direction
                 FROM contacts c LEFT JOIN {LATEST_MESSAGE_JOIN}
                 WHERE c.instance_id = ?1 AND c.return_count > 0
                 ORDER BY c.last_seen DESC, c.id DESC"
            ))?;
            let rows = stmt
                .query_map(params![instance_id], activity_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Contacts whose latest message is inbound, longest wait first.
pub async fn list_awaiting_reply(
    db: &Database,
    instance_id: &str,
) -> Result<Vec<ContactActivity>, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS}, m.body, m.timestamp, m.direction
                 FROM contacts c JOIN {LATEST_MESSAGE_JOIN}
                 WHERE c.instance_id = ?1 AND m.direction = 'inbound'
                 ORDER BY m.timestamp ASC, c.id ASC"
            ))?;
            let rows = stmt
                .query_map(params![instance_id], activity_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of contacts whose latest message is inbound.
pub async fn count_awaiting_reply(
    db: &Database,
    instance_id: &str,
) -> Result<i64, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM contacts c JOIN {LATEST_MESSAGE_JOIN}
                     WHERE c.instance_id = ?1 AND m.direction = 'inbound'"
                ),
                params![instance_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Contacts first seen in `[from, to)`.
pub async fn count_new_contacts(
    db: &Database,
    instance_id: &str,
    from: i64,
    to: i64,
) -> Result<i64, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM contacts
                 WHERE instance_id = ?1 AND first_seen >= ?2 AND first_seen < ?3",
                params![instance_id, from, to],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use replyscope_core::{ContentKind, Direction, NewMessage};

    use super::*;
    use crate::queries::messages::create_message;
    use crate::queries::test_support::db_with_instance;

    fn new_contact(instance_id: &str, address: &str, seen_at: i64) -> NewContact {
        NewContact {
            instance_id: instance_id.to_string(),
            address: address.to_string(),
            name: None,
            seen_at,
        }
    }

    async fn activity(db: &Database, contact_id: i64, seen_at: i64, delta: MetricDelta) {
        db.connection()
            .call(move |conn| apply_activity(conn, contact_id, seen_at, None, &delta))
            .await
            .unwrap();
    }

    async fn add_message(db: &Database, contact: &Contact, direction: Direction, ts: i64) {
        create_message(
            db,
            &NewMessage {
                instance_id: contact.instance_id.clone(),
                contact_id: contact.id,
                network_message_id: None,
                direction,
                body: format!("{direction} at {ts}"),
                content_kind: ContentKind::Text,
                timestamp: ts,
                received_at: ts,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn create_then_find_by_address() {
        let (db, instance) = db_with_instance().await;
        let created = create_contact(&db, &new_contact(&instance.id, "a@s.whatsapp.net", 100))
            .await
            .unwrap();
        assert_eq!(created.first_seen, 100);
        assert_eq!(created.last_seen, 100);

        let found = find_contact(&db, &instance.id, "a@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
        assert!(find_contact(&db, &instance.id, "b@s.whatsapp.net").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn same_address_cannot_be_created_twice() {
        let (db, instance) = db_with_instance().await;
        let c = new_contact(&instance.id, "a@s.whatsapp.net", 100);
        create_contact(&db, &c).await.unwrap();
        assert!(create_contact(&db, &c).await.is_err());
    }

    #[tokio::test]
    async fn touch_keeps_name_when_none_and_never_rewinds() {
        let (db, instance) = db_with_instance().await;
        let mut c = new_contact(&instance.id, "a@s.whatsapp.net", 100);
        c.name = Some("Ana".into());
        let contact = create_contact(&db, &c).await.unwrap();

        activity(&db, contact.id, 500, MetricDelta::default()).await;
        activity(&db, contact.id, 300, MetricDelta::default()).await;

        let stored = find_contact(&db, &instance.id, "a@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_seen, 500);
        assert_eq!(stored.name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn counters_increment_in_place() {
        let (db, instance) = db_with_instance().await;
        let contact = create_contact(&db, &new_contact(&instance.id, "a@s.whatsapp.net", 1))
            .await
            .unwrap();
        let sent = MetricDelta::for_message(Direction::Outbound, false, false);
        let returned = MetricDelta::for_message(Direction::Inbound, false, true);
        let received = MetricDelta::for_message(Direction::Inbound, false, false);
        activity(&db, contact.id, 2, sent).await;
        activity(&db, contact.id, 3, returned).await;
        activity(&db, contact.id, 4, received).await;

        let stored = find_contact(&db, &instance.id, "a@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.sent_count, 1);
        assert_eq!(stored.received_count, 2);
        assert_eq!(stored.return_count, 1);
    }

    #[tokio::test]
    async fn awaiting_reply_tracks_last_message_direction() {
        let (db, instance) = db_with_instance().await;
        let waiting = create_contact(&db, &new_contact(&instance.id, "w@s.whatsapp.net", 10))
            .await
            .unwrap();
        let answered = create_contact(&db, &new_contact(&instance.id, "x@s.whatsapp.net", 5))
            .await
            .unwrap();

        add_message(&db, &waiting, Direction::Inbound, 10).await;
        add_message(&db, &answered, Direction::Inbound, 5).await;
        add_message(&db, &answered, Direction::Outbound, 20).await;

        let queue = list_awaiting_reply(&db, &instance.id).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].contact.id, waiting.id);
        assert_eq!(queue[0].last_at, Some(10));
        assert_eq!(queue[0].last_direction, Some(Direction::Inbound));
        assert_eq!(count_awaiting_reply(&db, &instance.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn active_contacts_ordered_by_last_seen_with_limit() {
        let (db, instance) = db_with_instance().await;
        for (i, addr) in ["a", "b", "c"].iter().enumerate() {
            let contact = create_contact(
                &db,
                &new_contact(&instance.id, &format!("{addr}@s.whatsapp.net"), i as i64),
            )
            .await
            .unwrap();
            add_message(&db, &contact, Direction::Inbound, i as i64).await;
        }

        let active = list_active_contacts(&db, &instance.id, 2).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].contact.address, "c@s.whatsapp.net");
        assert_eq!(active[1].contact.address, "b@s.whatsapp.net");
        assert!(active[0].last_body.is_some());
    }

    #[tokio::test]
    async fn returning_listing_only_includes_returners() {
        let (db, instance) = db_with_instance().await;
        let back = create_contact(&db, &new_contact(&instance.id, "r@s.whatsapp.net", 1))
            .await
            .unwrap();
        create_contact(&db, &new_contact(&instance.id, "n@s.whatsapp.net", 2))
            .await
            .unwrap();
        activity(&db, back.id, 90_000, MetricDelta::for_message(Direction::Inbound, false, true))
            .await;
        add_message(&db, &back, Direction::Inbound, 90_000).await;

        let returning = list_returning_contacts(&db, &instance.id).await.unwrap();
        assert_eq!(returning.len(), 1);
        assert_eq!(returning[0].contact.address, "r@s.whatsapp.net");
        assert_eq!(returning[0].last_at, Some(90_000));
    }

    #[tokio::test]
    async fn new_contacts_counted_by_first_seen() {
        let (db, instance) = db_with_instance().await;
        create_contact(&db, &new_contact(&instance.id, "a@s.whatsapp.net", 100))
            .await
            .unwrap();
        create_contact(&db, &new_contact(&instance.id, "b@s.whatsapp.net", 200))
            .await
            .unwrap();
        assert_eq!(count_new_contacts(&db, &instance.id, 0, 200).await.unwrap(), 1);
        assert_eq!(count_new_contacts(&db, &instance.id, 0, 201).await.unwrap(), 2);
    }
}
