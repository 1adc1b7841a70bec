// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic write of one ingested message.
//!
//! Contact resolution, counters, the message row and the daily rollup commit
//! together. A failure at any step rolls every step back, so a redelivered
//! message is never mistaken for a duplicate of a half-written one.

use replyscope_core::{MessageRecord, MetricDelta, NewContact, RecordedMessage, ReplyscopeError};

use crate::database::{Database, map_tr_err};
use crate::queries::contacts::{apply_activity, insert_contact, select_contact};
use crate::queries::messages::{insert_message, network_id_stored};
use crate::queries::metrics::credit_day;

/// Record `record` in one transaction. `Ok(None)` means the network id was
/// already stored and nothing was written.
pub async fn record_message(
    db: &Database,
    record: &MessageRecord,
) -> Result<Option<RecordedMessage>, ReplyscopeError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            if let Some(network_id) = record.network_message_id.as_deref()
                && network_id_stored(&tx, &record.instance_id, network_id)?
            {
                return Ok(None);
            }

            let name = record.contact_name();
            let (contact, is_new_contact) =
                match select_contact(&tx, &record.instance_id, &record.address)? {
                    Some(contact) => (contact, false),
                    None => {
                        let created = insert_contact(
                            &tx,
                            &NewContact {
                                instance_id: record.instance_id.clone(),
                                address: record.address.clone(),
                                name: name.map(str::to_string),
                                seen_at: record.timestamp,
                            },
                        )?;
                        (created, true)
                    }
                };
            let is_returning_contact = !is_new_contact && record.is_return_after(contact.last_seen);

            let delta =
                MetricDelta::for_message(record.direction, is_new_contact, is_returning_contact);
            apply_activity(&tx, contact.id, record.timestamp, name, &delta)?;
            let message_id = insert_message(&tx, &record.message_for(contact.id))?;
            credit_day(&tx, &record.instance_id, record.date, &delta)?;

            let contact = select_contact(&tx, &record.instance_id, &record.address)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;

            Ok(Some(RecordedMessage {
                contact,
                message_id,
                is_new_contact,
                is_returning_contact,
            }))
        })
        .await
        .map_err(map_tr_err)
}
