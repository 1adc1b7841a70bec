// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily metric rollups with additive upserts.

use chrono::NaiveDate;
use replyscope_core::{DailyMetric, MetricDelta, ReplyscopeError};
use rusqlite::{Connection, params};

use crate::database::{Database, map_tr_err};
use crate::queries::{DATE_FORMAT, parse_date};

/// Add `delta` to the `(instance_id, date)` row, inserting it if absent.
pub(crate) fn credit_day(
    conn: &Connection,
    instance_id: &str,
    date: NaiveDate,
    delta: &MetricDelta,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO daily_metrics
             (instance_id, date, new_contacts, messages_received, messages_sent,
              returning_contacts)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(instance_id, date) DO UPDATE SET
             new_contacts = new_contacts + excluded.new_contacts,
             messages_received = messages_received + excluded.messages_received,
             messages_sent = messages_sent + excluded.messages_sent,
             returning_contacts = returning_contacts + excluded.returning_contacts",
        params![
            instance_id,
            date.format(DATE_FORMAT).to_string(),
            delta.new_contacts,
            delta.messages_received,
            delta.messages_sent,
            delta.returning_contacts,
        ],
    )?;
    Ok(())
}

/// Rows with `from <= date <= to`, oldest first.
pub async fn daily_metrics(
    db: &Database,
    instance_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DailyMetric>, ReplyscopeError> {
    let instance_id = instance_id.to_string();
    let from = from.format(DATE_FORMAT).to_string();
    let to = to.format(DATE_FORMAT).to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT instance_id, date, new_contacts, messages_received, messages_sent,
                        returning_contacts
                 FROM daily_metrics
                 WHERE instance_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )?;
            let rows = stmt
                .query_map(params![instance_id, from, to], |row| {
                    Ok(DailyMetric {
                        instance_id: row.get(0)?,
                        date: parse_date(1, row.get(1)?)?,
                        new_contacts: row.get(2)?,
                        messages_received: row.get(3)?,
                        messages_sent: row.get(4)?,
                        returning_contacts: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
