// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for operations on storage entities.

pub mod contacts;
pub mod credentials;
pub mod ingest;
pub mod instances;
pub mod messages;
pub mod metrics;

use std::str::FromStr;

use rusqlite::types::Type;

/// Parse a TEXT column into a strum enum, reporting bad values as conversion failures.
pub(crate) fn parse_text<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Calendar dates are stored as `YYYY-MM-DD` text.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn parse_date(idx: usize, value: String) -> rusqlite::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(&value, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use replyscope_core::Instance;

    use crate::database::Database;

    /// In-memory database with one instance row already inserted.
    pub async fn db_with_instance() -> (Database, Instance) {
        let db = Database::open_in_memory().await.unwrap();
        let instance = Instance::new("tenant-1", "Front desk");
        super::instances::create_instance(&db, &instance)
            .await
            .unwrap();
        (db, instance)
    }
}
