// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema for instances, contacts, messages, daily rollups and session
//! credentials, applied with refinery when the database opens.

use replyscope_core::ReplyscopeError;
use tracing::{debug, info};

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Bring `conn` up to the newest embedded schema version.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), ReplyscopeError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| ReplyscopeError::Storage { source: Box::new(e) })?;

    let applied = report.applied_migrations();
    for m in applied {
        debug!(version = m.version(), name = m.name(), "schema step applied");
    }
    if let Some(latest) = applied.last() {
        info!(version = latest.version(), "database schema upgraded");
    }
    Ok(())
}
