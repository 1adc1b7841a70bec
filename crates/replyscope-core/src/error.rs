// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Replyscope.

use thiserror::Error;

/// Boxed error source carried by several variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across all Replyscope crates.
#[derive(Debug, Error)]
pub enum ReplyscopeError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// A store failure while ingesting a message. The message is dropped.
    #[error("persistence error: {message}")]
    Persistence {
        message: String,
        source: Option<BoxError>,
    },

    /// The network client for a session could not be initialized.
    #[error("failed to create session {session_id}: {message}")]
    SessionCreation {
        session_id: String,
        message: String,
        source: Option<BoxError>,
    },

    /// An outbound send was rejected before reaching the network.
    #[error("cannot send on session {session_id}: {reason}")]
    Send { session_id: String, reason: String },

    /// Network client errors (socket failure, malformed frame, remote error).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<BoxError>,
    },

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReplyscopeError {
    /// Wrap any store error as a [`ReplyscopeError::Persistence`] failure.
    pub fn persistence(message: impl Into<String>, source: ReplyscopeError) -> Self {
        ReplyscopeError::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
