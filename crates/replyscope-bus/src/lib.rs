// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed notification bus for Replyscope.
//!
//! The supervisor publishes lifecycle and message notifications; UI push,
//! metrics, and logging subscribe independently.

pub mod bus;
pub mod logging;
pub mod notification;

pub use bus::{EventBus, ListenerHandle};
pub use logging::{log_notification, register_logging_listener};
pub use notification::{Envelope, Notification};
