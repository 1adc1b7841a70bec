// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle supervisor for Replyscope.
//!
//! The [`ConnectionSupervisor`] owns one state machine per session:
//! - Opens network clients with stored credentials
//! - Pauses sessions stuck in a pairing-code loop
//! - Reconnects with exponential backoff after transient closes
//! - Wipes credentials on logout
//! - Forwards message batches to the analytics engine and publishes the
//!   results on the event bus

pub mod address;
pub mod extract;
pub mod policy;
pub mod session;
pub mod shutdown;
pub mod supervisor;

pub use policy::{CloseClass, QrLoopGuard, QrVerdict, ReconnectPolicy};
pub use session::{SessionSnapshot, SessionState};
pub use shutdown::install_signal_handler;
pub use supervisor::{ConnectionSupervisor, SentMessage};
