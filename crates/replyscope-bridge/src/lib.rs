// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket bridge to the messaging protocol sidecar.
//!
//! The sidecar hosts the actual protocol client (pairing, encryption,
//! multi-device sync). Replyscope talks to it with JSON frames over one
//! socket per session and sees it as an ordinary [`NetworkClientFactory`].
//!
//! [`NetworkClientFactory`]: replyscope_core::NetworkClientFactory

pub mod client;
pub mod factory;
pub mod protocol;

pub use client::BridgeClient;
pub use factory::BridgeFactory;
pub use protocol::{Command, ConnectionFrame, Frame};
