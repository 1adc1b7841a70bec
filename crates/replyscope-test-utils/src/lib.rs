// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Replyscope integration tests.
//!
//! Provides a mock network and a test harness for fast, deterministic tests
//! without a protocol sidecar.
//!
//! # Components
//!
//! - [`MockNetworkFactory`] / [`MockClient`] - injectable client events and captured sends
//! - [`TestHarness`] - storage, analytics, bus, and supervisor wired together

pub mod harness;
pub mod mock_network;

pub use harness::{TestHarness, TestHarnessBuilder, eventually, next_of_kind};
pub use mock_network::{MockClient, MockNetworkFactory, SentText, inbound_text, outbound_text};
