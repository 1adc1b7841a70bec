// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnect backoff, QR-loop detection, and close-code classification.

use std::time::Duration;

use replyscope_config::model::SupervisorConfig;
use tokio::time::Instant;

/// Exponential reconnect backoff with a hard attempt limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
            factor: config.reconnect_factor,
            max_delay: Duration::from_millis(config.reconnect_max_delay_ms),
            max_attempts: config.reconnect_max_attempts,
        }
    }

    /// Delay before reconnect `attempt` (1-based), or `None` once the attempt
    /// limit is exceeded.
    ///
    /// `min(max_delay, base_delay × factor^(attempt − 1))`, truncated to whole
    /// milliseconds.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let raw_ms = self.base_delay.as_millis() as f64 * self.factor.powi(exponent);
        let cap_ms = self.max_delay.as_millis() as f64;
        Some(Duration::from_millis(raw_ms.min(cap_ms) as u64))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&SupervisorConfig::default())
    }
}

/// Outcome of recording one QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrVerdict {
    /// Show the code; this is attempt `attempt` inside the current window.
    Issue { attempt: u32 },
    /// Too many codes inside the window; pause the session.
    Loop { attempts: u32 },
}

/// Counts QR codes inside a rolling window.
///
/// The window opens with the first code and resets once it has elapsed.
#[derive(Debug, Clone)]
pub struct QrLoopGuard {
    max_attempts: u32,
    window: Duration,
    count: u32,
    window_start: Option<Instant>,
}

impl QrLoopGuard {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            count: 0,
            window_start: None,
        }
    }

    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(
            config.qr_max_attempts,
            Duration::from_secs(config.qr_window_secs),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn record(&mut self, now: Instant) -> QrVerdict {
        match self.window_start {
            Some(start) if now.duration_since(start) < self.window => {}
            _ => {
                self.window_start = Some(now);
                self.count = 0;
            }
        }
        self.count += 1;
        if self.count > self.max_attempts {
            QrVerdict::Loop {
                attempts: self.count,
            }
        } else {
            QrVerdict::Issue {
                attempt: self.count,
            }
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.window_start = None;
    }
}

/// What a connection close means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseClass {
    /// The account logged this device out (401).
    LoggedOut,
    /// The network refused the session (403).
    Forbidden,
    /// Anything else; worth reconnecting.
    Transient,
}

impl CloseClass {
    pub fn classify(code: Option<u16>) -> Self {
        match code {
            Some(401) => CloseClass::LoggedOut,
            Some(403) => CloseClass::Forbidden,
            _ => CloseClass::Transient,
        }
    }

    /// Whether the session must be dropped and its credentials wiped.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CloseClass::Transient)
    }
}
