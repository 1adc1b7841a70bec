// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process signals for `replyscope serve`.
//!
//! The first SIGINT or SIGTERM cancels the returned token; the serve loop
//! then evicts sessions and closes storage.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Spawn a task that cancels the returned token on SIGINT or SIGTERM.
///
/// Cancelling the token from elsewhere stops the task without logging.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let watched = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            signal = next_signal() => {
                info!(signal, "stopping replyscope");
                watched.cancel();
            }
            _ = watched.cancelled() => debug!("signal watcher released"),
        }
    });

    token
}

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
async fn next_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM unavailable, watching Ctrl+C only");
            return ctrl_c().await;
        }
    };
    tokio::select! {
        name = ctrl_c() => name,
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn next_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        // No handler could be registered; never resolve.
        Err(_) => std::future::pending().await,
    }
}
