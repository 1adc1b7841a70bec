// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`NetworkClientFactory`] that opens sidecar sockets.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use replyscope_config::model::BridgeConfig;
use replyscope_core::{
    AdapterType, BoxError, ClientConfig, ClientHandle, HealthStatus, NetworkClientFactory,
    PluginAdapter, ReplyscopeError,
};
use tokio_tungstenite::connect_async;
use tracing::{debug, info};

use crate::client::BridgeClient;
use crate::protocol::Command;

/// Opens one WebSocket to the protocol sidecar per session.
pub struct BridgeFactory {
    config: BridgeConfig,
    event_buffer: usize,
}

impl BridgeFactory {
    pub fn new(config: BridgeConfig, event_buffer: usize) -> Self {
        Self {
            config,
            event_buffer,
        }
    }

    fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.config.connect_timeout_secs)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }
}

#[async_trait]
impl PluginAdapter for BridgeFactory {
    fn name(&self) -> &str {
        "bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ReplyscopeError> {
        match tokio::time::timeout(self.connect_timeout(), connect_async(self.config.url.as_str()))
            .await
        {
            Ok(Ok((mut socket, _))) => {
                let _ = socket.close(None).await;
                Ok(HealthStatus::Healthy)
            }
            Ok(Err(e)) => Ok(HealthStatus::Unhealthy(format!(
                "sidecar unreachable at {}: {e}",
                self.config.url
            ))),
            Err(_) => Ok(HealthStatus::Unhealthy(format!(
                "sidecar at {} did not answer within {:?}",
                self.config.url,
                self.connect_timeout()
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), ReplyscopeError> {
        debug!("bridge factory shutting down");
        Ok(())
    }
}

#[async_trait]
impl NetworkClientFactory for BridgeFactory {
    async fn open(&self, config: ClientConfig) -> Result<ClientHandle, ReplyscopeError> {
        let session_id = config.session_id.clone();
        let creation_error = |message: String, source: Option<BoxError>| {
            ReplyscopeError::SessionCreation {
                session_id: session_id.to_string(),
                message,
                source,
            }
        };

        let connect = connect_async(self.config.url.as_str());
        let socket = match tokio::time::timeout(self.connect_timeout(), connect).await {
            Ok(Ok((socket, _response))) => socket,
            Ok(Err(e)) => {
                return Err(creation_error(
                    format!("failed to reach sidecar at {}", self.config.url),
                    Some(Box::new(e) as BoxError),
                ));
            }
            Err(_) => {
                return Err(creation_error(
                    format!("sidecar connect timed out after {:?}", self.connect_timeout()),
                    None,
                ));
            }
        };

        let (client, events) = BridgeClient::spawn(
            session_id.clone(),
            socket,
            self.event_buffer,
            self.request_timeout(),
        );
        client
            .submit(Command::Open {
                session_id: session_id.clone(),
                credentials: config.credentials,
            })
            .await
            .map_err(|e| {
                creation_error(
                    "failed to start sidecar session".into(),
                    Some(Box::new(e) as BoxError),
                )
            })?;

        info!(%session_id, url = %self.config.url, "sidecar session opened");
        Ok(ClientHandle {
            client: Arc::new(client),
            events,
        })
    }
}
