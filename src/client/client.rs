//! High-level booking client API.
//!
//! [`BookingClient`] ties a [`ClientConfig`] to a [`ReliableTransport`] and a
//! [`Watcher`]. It does not track request ids; see
//! [`Session`](super::Session) for that.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::codec::{Reply, Request};
use crate::transport::{ReliableTransport, SendReport, TransportError};

use super::config::ClientConfig;
use super::watch::{PushedUpdate, WatchError, WatchSummary, Watcher};

/// Errors that can occur in the booking client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request/reply exchange failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Watch subscription failed.
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),

    /// Argument rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Client for one booking server.
#[derive(Debug, Clone)]
pub struct BookingClient {
    config: ClientConfig,
    transport: ReliableTransport,
    watcher: Watcher,
}

impl BookingClient {
    /// Create a client from `config`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = ReliableTransport::new(config.server_addr.clone());
        let watcher = Watcher::new(transport.clone());
        Self {
            config,
            transport,
            watcher,
        }
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Result<Self, super::config::ConfigError> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the server address.
    pub fn server_addr(&self) -> &str {
        self.transport.server()
    }

    /// Send a one-shot request with the configured transport options.
    ///
    /// Failure statuses are returned as a normal [`Reply`].
    pub async fn send(&self, request: &Request) -> Result<Reply, ClientError> {
        Ok(self.send_with_report(request).await?.reply)
    }

    /// Like [`send`](Self::send), also reporting the attempt count.
    pub async fn send_with_report(&self, request: &Request) -> Result<SendReport, ClientError> {
        Ok(self
            .transport
            .send_with_report(request, &self.config.send_options())
            .await?)
    }

    /// Run a watch for `duration` (the configured default when `None`).
    pub async fn watch(
        &self,
        request: Request,
        duration: Option<Duration>,
        updates: mpsc::Sender<PushedUpdate>,
    ) -> Result<WatchSummary, ClientError> {
        let options = self
            .config
            .watch_options(duration.unwrap_or(self.config.watch_duration));
        Ok(self.watcher.watch(request, &options, updates).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfigBuilder;
    use crate::codec::Operation;

    #[test]
    fn test_client_uses_config_addr() {
        let client = BookingClient::new(
            ClientConfigBuilder::new()
                .server_addr("127.0.0.1:4000")
                .build(),
        );
        assert_eq!(client.server_addr(), "127.0.0.1:4000");
        assert_eq!(client.config().max_retries, 5);
    }

    #[tokio::test]
    async fn test_unresolvable_server() {
        let client = BookingClient::new(
            ClientConfigBuilder::new()
                .server_addr("definitely not an address")
                .build(),
        );
        let err = client
            .send(&Request::new(1, Operation::ListFacilities))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
