//! Handshake establishment with unbounded fixed-interval retry.
//!
//! [`ConnectionEstablisher`] sends a [`ConnectionRequest`] to a peer's
//! registration endpoint and keeps trying, every
//! [`HANDSHAKE_RETRY_DELAY`], until the peer acknowledges with `200 OK` or
//! the process starts shutting down. Peers boot in any order, so there is
//! no attempt cap and no backoff.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use tokio::task::JoinHandle;

use crate::domain::ConnectionRequest;
use crate::error::HandshakeError;
use crate::service::delivery::endpoint_url;
use crate::shutdown::ShutdownListener;

/// Fixed pause between handshake attempts.
pub const HANDSHAKE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Carries one handshake attempt to a peer.
#[async_trait]
pub trait HandshakeTransport: Send + Sync + fmt::Debug {
    /// Sends `request` to `target` once.
    ///
    /// # Errors
    ///
    /// Returns a [`HandshakeError`] unless the peer acknowledged with
    /// `200 OK`.
    async fn send(&self, target: &str, request: &ConnectionRequest) -> Result<(), HandshakeError>;
}

/// POSTs the request as JSON to the peer's `/subscribe` URL.
#[derive(Debug, Clone)]
pub struct HttpHandshake {
    client: reqwest::Client,
}

impl HttpHandshake {
    /// Wraps an existing client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HandshakeTransport for HttpHandshake {
    async fn send(&self, target: &str, request: &ConnectionRequest) -> Result<(), HandshakeError> {
        let response = self
            .client
            .post(endpoint_url(target))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(HandshakeError::NotAcknowledged { status, body })
    }
}

/// Result of a successful establishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstablishReport {
    /// Peer registration URL that acknowledged.
    pub target: String,
    /// Attempts made, including the successful one.
    pub attempts: u64,
}

/// The retry loop was abandoned because the process is shutting down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("handshake with {target} abandoned after {attempts} attempts")]
pub struct HandshakeAborted {
    /// Peer registration URL.
    pub target: String,
    /// Attempts made before giving up.
    pub attempts: u64,
}

/// Runs handshakes against peers until each one acknowledges.
///
/// Cheap to clone; clones share the transport and the shutdown signal.
#[derive(Debug, Clone)]
pub struct ConnectionEstablisher {
    transport: Arc<dyn HandshakeTransport>,
    request_timeout: Duration,
    retry_delay: Duration,
    shutdown: ShutdownListener,
}

impl ConnectionEstablisher {
    /// Creates an establisher. Every attempt is bounded by
    /// `request_timeout`; attempts are spaced by [`HANDSHAKE_RETRY_DELAY`].
    #[must_use]
    pub fn new(
        transport: Arc<dyn HandshakeTransport>,
        request_timeout: Duration,
        shutdown: ShutdownListener,
    ) -> Self {
        Self {
            transport,
            request_timeout,
            retry_delay: HANDSHAKE_RETRY_DELAY,
            shutdown,
        }
    }

    /// Sends `request` to `target` until acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeAborted`] only when shutdown is signalled first.
    /// Peer failures are logged and retried, never returned.
    pub async fn establish(
        &self,
        target: &str,
        request: &ConnectionRequest,
    ) -> Result<EstablishReport, HandshakeAborted> {
        let mut shutdown = self.shutdown.clone();
        let mut attempts: u64 = 0;
        let aborted = |attempts| HandshakeAborted {
            target: target.to_string(),
            attempts,
        };

        loop {
            if shutdown.is_triggered() {
                tracing::info!(peer = %target, attempts, "handshake abandoned on shutdown");
                return Err(aborted(attempts));
            }
            attempts += 1;

            let attempt = tokio::time::timeout(
                self.request_timeout,
                self.transport.send(target, request),
            );
            let outcome = tokio::select! {
                biased;
                () = shutdown.wait() => {
                    tracing::info!(peer = %target, attempts, "handshake abandoned on shutdown");
                    return Err(aborted(attempts));
                }
                outcome = attempt => match outcome {
                    Ok(result) => result,
                    Err(_) => Err(HandshakeError::Timeout(self.request_timeout)),
                },
            };

            match outcome {
                Ok(()) => {
                    tracing::info!(peer = %target, attempts, "connection established");
                    return Ok(EstablishReport {
                        target: target.to_string(),
                        attempts,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        peer = %target,
                        attempt = attempts,
                        error = %e,
                        "handshake attempt failed"
                    );
                    tracing::debug!(
                        peer = %target,
                        retry_in = ?self.retry_delay,
                        "retrying handshake"
                    );
                }
            }

            tokio::select! {
                biased;
                () = shutdown.wait() => {
                    tracing::info!(peer = %target, attempts, "handshake abandoned on shutdown");
                    return Err(aborted(attempts));
                }
                () = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    /// Runs [`Self::establish`] on its own task.
    #[must_use]
    pub fn spawn(
        &self,
        target: String,
        request: ConnectionRequest,
    ) -> JoinHandle<Result<EstablishReport, HandshakeAborted>> {
        let establisher = self.clone();
        tokio::spawn(async move {
            tracing::info!(peer = %target, "creating connection");
            establisher.establish(&target, &request).await
        })
    }
}
