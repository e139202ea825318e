//! Node assembly and lifecycle.
//!
//! [`Node::build`] wires every component from a [`RouterConfig`] in a fixed
//! order: resolve the self address (fatal on failure), spawn the registry,
//! install static subscriptions, then construct the router and the
//! establisher. [`Node::serve`] starts the handshakes, serves HTTP until
//! the shutdown signal fires, and drains in-flight deliveries.

use std::sync::Arc;

use axum::extract::Request;
use axum::{Router, ServiceExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::config::RouterConfig;
use crate::domain::{ConnectionRequest, SubscriptionRegistry};
use crate::error::RouterError;
use crate::link::{
    AddressResolver, ConnectionEstablisher, EstablishReport, HandshakeAborted, HttpHandshake,
    InterfaceSource,
};
use crate::service::{EventRouter, HttpDelivery};
use crate::shutdown::{self, ShutdownTrigger};

/// A fully wired router node, ready to serve.
#[derive(Debug)]
pub struct Node {
    config: RouterConfig,
    state: AppState,
    establisher: ConnectionEstablisher,
    request: ConnectionRequest,
    shutdown: ShutdownTrigger,
}

impl Node {
    /// Assembles a node.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Configuration`] if the self address cannot be
    /// resolved or the HTTP client cannot be built, and
    /// [`RouterError::Validation`] for a malformed static subscription.
    pub async fn build(
        config: RouterConfig,
        interfaces: Arc<dyn InterfaceSource>,
    ) -> Result<Self, RouterError> {
        let resolver = AddressResolver::new(config.resolution_strategies(), interfaces);
        let self_address = resolver.resolve()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RouterError::Configuration(format!("http client: {e}")))?;

        let registry = SubscriptionRegistry::spawn(config.registry_queue_capacity);
        for subscription in &config.static_subscriptions {
            registry.register(subscription.endpoint()).await?;
        }
        tracing::info!(
            count = config.static_subscriptions.len(),
            "static subscriptions installed"
        );

        let router = EventRouter::new(
            Arc::new(config.routing_table.clone()),
            registry,
            Arc::new(HttpDelivery::new(client.clone())),
        )
        .with_policy(config.delivery_policy())
        .with_mode(config.dispatch_mode);

        let (shutdown, listener) = shutdown::channel();
        let establisher = ConnectionEstablisher::new(
            Arc::new(HttpHandshake::new(client)),
            config.request_timeout,
            listener,
        );
        let request = config.connection_request(&self_address);

        Ok(Self {
            state: AppState {
                router: Arc::new(router),
                self_address: Arc::from(self_address),
                default_peer_role: config.default_peer_role,
            },
            config,
            establisher,
            request,
            shutdown,
        })
    }

    /// The address this node announces to its peers.
    #[must_use]
    pub fn self_address(&self) -> &str {
        &self.state.self_address
    }

    /// Shared handler state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The handshake payload sent to every peer.
    #[must_use]
    pub fn connection_request(&self) -> &ConnectionRequest {
        &self.request
    }

    /// A handle that stops this node when triggered.
    #[must_use]
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.shutdown.clone()
    }

    /// The HTTP application with tracing and CORS layers applied.
    #[must_use]
    pub fn app(&self) -> Router {
        api::build_router()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Starts one handshake task per configured peer.
    #[must_use]
    pub fn start_handshakes(&self) -> Vec<JoinHandle<Result<EstablishReport, HandshakeAborted>>> {
        self.config
            .handshake_targets()
            .into_iter()
            .map(|target| self.establisher.spawn(target, self.request.clone()))
            .collect()
    }

    /// Serves HTTP on `listener` until shutdown, then drains deliveries for
    /// at most the configured grace period.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the server fails.
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let handshakes = self.start_handshakes();
        tracing::info!(
            peers = handshakes.len(),
            self_address = %self.state.self_address,
            "node starting"
        );

        let app = NormalizePathLayer::trim_trailing_slash().layer(self.app());
        let mut stop = self.shutdown.listener();
        axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
            .with_graceful_shutdown(async move { stop.wait().await })
            .await?;

        let drained = self.state.router.drain(self.config.shutdown_grace).await;
        for handshake in handshakes {
            if !handshake.is_finished() {
                handshake.abort();
            }
        }
        tracing::info!(drained, "node stopped");
        Ok(())
    }
}
