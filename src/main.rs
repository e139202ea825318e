//! event-router server entry point.
//!
//! Loads configuration, assembles the node, and serves until ctrl-c or
//! SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use event_router::config::RouterConfig;
use event_router::link::SystemInterfaces;
use event_router::node::Node;
use event_router::shutdown::ShutdownTrigger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RouterConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(addr = %config.listen_addr, role = %config.node_role, "starting event-router");

    // Self address must resolve before anything binds
    let listen_addr = config.listen_addr;
    let node = Node::build(config, Arc::new(SystemInterfaces))
        .await
        .context("assembling node")?;

    tokio::spawn(wait_for_signal(node.shutdown_trigger()));

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    node.serve(listener).await.context("serving")?;

    Ok(())
}

async fn wait_for_signal(shutdown: ShutdownTrigger) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    shutdown.trigger();
}
