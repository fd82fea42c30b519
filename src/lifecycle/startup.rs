//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize metrics, the relay and the listener in dependency order
//! - Announce what is being proxied where
//! - Run until a signal arrives, then drain in-flight exchanges
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last (traffic only when ready)
//! - Draining is bounded by the configured delay plus a fixed grace

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::Listener;
use crate::observability::metrics;

const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Run the proxy until SIGINT/SIGTERM or a fatal server error.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    if let Some(addr) = config.observability.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config.clone())?;
    let tracker = server.tracker();
    let listener = Listener::bind(&config).await?;
    announce(&config, listener.local_addr()?);

    let shutdown = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        _ = signals::wait_for_signal() => {}
        joined = &mut server_task => {
            return match joined {
                Ok(result) => result,
                Err(e) => Err(StartupError::Serve(std::io::Error::other(e))),
            };
        }
    }

    tracing::info!(
        in_flight = tracker.active_count(),
        "Shutting down; no longer accepting connections"
    );
    shutdown.trigger();

    let left = tracker.drain(config.delay() + DRAIN_GRACE).await;
    if left > 0 {
        tracing::warn!(abandoned = left, "Grace period over; dropping held exchanges");
        server_task.abort();
    } else if let Ok(Ok(Err(e))) = tokio::time::timeout(DRAIN_GRACE, server_task).await {
        return Err(e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn announce(config: &ServerConfig, local_addr: SocketAddr) {
    tracing::info!(
        "Listening on {} for {} requests",
        local_addr,
        config.listen_scheme().to_uppercase()
    );
    tracing::info!(
        "  * proxying requests to {}://{}",
        config.remote_scheme(),
        config.remote_host
    );
    if !config.delay().is_zero() {
        tracing::info!(
            "  * delaying each response for {} seconds",
            config.delay_seconds
        );
    }
}
