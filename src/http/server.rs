//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every method and path goes to the relay
//! - Serve HTTP/1.1 and HTTP/2, plain or TLS
//! - Wire up request tracing
//! - Stop accepting on shutdown and let in-flight exchanges finish
//!
//! # Design Decisions
//! - Connections are driven by hyper-util's auto builder rather than
//!   `axum::serve`, so the automatic `Date` header can be switched off and
//!   released responses carry only upstream headers

use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::lifecycle::shutdown::triggered;
use crate::net::Listener;
use crate::relay::{ExchangeTracker, Relay};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// HTTP front end of the delaying proxy.
pub struct HttpServer {
    router: Router,
    relay: Arc<Relay>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self, StartupError> {
        let relay = Arc::new(Relay::new(&config, ExchangeTracker::new())?);
        let state = AppState {
            relay: Arc::clone(&relay),
        };

        Ok(Self {
            router: Self::build_router(state),
            relay,
        })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(relay_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Handle on the in-flight exchange count.
    pub fn tracker(&self) -> ExchangeTracker {
        self.relay.tracker().clone()
    }

    /// Serve connections on `listener` until `shutdown` fires.
    ///
    /// After the trigger no new connections are accepted; the future resolves
    /// once open connections have finished.
    pub async fn run(
        self,
        listener: Listener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), StartupError> {
        let addr = listener.local_addr()?;

        match listener.into_parts() {
            (tcp, None) => {
                tracing::info!(address = %addr, "HTTP server starting");
                serve_plain(tcp, self.router, shutdown).await;
            }
            (tcp, Some(tls)) => {
                tracing::info!(address = %addr, "HTTPS server starting");
                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    triggered(shutdown).await;
                    shutdown_handle.graceful_shutdown(None);
                });

                let mut server = axum_server::from_tcp_rustls(tcp.into_std()?, tls).handle(handle);
                without_date_header(server.http_builder());
                server.serve(self.router.into_make_service()).await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// hyper stamps a `Date` header on every response by default.
fn without_date_header(builder: &mut auto::Builder<TokioExecutor>) {
    builder.http1().auto_date_header(false);
    builder.http2().auto_date_header(false);
}

async fn serve_plain(tcp: TcpListener, router: Router, shutdown: broadcast::Receiver<()>) {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    without_date_header(&mut builder);

    let graceful = GracefulShutdown::new();
    let stop = triggered(shutdown);
    tokio::pin!(stop);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = tcp.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    continue;
                }
            },
            _ = &mut stop => break,
        };

        tracing::debug!(peer = %peer, "Connection accepted");
        let builder = builder.clone();
        let watcher = graceful.watcher();
        let service = TowerToHyperService::new(router.clone());
        tokio::spawn(async move {
            let conn = builder.serve_connection(TokioIo::new(stream), service);
            if let Err(e) = watcher.watch(conn).await {
                tracing::debug!(peer = %peer, error = %e, "Connection ended with error");
            }
        });
    }

    drop(tcp);
    graceful.shutdown().await;
}

/// Every request, whatever its method or path, is relayed.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.relay.handle(request).await
}
