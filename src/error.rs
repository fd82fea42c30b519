//! Error taxonomy.
//!
//! Startup errors abort the process before it listens. Relay errors are
//! per-exchange and are answered immediately, without the configured delay.

use hyper::StatusCode;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::ConfigError;
use crate::net::tls::TlsError;

/// Anything that prevents the proxy from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("TLS material error: {0}")]
    Tls(#[from] TlsError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set up upstream client: {0}")]
    UpstreamClient(#[source] std::io::Error),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Failure of a single relay exchange.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("cannot build upstream URI: {0}")]
    InvalidTarget(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),

    #[error("upstream response body failed: {0}")]
    UpstreamBody(#[source] axum::Error),
}

impl RelayError {
    /// Status code reported to the client for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_) | RelayError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label used for logs and the `outcome` metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::InvalidTarget(_) => "invalid_target",
            RelayError::Upstream(_) => "upstream_error",
            RelayError::UpstreamBody(_) => "upstream_body_error",
        }
    }
}
