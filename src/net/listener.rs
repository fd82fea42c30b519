//! TCP listener, plain or TLS.
//!
//! # Responsibilities
//! - Load TLS material first, so a bad certificate never opens a socket
//! - Bind to the configured address
//! - Carry the optional rustls config to the HTTP server

use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::StartupError;
use crate::net::tls::load_tls_config;

/// A bound socket, ready to be served.
pub struct Listener {
    inner: TcpListener,
    tls: Option<RustlsConfig>,
}

impl Listener {
    /// Bind according to `config`, terminating TLS if `use_tls` is set.
    pub async fn bind(config: &ServerConfig) -> Result<Self, StartupError> {
        let tls = if config.use_tls {
            Some(load_tls_config(&config.tls).await?)
        } else {
            None
        };

        let addr = config.listen_addr();
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;

        tracing::debug!(
            address = %addr,
            tls = tls.is_some(),
            "Listener bound"
        );

        Ok(Self { inner, tls })
    }

    /// Wrap an already bound plain-HTTP socket.
    pub fn plain(inner: TcpListener) -> Self {
        Self { inner, tls: None }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    pub(crate) fn into_parts(self) -> (TcpListener, Option<RustlsConfig>) {
        (self.inner, self.tls)
    }
}
