//! Outbound side of the relay.
//!
//! # Responsibilities
//! - Own the HTTP(S) client used for every exchange
//! - Rebuild the target URI from the configured host and the inbound path
//! - Forward method, headers and the streaming body unchanged
//! - Collect the upstream response body in full
//!
//! # Design Decisions
//! - One client per process; pooling is whatever hyper-util does by default
//! - The inbound `Host` header is forwarded as received, hyper only fills it
//!   in when the client did not send one
//! - HTTP/1.1 towards the upstream regardless of the inbound protocol

use axum::body::Body;
use hyper::body::Incoming;
use hyper::http::request::Parts;
use hyper::http::uri::{Authority, Scheme};
use hyper::{Request, Response, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::{ConfigError, ServerConfig, ValidationError};
use crate::error::{RelayError, StartupError};
use crate::net::tls::install_crypto_provider;
use crate::relay::exchange::HeldResponse;

type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Where requests go: scheme plus authority of the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    scheme: Scheme,
    authority: Authority,
}

impl UpstreamTarget {
    pub fn from_config(config: &ServerConfig) -> Result<Self, ValidationError> {
        let authority = config
            .remote_host
            .trim()
            .parse::<Authority>()
            .map_err(|_| ValidationError::InvalidRemoteHost(config.remote_host.clone()))?;
        let scheme = if config.remote_uses_tls {
            Scheme::HTTPS
        } else {
            Scheme::HTTP
        };
        Ok(Self { scheme, authority })
    }

    /// Absolute URI for an inbound path-and-query.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, RelayError> {
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| RelayError::InvalidTarget(e.to_string()))
    }
}

impl std::fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// The remote host together with the client used to reach it.
pub struct Upstream {
    target: UpstreamTarget,
    client: UpstreamClient,
}

impl Upstream {
    pub fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let target = UpstreamTarget::from_config(config)
            .map_err(|e| StartupError::Config(ConfigError::Validation(vec![e])))?;

        install_crypto_provider();

        // Native roots are only required when the upstream actually speaks TLS.
        let builder = if config.remote_uses_tls {
            HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(StartupError::UpstreamClient)?
        } else {
            HttpsConnectorBuilder::new().with_tls_config(
                rustls::ClientConfig::builder()
                    .with_root_certificates(rustls::RootCertStore::empty())
                    .with_no_client_auth(),
            )
        };
        let connector = builder.https_or_http().enable_http1().build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { target, client })
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    /// Replay an inbound request against the upstream.
    ///
    /// `body` is handed over as a stream, so request bytes reach the upstream
    /// as they arrive. Resolves once the upstream response head is in.
    pub async fn send(
        &self,
        parts: Parts,
        body: Body,
        path_and_query: &str,
    ) -> Result<Response<Incoming>, RelayError> {
        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method;
        *outbound.uri_mut() = self.target.uri_for(path_and_query)?;
        *outbound.headers_mut() = parts.headers;

        self.client.request(outbound).await.map_err(RelayError::Upstream)
    }
}

/// Read an upstream response to the end and hold on to it.
pub async fn collect(response: Response<Incoming>) -> Result<HeldResponse, RelayError> {
    let (parts, body) = response.into_parts();
    let body = axum::body::to_bytes(Body::new(body), usize::MAX)
        .await
        .map_err(RelayError::UpstreamBody)?;

    Ok(HeldResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}
