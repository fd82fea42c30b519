//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted delay: one week.
pub const MAX_DELAY_SECONDS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// Root configuration for the delaying proxy.
///
/// Built once at startup (file, then CLI overlay, then validation) and
/// shared read-only behind an `Arc` by every relay.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,

    /// Listen address. Defaults to all interfaces.
    pub bind_address: IpAddr,

    /// Terminate TLS on inbound connections.
    pub use_tls: bool,

    /// Seconds every response is held back, measured from request start.
    pub delay_seconds: f64,

    /// Upstream host (`host` or `host:port`) requests are forwarded to.
    pub remote_host: String,

    /// Use TLS for the upstream connection.
    pub remote_uses_tls: bool,

    /// Certificate material for inbound TLS.
    pub tls: TlsFiles,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            use_tls: false,
            delay_seconds: 0.0,
            remote_host: String::new(),
            remote_uses_tls: false,
            tls: TlsFiles::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Socket address the listener binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// The configured delay as a `Duration`.
    ///
    /// Validation keeps `delay_seconds` within `0..=MAX_DELAY_SECONDS`;
    /// anything outside that range is clamped to it (NaN counts as zero).
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_seconds.max(0.0).min(MAX_DELAY_SECONDS))
    }

    /// Scheme used towards the upstream.
    pub fn remote_scheme(&self) -> &'static str {
        if self.remote_uses_tls {
            "https"
        } else {
            "http"
        }
    }

    /// Scheme clients use to reach this proxy.
    pub fn listen_scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }
}

/// PEM files for the inbound TLS listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TlsFiles {
    /// Path to certificate chain (PEM).
    pub cert_path: PathBuf,

    /// Path to private key (PEM).
    pub key_path: PathBuf,
}

impl Default for TlsFiles {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("certificate.pem"),
            key_path: PathBuf::from("privatekey.pem"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}', expected text or json", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Prometheus scrape address. Metrics are off when unset.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_address: None,
        }
    }
}
