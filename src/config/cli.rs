//! Command-line flags and their overlay onto a `ServerConfig`.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::{LogFormat, ServerConfig};
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "malinger")]
#[command(
    about = "HTTP proxy that makes an upstream API slow",
    long_about = "Forwards every request unchanged to --remote-host and holds the complete \
                  response (headers and body) until --delay seconds have passed since the \
                  request arrived. Useful for checking that a client copes with a slow dependency."
)]
pub struct CliArgs {
    /// Port the proxy listens on [default: 8080]
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Listen for HTTPS using --cert and --key
    #[arg(long)]
    pub ssl: bool,

    /// Seconds until response header and body are delivered, at most one week [default: 0]
    #[arg(long, value_name = "SECONDS")]
    pub delay: Option<f64>,

    /// Remote host requests are proxied to (host or host:port)
    #[arg(long, value_name = "HOST")]
    pub remote_host: Option<String>,

    /// Use HTTPS to proxy the requests to the remote host
    #[arg(long)]
    pub remote_ssl: bool,

    /// TOML configuration file; flags given here override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Certificate chain for --ssl [default: certificate.pem]
    #[arg(long, value_name = "FILE")]
    pub cert: Option<PathBuf>,

    /// Private key for --ssl [default: privatekey.pem]
    #[arg(long, value_name = "FILE")]
    pub key: Option<PathBuf>,

    /// Address to listen on [default: 0.0.0.0]
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<IpAddr>,

    /// Log output format: text or json
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Expose Prometheus metrics on this address
    #[arg(long, value_name = "ADDR")]
    pub metrics_address: Option<SocketAddr>,
}

impl CliArgs {
    /// Build the validated startup configuration.
    ///
    /// Starts from defaults (or `--config`), applies every flag that was
    /// given, then validates the result.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };

        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply(self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.ssl {
            config.use_tls = true;
        }
        if let Some(delay) = self.delay {
            config.delay_seconds = delay;
        }
        if let Some(host) = self.remote_host {
            config.remote_host = host;
        }
        if self.remote_ssl {
            config.remote_uses_tls = true;
        }
        if let Some(cert) = self.cert {
            config.tls.cert_path = cert;
        }
        if let Some(key) = self.key {
            config.tls.key_path = key;
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_address = Some(addr);
        }
    }
}
