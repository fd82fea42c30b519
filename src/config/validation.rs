//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require an upstream host and check it is a bare authority
//! - Validate value ranges (delay between zero and `MAX_DELAY_SECONDS`)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs after the CLI overlay, before any socket is bound

use hyper::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::{ServerConfig, MAX_DELAY_SECONDS};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("remote host is required (use --remote-host)")]
    MissingRemoteHost,

    #[error("remote host '{0}' must be a host or host:port without scheme or path")]
    InvalidRemoteHost(String),

    #[error("delay must be between 0 and {max} seconds, got {0}", max = MAX_DELAY_SECONDS)]
    InvalidDelay(f64),
}

/// Check a fully assembled configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let host = config.remote_host.trim();
    if host.is_empty() {
        errors.push(ValidationError::MissingRemoteHost);
    } else if !is_bare_authority(host) {
        errors.push(ValidationError::InvalidRemoteHost(config.remote_host.clone()));
    }

    if !(0.0..=MAX_DELAY_SECONDS).contains(&config.delay_seconds) {
        errors.push(ValidationError::InvalidDelay(config.delay_seconds));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_bare_authority(host: &str) -> bool {
    // Userinfo parses as an authority but is never a valid upstream target here.
    !host.contains('@') && host.parse::<Authority>().is_ok()
}
