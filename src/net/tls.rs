//! TLS configuration and certificate loading.
//!
//! PEM material is read and checked up front so that a missing or empty
//! certificate/key is reported with the offending path before any socket is
//! bound.

use axum_server::tls_rustls::RustlsConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::TlsFiles;

/// Errors loading inbound TLS material. All of them are startup-fatal.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no PEM certificate found in {}", .0.display())]
    NoCertificate(PathBuf),

    #[error("no PEM private key found in {}", .0.display())]
    NoPrivateKey(PathBuf),

    #[error("certificate and key rejected: {0}")]
    Rejected(#[source] std::io::Error),
}

/// DER-encoded certificate chain and private key read from PEM files.
#[derive(Debug)]
pub struct PemMaterial {
    pub cert_chain: Vec<Vec<u8>>,
    pub private_key: Vec<u8>,
}

/// Make aws-lc-rs the process-wide rustls provider.
///
/// Both the inbound acceptor and the upstream connector build rustls
/// configs; neither should depend on which provider features the
/// dependency graph happens to enable.
pub fn install_crypto_provider() {
    // Err means a provider is already installed, which is fine.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(files: &TlsFiles) -> Result<RustlsConfig, TlsError> {
    install_crypto_provider();
    let material = read_pem_material(files)?;

    tracing::debug!(
        cert_path = %files.cert_path.display(),
        key_path = %files.key_path.display(),
        chain_len = material.cert_chain.len(),
        "TLS material loaded"
    );

    RustlsConfig::from_der(material.cert_chain, material.private_key)
        .await
        .map_err(TlsError::Rejected)
}

/// Read the certificate chain and private key without building a rustls config.
pub fn read_pem_material(files: &TlsFiles) -> Result<PemMaterial, TlsError> {
    let mut cert_reader = open(&files.cert_path)?;
    let cert_chain = rustls_pemfile::certs(&mut cert_reader)
        .map(|cert| cert.map(|der| der.to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            path: files.cert_path.clone(),
            source,
        })?;

    if cert_chain.is_empty() {
        return Err(TlsError::NoCertificate(files.cert_path.clone()));
    }

    let mut key_reader = open(&files.key_path)?;
    let private_key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|source| TlsError::Read {
            path: files.key_path.clone(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(files.key_path.clone()))?;

    Ok(PemMaterial {
        cert_chain,
        private_key: private_key.secret_der().to_vec(),
    })
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    if !path.exists() {
        return Err(TlsError::MissingFile(path.to_path_buf()));
    }
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Read {
            path: path.to_path_buf(),
            source,
        })
}
