//! TLS configuration and certificate loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{VerifierBuilderError, WebPkiClientVerifier};
use rustls::{RootCertStore, ServerConfig};
use thiserror::Error;

/// Errors raised while turning PEM files into a server TLS context.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read TLS file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PEM in {path:?}: {source}")]
    Pem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {path:?}")]
    NoCertificates { path: PathBuf },

    #[error("no private key found in {path:?}")]
    NoPrivateKey { path: PathBuf },

    #[error("invalid client CA certificate in {path:?}: {source}")]
    ClientCa {
        path: PathBuf,
        #[source]
        source: rustls::Error,
    },

    #[error("failed to build client certificate verifier: {0}")]
    Verifier(#[from] VerifierBuilderError),

    #[error("invalid certificate or key material: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Builds a server TLS context from certificate, key and client CA files.
pub trait TlsLoader: Send + Sync {
    fn load(
        &self,
        cert_path: &Path,
        key_path: &Path,
        client_ca_paths: &[PathBuf],
    ) -> Result<Arc<ServerConfig>, TlsError>;
}

/// Loads PEM material with rustls.
///
/// When client CA files are given, clients must present a certificate
/// chaining to one of them.
#[derive(Debug, Clone)]
pub struct RustlsLoader {
    provider: Arc<CryptoProvider>,
}

impl RustlsLoader {
    pub fn new() -> Self {
        Self {
            provider: Arc::new(rustls::crypto::ring::default_provider()),
        }
    }
}

impl Default for RustlsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsLoader for RustlsLoader {
    fn load(
        &self,
        cert_path: &Path,
        key_path: &Path,
        client_ca_paths: &[PathBuf],
    ) -> Result<Arc<ServerConfig>, TlsError> {
        let certs = read_certs(cert_path)?;
        let key = read_private_key(key_path)?;

        let builder = ServerConfig::builder_with_provider(self.provider.clone())
            .with_safe_default_protocol_versions()?;

        let builder = if client_ca_paths.is_empty() {
            builder.with_no_client_auth()
        } else {
            let mut roots = RootCertStore::empty();
            for ca_path in client_ca_paths {
                for cert in read_certs(ca_path)? {
                    roots.add(cert).map_err(|source| TlsError::ClientCa {
                        path: ca_path.clone(),
                        source,
                    })?;
                }
            }
            let verifier =
                WebPkiClientVerifier::builder_with_provider(Arc::new(roots), self.provider.clone())
                    .build()?;
            builder.with_client_cert_verifier(verifier)
        };

        let config = builder.with_single_cert(certs, key)?;

        tracing::debug!(
            cert = ?cert_path,
            key = ?key_path,
            client_cas = client_ca_paths.len(),
            "TLS material loaded"
        );

        Ok(Arc::new(config))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let pem = read_file(path)?;
    let certs = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Pem {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates {
            path: path.to_path_buf(),
        });
    }
    Ok(certs)
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let pem = read_file(path)?;
    rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(|source| TlsError::Pem {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey {
            path: path.to_path_buf(),
        })
}
