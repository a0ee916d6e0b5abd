//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic checks serde cannot express (required-when-present fields)
//! - Resolve defaulted paths before they reach a loader
//!
//! # Design Decisions
//! - Returns the first violation, matching the loader's stop-at-first-error policy
//! - Pure functions over the document; no file system access

use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::TlsDocument;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'tls' section requires 'cert_file'")]
    MissingTlsCertFile,
}

/// File paths handed to the TLS loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub client_cas: Vec<PathBuf>,
}

/// Check the `tls` section and resolve the key path.
///
/// A missing or empty `key_file` falls back to `cert_file`, which covers
/// PEM bundles holding both the chain and the key.
pub fn resolve_tls_paths(tls: &TlsDocument) -> Result<TlsPaths, ValidationError> {
    let cert = match tls.cert_file.as_deref() {
        Some(cert) if !cert.is_empty() => cert,
        _ => return Err(ValidationError::MissingTlsCertFile),
    };

    let key = match tls.key_file.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => cert,
    };

    let client_cas = tls.client_ca_files.iter().map(PathBuf::from).collect();

    Ok(TlsPaths {
        cert: PathBuf::from(cert),
        key: PathBuf::from(key),
        client_cas,
    })
}
