//! Configuration loading from disk.
//!
//! # Steps
//! ```text
//! read bytes → strict YAML decode → assemble:
//!     bind address/port → deny ranges → allow ranges → timeouts
//!     → maintenance file → statsd → egress ACL → proxy protocol
//!     → TLS → deny message
//! ```
//!
//! Assembly stops at the first failing step; no partial `Config` is returned.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::runtime::Config;
use crate::config::schema::ConfigDocument;
use crate::config::validation::{resolve_tls_paths, ValidationError};
use crate::net::ranges::{RangeParseError, RangeSet};
use crate::net::tls::{RustlsLoader, TlsError, TlsLoader};
use crate::observability::statsd::{StatsdConnector, StatsdError, UdpStatsdConnector};
use crate::security::acl::{AclError, AclLoader, FileAclLoader};

/// Which range list a parse error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeList {
    Deny,
    Allow,
}

impl fmt::Display for RangeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeList::Deny => write!(f, "deny_ranges"),
            RangeList::Allow => write!(f, "allow_ranges"),
        }
    }
}

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode config: {0}")]
    Decode(#[source] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid {list}: {source}")]
    Range {
        list: RangeList,
        #[source]
        source: RangeParseError,
    },

    #[error("maintenance_file {path:?} is not accessible: {source}")]
    MaintenanceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load acl_file {path:?}: {source}")]
    Acl {
        path: PathBuf,
        #[source]
        source: AclError,
    },

    #[error("failed to load TLS material: {0}")]
    Tls(#[from] TlsError),

    #[error("failed to set up statsd client for {address:?}: {source}")]
    Statsd {
        address: String,
        #[source]
        source: StatsdError,
    },
}

/// Stable classification of a [`ConfigError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    Io,
    Decode,
    Validation,
    Range,
    MaintenanceFile,
    Acl,
    Tls,
    Statsd,
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::Io { .. } => ConfigErrorKind::Io,
            ConfigError::Decode(_) => ConfigErrorKind::Decode,
            ConfigError::Validation(_) => ConfigErrorKind::Validation,
            ConfigError::Range { .. } => ConfigErrorKind::Range,
            ConfigError::MaintenanceFile { .. } => ConfigErrorKind::MaintenanceFile,
            ConfigError::Acl { .. } => ConfigErrorKind::Acl,
            ConfigError::Tls(_) => ConfigErrorKind::Tls,
            ConfigError::Statsd { .. } => ConfigErrorKind::Statsd,
        }
    }
}

/// Builds validated configurations, calling out to the range, statsd,
/// ACL and TLS collaborators in a fixed order.
#[derive(Clone)]
pub struct ConfigLoader {
    statsd: Arc<dyn StatsdConnector>,
    acl: Arc<dyn AclLoader>,
    tls: Arc<dyn TlsLoader>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            statsd: Arc::new(UdpStatsdConnector::default()),
            acl: Arc::new(FileAclLoader),
            tls: Arc::new(RustlsLoader::new()),
        }
    }
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader").finish_non_exhaustive()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statsd_connector(mut self, connector: impl StatsdConnector + 'static) -> Self {
        self.statsd = Arc::new(connector);
        self
    }

    pub fn with_acl_loader(mut self, loader: impl AclLoader + 'static) -> Self {
        self.acl = Arc::new(loader);
        self
    }

    pub fn with_tls_loader(mut self, loader: impl TlsLoader + 'static) -> Self {
        self.tls = Arc::new(loader);
        self
    }

    /// Read, decode and assemble the configuration at `path`.
    pub fn load(&self, path: &Path) -> Result<Config, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = ?path, bytes = bytes.len(), "Config file read");
        self.load_from_bytes(&bytes)
    }

    /// Decode and assemble an in-memory YAML document.
    pub fn load_from_bytes(&self, bytes: &[u8]) -> Result<Config, ConfigError> {
        let document = ConfigDocument::from_slice(bytes).map_err(ConfigError::Decode)?;
        self.assemble(document)
    }

    /// Turn a decoded document into a validated configuration.
    pub fn assemble(&self, doc: ConfigDocument) -> Result<Config, ConfigError> {
        let ConfigDocument {
            ip,
            port,
            deny_ranges,
            allow_ranges,
            connect_timeout,
            exit_timeout,
            maintenance_file,
            statsd_address,
            acl_file,
            support_proxy_protocol,
            tls,
            deny_message,
        } = doc;

        let deny_ranges = RangeSet::parse(deny_ranges.as_slice()).map_err(|source| ConfigError::Range {
            list: RangeList::Deny,
            source,
        })?;
        let allow_ranges = RangeSet::parse(allow_ranges.as_slice()).map_err(|source| ConfigError::Range {
            list: RangeList::Allow,
            source,
        })?;
        tracing::debug!(
            deny = deny_ranges.len(),
            allow = allow_ranges.len(),
            "Address ranges parsed"
        );

        let connect_timeout = connect_timeout.unwrap_or_default();
        let exit_timeout = exit_timeout.unwrap_or_default();

        let maintenance_file = if maintenance_file.is_empty() {
            None
        } else {
            let path = PathBuf::from(maintenance_file);
            std::fs::metadata(&path).map_err(|source| ConfigError::MaintenanceFile {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = ?path, "Maintenance file present");
            Some(path)
        };

        let statsd = self
            .statsd
            .connect(&statsd_address)
            .map_err(|source| ConfigError::Statsd {
                address: statsd_address.clone(),
                source,
            })?;

        let egress_acl = if acl_file.is_empty() {
            None
        } else {
            let path = PathBuf::from(acl_file);
            let acl = self
                .acl
                .load(&path)
                .map_err(|source| ConfigError::Acl {
                    path: path.clone(),
                    source,
                })?;
            Some(acl)
        };

        let tls = match tls {
            Some(section) => {
                let paths = resolve_tls_paths(&section)?;
                Some(self.tls.load(&paths.cert, &paths.key, &paths.client_cas)?)
            }
            None => None,
        };

        let deny_message = (!deny_message.is_empty()).then_some(deny_message);

        tracing::info!(
            ip = %ip,
            port,
            deny_ranges = deny_ranges.len(),
            allow_ranges = allow_ranges.len(),
            acl = egress_acl.is_some(),
            tls = tls.is_some(),
            proxy_protocol = support_proxy_protocol,
            "Configuration loaded"
        );

        Ok(Config {
            ip,
            port,
            deny_ranges,
            allow_ranges,
            connect_timeout,
            exit_timeout,
            maintenance_file,
            support_proxy_protocol,
            statsd,
            egress_acl,
            tls,
            deny_message,
        })
    }
}

/// Load and validate configuration from a YAML file with the default collaborators.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    ConfigLoader::default().load(path.as_ref())
}

/// Load and validate configuration from YAML bytes with the default collaborators.
pub fn load_config_from_bytes(bytes: &[u8]) -> Result<Config, ConfigError> {
    ConfigLoader::default().load_from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rustls::ServerConfig;

    use crate::observability::statsd::StatsdHandle;
    use crate::security::acl::EgressAcl;

    #[derive(Default, Clone)]
    struct RecordingTlsLoader {
        calls: Arc<Mutex<Vec<(PathBuf, PathBuf, Vec<PathBuf>)>>>,
    }

    impl TlsLoader for RecordingTlsLoader {
        fn load(
            &self,
            cert_path: &Path,
            key_path: &Path,
            client_ca_paths: &[PathBuf],
        ) -> Result<Arc<ServerConfig>, TlsError> {
            self.calls.lock().unwrap().push((
                cert_path.to_path_buf(),
                key_path.to_path_buf(),
                client_ca_paths.to_vec(),
            ));
            Err(TlsError::NoCertificates {
                path: cert_path.to_path_buf(),
            })
        }
    }

    #[derive(Default, Clone)]
    struct CountingConnector {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl StatsdConnector for CountingConnector {
        fn connect(&self, address: &str) -> Result<StatsdHandle, StatsdError> {
            self.calls.lock().unwrap().push(address.to_string());
            UdpStatsdConnector::default().connect("")
        }
    }

    #[derive(Default, Clone)]
    struct CountingAclLoader {
        calls: Arc<Mutex<usize>>,
    }

    impl AclLoader for CountingAclLoader {
        fn load(&self, path: &Path) -> Result<Arc<dyn EgressAcl>, AclError> {
            *self.calls.lock().unwrap() += 1;
            FileAclLoader.load(path)
        }
    }

    #[test]
    fn test_minimal_document() {
        let config = load_config_from_bytes(
            b"ip: 0.0.0.0\nport: 4750\ndeny_ranges: [\"10.0.0.0/8\"]\nconnect_timeout: 10s\n",
        )
        .unwrap();
        assert_eq!(config.ip, "0.0.0.0");
        assert_eq!(config.port, 4750);
        assert!(config.deny_ranges.contains(&"10.1.2.3".parse().unwrap()));
        assert!(config.allow_ranges.is_empty());
        assert_eq!(config.connect_timeout(), Some(std::time::Duration::from_secs(10)));
        assert_eq!(config.exit_timeout(), None);
        assert!(config.tls.is_none());
        assert!(config.egress_acl.is_none());
        assert!(config.maintenance_file.is_none());
        assert!(config.deny_message.is_none());
    }

    #[test]
    fn test_unknown_field_stops_before_collaborators() {
        let connector = CountingConnector::default();
        let loader = ConfigLoader::new().with_statsd_connector(connector.clone());
        let err = loader.load_from_bytes(b"foo: 1\n").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Decode);
        assert!(connector.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_cert_file_is_validation_error() {
        let tls = RecordingTlsLoader::default();
        let loader = ConfigLoader::new().with_tls_loader(tls.clone());
        let err = loader
            .load_from_bytes(b"tls:\n  key_file: key.pem\n")
            .unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Validation);
        assert!(err.to_string().contains("cert_file"));
        assert!(tls.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_key_path_defaults_to_cert_path() {
        let tls = RecordingTlsLoader::default();
        let loader = ConfigLoader::new().with_tls_loader(tls.clone());

        let err = loader
            .load_from_bytes(b"tls:\n  cert_file: x.pem\n  client_ca_files: [ca.pem]\n")
            .unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Tls);
        loader
            .load_from_bytes(b"tls:\n  cert_file: x.pem\n  key_file: x.pem\n  client_ca_files: [ca.pem]\n")
            .unwrap_err();

        let calls = tls.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[0].1, PathBuf::from("x.pem"));
        assert_eq!(calls[0].2, vec![PathBuf::from("ca.pem")]);
    }

    #[test]
    fn test_empty_client_ca_reaches_tls_loader() {
        let tls = RecordingTlsLoader::default();
        let loader = ConfigLoader::new().with_tls_loader(tls.clone());

        let err = loader
            .load_from_bytes(b"tls:\n  cert_file: x.pem\n  client_ca_files: [\"\"]\n")
            .unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Tls);

        let calls = tls.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2, vec![PathBuf::new()]);
    }

    #[test]
    fn test_deny_ranges_fail_first() {
        let err = load_config_from_bytes(
            b"deny_ranges: [\"bogus-deny\"]\nallow_ranges: [\"bogus-allow\"]\n",
        )
        .unwrap_err();
        match err {
            ConfigError::Range { list, source } => {
                assert_eq!(list, RangeList::Deny);
                assert_eq!(source.literal, "bogus-deny");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_allow_error_not_masked_by_valid_deny() {
        let err = load_config_from_bytes(
            b"deny_ranges: [\"10.0.0.0/8\"]\nallow_ranges: [\"10.0.0.0/8\", \"300.1.1.1\"]\n",
        )
        .unwrap_err();
        match err {
            ConfigError::Range { list, source } => {
                assert_eq!(list, RangeList::Allow);
                assert_eq!(source.index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_maintenance_file() {
        let err = load_config_from_bytes(b"maintenance_file: /nonexistent/maintenance\n")
            .unwrap_err();
        match err {
            ConfigError::MaintenanceFile { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_statsd_receives_empty_address() {
        let connector = CountingConnector::default();
        let loader = ConfigLoader::new().with_statsd_connector(connector.clone());
        loader.load_from_bytes(b"port: 1\n").unwrap();
        assert_eq!(*connector.calls.lock().unwrap(), vec![String::new()]);
    }

    #[test]
    fn test_empty_acl_path_skips_loader() {
        let acl = CountingAclLoader::default();
        let loader = ConfigLoader::new().with_acl_loader(acl.clone());
        let config = loader.load_from_bytes(b"acl_file: \"\"\n").unwrap();
        assert!(config.egress_acl.is_none());
        assert_eq!(*acl.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_missing_acl_file() {
        let err = load_config_from_bytes(b"acl_file: /nonexistent/acl.yaml\n").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Acl);
        assert!(err.to_string().contains("/nonexistent/acl.yaml"));
    }

    #[test]
    fn test_bad_statsd_address() {
        let err = load_config_from_bytes(b"statsd_address: no-port-here\n").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Statsd);
    }

    #[test]
    fn test_read_error() {
        let err = load_config("/nonexistent/config.yaml").unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::Io);
    }
}
