//! Configuration document schema.
//!
//! These types mirror the YAML document exactly. Every struct rejects
//! unknown fields so a misspelled key fails the load instead of silently
//! leaving a control at its default.

use std::time::Duration;

use serde::{de::Error as _, Deserialize, Deserializer};

/// Raw configuration document, as decoded from YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigDocument {
    /// Bind address.
    pub ip: String,

    /// Bind port.
    pub port: u16,

    /// CIDR/IP literals that are always denied.
    pub deny_ranges: Vec<String>,

    /// CIDR/IP literals that are allowed even if otherwise private.
    pub allow_ranges: Vec<String>,

    /// Upstream connect timeout, e.g. "10s".
    #[serde(deserialize_with = "deserialize_duration")]
    pub connect_timeout: Option<Duration>,

    /// Graceful shutdown timeout.
    #[serde(deserialize_with = "deserialize_duration")]
    pub exit_timeout: Option<Duration>,

    /// File whose presence signals maintenance mode.
    pub maintenance_file: String,

    /// Statsd sink, "host:port".
    pub statsd_address: String,

    /// Egress ACL policy path.
    pub acl_file: String,

    /// Accept PROXY protocol headers on inbound connections.
    pub support_proxy_protocol: bool,

    /// Optional TLS listener material.
    pub tls: Option<TlsDocument>,

    /// Extra text appended to denial responses.
    pub deny_message: String,
}

/// The `tls` section of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsDocument {
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    pub client_ca_files: Vec<String>,
}

impl ConfigDocument {
    /// Strictly decode a YAML document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(bytes)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|literal| {
        humantime::parse_duration(literal.trim())
            .map_err(|e| D::Error::custom(format!("invalid duration {literal:?}: {e}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_document() {
        let yaml = r#"
ip: 127.0.0.1
port: 4750
deny_ranges: ["10.0.0.0/8"]
allow_ranges: ["10.1.0.0/16"]
connect_timeout: 10s
exit_timeout: 200ms
maintenance_file: /etc/maintenance
statsd_address: 127.0.0.1:8125
acl_file: /etc/acl.yaml
support_proxy_protocol: true
tls:
  cert_file: cert.pem
  key_file: key.pem
  client_ca_files: [ca1.pem, ca2.pem]
deny_message: "contact #egress"
"#;
        let doc = ConfigDocument::from_slice(yaml.as_bytes()).unwrap();
        assert_eq!(doc.ip, "127.0.0.1");
        assert_eq!(doc.port, 4750);
        assert_eq!(doc.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(doc.exit_timeout, Some(Duration::from_millis(200)));
        assert!(doc.support_proxy_protocol);
        let tls = doc.tls.unwrap();
        assert_eq!(tls.cert_file.as_deref(), Some("cert.pem"));
        assert_eq!(tls.client_ca_files.len(), 2);
        assert_eq!(doc.deny_message, "contact #egress");
    }

    #[test]
    fn test_absent_fields_default() {
        let doc = ConfigDocument::from_slice(b"port: 80\n").unwrap();
        assert_eq!(doc.port, 80);
        assert!(doc.deny_ranges.is_empty());
        assert_eq!(doc.connect_timeout, None);
        assert!(doc.tls.is_none());
    }

    #[test]
    fn test_unknown_top_level_field() {
        let err = ConfigDocument::from_slice(b"foo: 1\n").unwrap_err();
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn test_unknown_nested_field() {
        let err = ConfigDocument::from_slice(b"tls:\n  cert_file: a.pem\n  keyfile: b.pem\n")
            .unwrap_err();
        assert!(err.to_string().contains("keyfile"));
    }

    #[test]
    fn test_malformed_duration() {
        let err = ConfigDocument::from_slice(b"connect_timeout: soon\n").unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn test_port_out_of_range() {
        assert!(ConfigDocument::from_slice(b"port: 70000\n").is_err());
    }
}
