//! Validated runtime configuration.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rustls::ServerConfig;
use serde::Serialize;

use crate::net::ranges::RangeSet;
use crate::observability::statsd::StatsdHandle;
use crate::security::acl::EgressAcl;

/// Fully validated configuration consulted on every connection.
///
/// Only [`ConfigLoader`](crate::config::ConfigLoader) builds these, and only
/// once every step has succeeded.
#[derive(Debug, Clone)]
pub struct Config {
    pub ip: String,
    pub port: u16,
    pub deny_ranges: RangeSet,
    pub allow_ranges: RangeSet,
    /// Zero means no timeout was configured.
    pub connect_timeout: Duration,
    /// Zero means no timeout was configured.
    pub exit_timeout: Duration,
    /// Set only when the file existed at load time.
    pub maintenance_file: Option<PathBuf>,
    pub support_proxy_protocol: bool,
    pub statsd: StatsdHandle,
    /// `None` disables ACL enforcement.
    pub egress_acl: Option<Arc<dyn EgressAcl>>,
    /// `None` serves plaintext.
    pub tls: Option<Arc<ServerConfig>>,
    pub deny_message: Option<String>,
}

impl Config {
    /// Duration-aware accessor: `None` when the timeout is disabled.
    pub fn connect_timeout(&self) -> Option<Duration> {
        (!self.connect_timeout.is_zero()).then_some(self.connect_timeout)
    }

    pub fn exit_timeout(&self) -> Option<Duration> {
        (!self.exit_timeout.is_zero()).then_some(self.exit_timeout)
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            ip: self.ip.clone(),
            port: self.port,
            deny_ranges: range_literals(&self.deny_ranges),
            allow_ranges: range_literals(&self.allow_ranges),
            connect_timeout: format_timeout(self.connect_timeout),
            exit_timeout: format_timeout(self.exit_timeout),
            maintenance_file: self
                .maintenance_file
                .as_ref()
                .map(|p| p.display().to_string()),
            support_proxy_protocol: self.support_proxy_protocol,
            acl_enabled: self.egress_acl.is_some(),
            tls_enabled: self.tls.is_some(),
            deny_message: self.deny_message.clone(),
        }
    }
}

fn range_literals(set: &RangeSet) -> Vec<String> {
    set.iter()
        .map(|range| format!("{}/{}", range.first_address(), range.network_length()))
        .collect()
}

fn format_timeout(timeout: Duration) -> Option<String> {
    (!timeout.is_zero()).then(|| humantime::format_duration(timeout).to_string())
}

/// Printable view of a [`Config`], without the opaque handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub ip: String,
    pub port: u16,
    pub deny_ranges: Vec<String>,
    pub allow_ranges: Vec<String>,
    pub connect_timeout: Option<String>,
    pub exit_timeout: Option<String>,
    pub maintenance_file: Option<String>,
    pub support_proxy_protocol: bool,
    pub acl_enabled: bool,
    pub tls_enabled: bool,
    pub deny_message: Option<String>,
}

impl fmt::Display for ConfigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let disabled = "disabled".to_string();
        writeln!(f, "bind:                   {}:{}", self.ip, self.port)?;
        writeln!(f, "deny ranges:            {}", self.deny_ranges.join(", "))?;
        writeln!(f, "allow ranges:           {}", self.allow_ranges.join(", "))?;
        writeln!(
            f,
            "connect timeout:        {}",
            self.connect_timeout.as_ref().unwrap_or(&disabled)
        )?;
        writeln!(
            f,
            "exit timeout:           {}",
            self.exit_timeout.as_ref().unwrap_or(&disabled)
        )?;
        writeln!(
            f,
            "maintenance file:       {}",
            self.maintenance_file.as_ref().unwrap_or(&disabled)
        )?;
        writeln!(f, "proxy protocol:         {}", self.support_proxy_protocol)?;
        writeln!(f, "egress acl:             {}", self.acl_enabled)?;
        writeln!(f, "tls:                    {}", self.tls_enabled)?;
        write!(
            f,
            "deny message:           {}",
            self.deny_message.as_deref().unwrap_or("")
        )
    }
}
