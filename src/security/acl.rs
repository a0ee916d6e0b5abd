//! Egress ACL policy loading and evaluation.
//!
//! # Policy Format
//! ```yaml
//! version: v1
//! default: deny
//! rules:
//!   - name: payments
//!     action: allow
//!     hosts: ["api.stripe.com", "*.braintreegateway.com"]
//!     ports: [443]
//!   - name: audit-only
//!     action: report
//!     hosts: ["*"]
//! ```
//!
//! # Design Decisions
//! - Rules are evaluated in document order; first match wins
//! - Unmatched destinations fall through to `default` (deny when omitted)
//! - Unknown fields are rejected, same as the main config document
//! - Host matching is case-insensitive; `*.suffix` matches subdomains only

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SUPPORTED_VERSION: &str = "v1";

/// Errors raised while loading an ACL policy file.
#[derive(Debug, Error)]
pub enum AclError {
    #[error("failed to read ACL file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ACL file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported ACL version {version:?} in {path:?} (expected \"v1\")")]
    UnsupportedVersion { path: PathBuf, version: String },

    #[error("invalid rule {rule:?} in {path:?}: {reason}")]
    InvalidRule {
        path: PathBuf,
        rule: String,
        reason: String,
    },
}

/// What the proxy should do with a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AclAction {
    Allow,
    Deny,
    /// Allow, but log the connection as if it had been denied.
    Report,
}

impl Default for AclAction {
    fn default() -> Self {
        Self::Deny
    }
}

/// Result of evaluating a destination against a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclDecision {
    pub action: AclAction,
    /// Name of the matching rule, `None` when the default applied.
    pub rule: Option<String>,
}

impl AclDecision {
    /// Whether the connection may proceed.
    pub fn permits(&self) -> bool {
        !matches!(self.action, AclAction::Deny)
    }
}

/// A loaded egress policy, queried per destination.
pub trait EgressAcl: Send + Sync + Debug {
    fn decide(&self, host: &str, port: u16) -> AclDecision;
}

/// Loads an egress policy from a file path.
pub trait AclLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn EgressAcl>, AclError>;
}

/// Reads YAML policy files from disk.
#[derive(Debug, Clone, Default)]
pub struct FileAclLoader;

impl AclLoader for FileAclLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn EgressAcl>, AclError> {
        let bytes = std::fs::read(path).map_err(|source| AclError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let policy = AclPolicy::from_yaml(&bytes, path)?;
        tracing::debug!(path = ?path, rules = policy.rules.len(), "Egress ACL loaded");
        Ok(Arc::new(policy))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyDocument {
    version: String,
    #[serde(default)]
    default: AclAction,
    #[serde(default)]
    rules: Vec<RuleDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDocument {
    name: String,
    action: AclAction,
    hosts: Vec<String>,
    #[serde(default)]
    ports: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Any,
    Exact(String),
    /// Stored with the leading dot, e.g. `.example.com`.
    Suffix(String),
}

impl HostPattern {
    fn parse(raw: &str) -> Result<Self, String> {
        let pattern = normalize_host(raw);
        if pattern.is_empty() {
            return Err("empty host pattern".to_string());
        }
        if pattern == "*" {
            return Ok(Self::Any);
        }
        if let Some(suffix) = pattern.strip_prefix("*.") {
            if suffix.is_empty() || suffix.contains('*') {
                return Err(format!("invalid wildcard pattern {raw:?}"));
            }
            return Ok(Self::Suffix(format!(".{suffix}")));
        }
        if pattern.contains('*') {
            return Err(format!("wildcards are only allowed as a leading \"*.\" in {raw:?}"));
        }
        Ok(Self::Exact(pattern))
    }

    fn matches(&self, host: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => host == expected,
            Self::Suffix(suffix) => host.len() > suffix.len() && host.ends_with(suffix.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
struct Rule {
    name: String,
    action: AclAction,
    hosts: Vec<HostPattern>,
    /// Empty means any port.
    ports: Vec<u16>,
}

impl Rule {
    fn matches(&self, host: &str, port: u16) -> bool {
        (self.ports.is_empty() || self.ports.contains(&port))
            && self.hosts.iter().any(|pattern| pattern.matches(host))
    }
}

/// An ordered, first-match egress policy.
#[derive(Debug, Clone)]
pub struct AclPolicy {
    default: AclAction,
    rules: Vec<Rule>,
}

impl AclPolicy {
    /// Parse a policy document. `path` is only used for error context.
    pub fn from_yaml(bytes: &[u8], path: &Path) -> Result<Self, AclError> {
        let doc: PolicyDocument = serde_yaml::from_slice(bytes).map_err(|source| AclError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if doc.version != SUPPORTED_VERSION {
            return Err(AclError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: doc.version,
            });
        }

        let rules = doc
            .rules
            .into_iter()
            .map(|rule| {
                let invalid = |reason: String| AclError::InvalidRule {
                    path: path.to_path_buf(),
                    rule: rule.name.clone(),
                    reason,
                };
                if rule.name.trim().is_empty() {
                    return Err(invalid("rule name must not be empty".to_string()));
                }
                if rule.hosts.is_empty() {
                    return Err(invalid("rule must list at least one host".to_string()));
                }
                let hosts = rule
                    .hosts
                    .iter()
                    .map(|h| HostPattern::parse(h))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(invalid)?;
                Ok(Rule {
                    name: rule.name,
                    action: rule.action,
                    hosts,
                    ports: rule.ports,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            default: doc.default,
            rules,
        })
    }

    pub fn default_action(&self) -> AclAction {
        self.default
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl EgressAcl for AclPolicy {
    fn decide(&self, host: &str, port: u16) -> AclDecision {
        let host = normalize_host(host);
        self.rules
            .iter()
            .find(|rule| rule.matches(&host, port))
            .map(|rule| AclDecision {
                action: rule.action,
                rule: Some(rule.name.clone()),
            })
            .unwrap_or(AclDecision {
                action: self.default,
                rule: None,
            })
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}
