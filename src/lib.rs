//! Egress proxy configuration library.
//!
//! Turns a YAML configuration document into a validated [`Config`]: address
//! range sets, timeouts, maintenance file, statsd client, egress ACL and TLS
//! context.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::{load_config, load_config_from_bytes, Config, ConfigError, ConfigLoader};
