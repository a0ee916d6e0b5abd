//! Statsd client construction.
//!
//! # Responsibilities
//! - Turn a `host:port` string into a metrics-emitting client
//! - Hand out a no-op client when no address is configured
//!
//! # Design Decisions
//! - The client is never absent; callers emit unconditionally
//! - UDP sockets are non-blocking so a slow sink never stalls a connection

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

use cadence::{MetricError, NopMetricSink, StatsdClient, UdpMetricSink};
use thiserror::Error;

/// Prefix prepended to every metric name.
pub const METRIC_PREFIX: &str = "egress_proxy";

/// Shared handle to the statsd client.
pub type StatsdHandle = Arc<StatsdClient>;

#[derive(Debug, Error)]
pub enum StatsdError {
    #[error("failed to resolve statsd address {address:?}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("statsd address {address:?} resolved to no usable socket address")]
    NoAddress { address: String },

    #[error("failed to bind local UDP socket for statsd: {0}")]
    Bind(#[source] std::io::Error),

    #[error("failed to create statsd sink for {address:?}: {source}")]
    Sink {
        address: String,
        #[source]
        source: MetricError,
    },
}

/// Builds the statsd client from the configured address.
pub trait StatsdConnector: Send + Sync {
    fn connect(&self, address: &str) -> Result<StatsdHandle, StatsdError>;
}

/// Emits over UDP, or nowhere when the address is empty.
#[derive(Debug, Clone)]
pub struct UdpStatsdConnector {
    prefix: String,
}

impl UdpStatsdConnector {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for UdpStatsdConnector {
    fn default() -> Self {
        Self::new(METRIC_PREFIX)
    }
}

impl StatsdConnector for UdpStatsdConnector {
    fn connect(&self, address: &str) -> Result<StatsdHandle, StatsdError> {
        if address.is_empty() {
            tracing::debug!("No statsd address configured, metrics are discarded");
            return Ok(Arc::new(StatsdClient::from_sink(&self.prefix, NopMetricSink)));
        }

        let target = address
            .to_socket_addrs()
            .map_err(|source| StatsdError::Resolve {
                address: address.to_string(),
                source,
            })?
            .next()
            .ok_or_else(|| StatsdError::NoAddress {
                address: address.to_string(),
            })?;

        let local: SocketAddr = match target {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = UdpSocket::bind(local).map_err(StatsdError::Bind)?;
        socket.set_nonblocking(true).map_err(StatsdError::Bind)?;

        let sink = UdpMetricSink::from(target, socket).map_err(|source| StatsdError::Sink {
            address: address.to_string(),
            source,
        })?;

        tracing::debug!(address = %address, resolved = %target, "Statsd client created");
        Ok(Arc::new(StatsdClient::from_sink(&self.prefix, sink)))
    }
}
