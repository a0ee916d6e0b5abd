//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → statsd.rs (counters, gauges, timers over UDP)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The statsd client always exists; an empty address means a no-op sink

pub mod logging;
pub mod statsd;
