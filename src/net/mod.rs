//! Network policy primitives.
//!
//! # Contents
//! - ranges.rs: deny/allow address-range sets
//! - tls.rs: server TLS context loading
//!
//! # Design Decisions
//! - TLS is optional and all-or-nothing per configuration
//! - Range sets are immutable after parsing and cheap to clone

pub mod ranges;
pub mod tls;
