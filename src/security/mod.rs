//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound connection request:
//!     → acl.rs (destination host/port against the egress policy)
//!     → allow, deny, or report-only
//! ```
//!
//! # Design Decisions
//! - Fail closed: unmatched destinations take the policy default (deny)
//! - No ACL file configured means no ACL enforcement

pub mod acl;
