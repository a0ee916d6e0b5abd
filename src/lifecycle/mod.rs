//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown
//!     SIGHUP → Reload (config::ConfigStore::reload)
//! ```

#[cfg(unix)]
pub mod signals;
