//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML)
//!     → loader.rs (read bytes)
//!     → schema.rs (strict decode, unknown fields rejected)
//!     → validation.rs (semantic checks on the TLS section)
//!     → loader.rs (ordered assembly: ranges, maintenance, statsd, ACL, TLS)
//!     → Config (validated, immutable)
//!
//! On reload signal:
//!     → loader.rs loads new config
//!     → store.rs swaps Arc<Config> only if the load succeeded
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - First failing step aborts the load; errors are never aggregated
//! - Absent fields mean "feature disabled", never a silent default policy

pub mod loader;
pub mod runtime;
pub mod schema;
pub mod store;
pub mod validation;

pub use loader::{load_config, load_config_from_bytes, ConfigError, ConfigErrorKind, ConfigLoader};
pub use runtime::{Config, ConfigSummary};
pub use schema::{ConfigDocument, TlsDocument};
pub use store::ConfigStore;
