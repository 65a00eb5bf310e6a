//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ResponderConfig (validated, immutable)
//!     → moved into the responder task at launch
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the responder never re-reads it
//! - All fields have defaults matching the fixed deployment (port 443, backlog 32)
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AcceptBackoffConfig;
pub use schema::IdentityFiles;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ResponderConfig;
pub use schema::SessionConfig;
pub use schema::TlsConfig;
