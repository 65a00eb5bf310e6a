//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Network owner reports an address → responder task loads identity
//!     → builds TLS context → binds listener → serves
//!
//! Shutdown (shutdown.rs):
//!     Trigger → responder stops accepting, abandons any session → exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then identity, then TLS, then listener
//! - A setup failure terminates the task permanently; there is no restart

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
