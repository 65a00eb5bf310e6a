//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Setup stages and the serving loop produce:
//!     → logging.rs (structured log events)
//!     → net::connection::SessionTracker (live/peak/total sessions)
//!     → responder::SessionEvent broadcast (per-iteration outcomes)
//! ```

pub mod logging;
