//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Serving loop:
//!     accept fails → backoff.rs (optional delay before the next accept)
//!     handshake    → timeouts.rs (optional deadline)
//! ```
//!
//! # Design Decisions
//! - Both policies are off by default: failed accepts retry immediately and
//!   no step has a deadline
//! - Neither policy ever ends the serving loop

pub mod backoff;
pub mod timeouts;
