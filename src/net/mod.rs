//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → tls.rs (build the shared TLS 1.2 context, client certs required)
//!     → listener.rs (create, bind, listen with backlog)
//!
//! Per client, strictly one at a time
//!     → listener.rs (accept)
//!     → connection.rs (session id, state machine, live-session tracking)
//!     → Hand off to the responder session
//! ```
//!
//! # Design Decisions
//! - No connection concurrency: the next accept happens after teardown
//! - TLS context and listener are created once and outlive every session

pub mod connection;
pub mod listener;
pub mod tls;
