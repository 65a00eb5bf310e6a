//! TLS ping responder library.
//!
//! A single background task that accepts one mutually-authenticated TLS 1.2
//! client at a time, sends it a fixed JSON ping request and logs whatever the
//! client sends back until it disconnects.
//!
//! ```text
//!  network ready ──▶ lifecycle::startup ──▶ responder::Responder::bind
//!                                              │  net::tls (context)
//!                                              │  net::listener (socket)
//!                                              ▼
//!                    ┌──────────── responder::Responder::run ◀──────────┐
//!                    │  allocate session → accept → handshake           │
//!                    │  → send ping request → read until close          │
//!                    └─ close_notify, close, release ───────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod identity;
pub mod net;
pub mod responder;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ResponderConfig;
pub use error::ResponderError;
pub use identity::ServerIdentity;
pub use lifecycle::Shutdown;
pub use responder::{Responder, SessionEvent, SessionSummary, PING_REQUEST};
