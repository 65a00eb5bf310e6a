//! Fatal responder errors.
//!
//! Each variant names the setup stage that failed. Per-connection failures
//! (accept, handshake, send, receive) never surface here; the serving loop
//! logs them and moves on to the next client.

use std::collections::TryReserveError;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::identity::IdentityError;

#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("failed to load identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("failed to create TLS context: {0}")]
    Context(#[source] rustls::Error),

    #[error("failed to load CA certificate: {0}")]
    CaCertificate(String),

    #[error("failed to load server certificate: {0}")]
    ServerCertificate(String),

    #[error("failed to load server private key: {0}")]
    PrivateKey(String),

    #[error("invalid bind address '{0}'")]
    Address(String),

    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen: {0}")]
    Listen(#[source] io::Error),

    #[error("failed to allocate a {len}-byte session buffer")]
    SessionAlloc {
        len: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("responder task ended abnormally: {0}")]
    Aborted(String),
}
