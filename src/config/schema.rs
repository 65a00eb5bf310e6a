//! Configuration schema definitions.
//!
//! Every section defaults to the responder's fixed deployment values, so an
//! empty file (or no file at all) yields a server on `0.0.0.0:443` with the
//! embedded identity.

use serde::{Deserialize, Serialize};

/// Root configuration for the ping responder.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResponderConfig {
    /// Listener configuration (bind address, backlog).
    pub listener: ListenerConfig,

    /// TLS context settings.
    pub tls: TlsConfig,

    /// Per-session settings.
    pub session: SessionConfig,

    /// Delay policy for failed accepts.
    pub accept_backoff: AcceptBackoffConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:443").
    pub bind_address: String,

    /// Maximum number of pending, not yet accepted, connections.
    pub backlog: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:443".to_string(),
            backlog: 32,
        }
    }
}

/// TLS context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Maximum TLS record fragment size in bytes.
    ///
    /// Scale this with the server key:
    ///
    /// | Private key | Fragment size |
    /// |-------------|---------------|
    /// | RSA2048     | 2048          |
    /// | RSA3072     | 3072          |
    /// | RSA4096     | 4096          |
    pub fragment_size: usize,

    /// Load the identity from disk instead of the embedded material.
    pub identity: Option<IdentityFiles>,

    /// Abandon handshakes that take longer than this. No limit when unset.
    pub handshake_timeout_ms: Option<u64>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            fragment_size: 2048,
            identity: None,
            handshake_timeout_ms: None,
        }
    }
}

/// Paths to certificate material (PEM or DER).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityFiles {
    /// CA certificate used to verify client certificates.
    pub ca_cert_path: String,

    /// Server certificate.
    pub cert_path: String,

    /// Server private key.
    pub key_path: String,
}

/// Per-session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Receive buffer capacity. Each read fills at most `recv_buffer_len - 1` bytes.
    pub recv_buffer_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recv_buffer_len: 1024,
        }
    }
}

/// Accept failure backoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AcceptBackoffConfig {
    /// Sleep between consecutive failed accepts. Off means retry immediately.
    pub enabled: bool,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for AcceptBackoffConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
