//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (backlog > 0, fragment size, buffer size)
//! - Check the bind address and log level parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResponderConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ResponderConfig;

/// Smallest fragment size accepted for the record layer.
pub const MIN_FRAGMENT_SIZE: usize = 2048;

/// Largest fragment size accepted for the record layer.
pub const MAX_FRAGMENT_SIZE: usize = 8192;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener.backlog must be greater than zero")]
    Backlog,

    #[error("tls.fragment_size {0} is outside 2048..=8192")]
    FragmentSize(usize),

    #[error("tls.handshake_timeout_ms must be greater than zero when set")]
    HandshakeTimeout,

    #[error("session.recv_buffer_len must be at least 2, got {0}")]
    RecvBufferLen(usize),

    #[error("accept_backoff.base_delay_ms {base} exceeds max_delay_ms {max}")]
    BackoffRange { base: u64, max: u64 },

    #[error("observability.log_level '{0}' is not a known level")]
    LogLevel(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ResponderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.backlog == 0 {
        errors.push(ValidationError::Backlog);
    }

    let fragment_size = config.tls.fragment_size;
    if !(MIN_FRAGMENT_SIZE..=MAX_FRAGMENT_SIZE).contains(&fragment_size) {
        errors.push(ValidationError::FragmentSize(fragment_size));
    }
    if config.tls.handshake_timeout_ms == Some(0) {
        errors.push(ValidationError::HandshakeTimeout);
    }

    // One byte of the buffer is never filled by a read.
    if config.session.recv_buffer_len < 2 {
        errors.push(ValidationError::RecvBufferLen(
            config.session.recv_buffer_len,
        ));
    }

    let backoff = &config.accept_backoff;
    if backoff.enabled && backoff.base_delay_ms > backoff.max_delay_ms {
        errors.push(ValidationError::BackoffRange {
            base: backoff.base_delay_ms,
            max: backoff.max_delay_ms,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
