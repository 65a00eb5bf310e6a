//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::AcceptBackoffConfig;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Delay policy for consecutive accept failures.
///
/// Disabled by default: a failed accept is retried immediately and without
/// limit. When enabled, each consecutive failure doubles the sleep up to the
/// configured cap; one successful accept resets the sequence.
#[derive(Debug, Clone)]
pub struct AcceptBackoff {
    config: AcceptBackoffConfig,
    consecutive_failures: u32,
}

impl AcceptBackoff {
    pub fn new(config: AcceptBackoffConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
        }
    }

    /// Record a failed accept and return how long to wait before retrying.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if !self.config.enabled {
            return None;
        }
        Some(calculate_backoff(
            self.consecutive_failures,
            self.config.base_delay_ms,
            self.config.max_delay_ms,
        ))
    }

    /// Record a successful accept.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
