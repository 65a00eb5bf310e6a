//! Timeout enforcement.
//!
//! # Responsibilities
//! - Optionally bound how long a blocking step may take
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - `None` means wait forever, which is the responder's default
//! - An elapsed deadline surfaces as `io::ErrorKind::TimedOut`, so callers
//!   treat it exactly like any other failure of the step

use std::future::Future;
use std::io;
use std::time::Duration;

/// Run `fut`, failing with `TimedOut` if `limit` elapses first.
pub async fn with_timeout<F, T>(limit: Option<Duration>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        None => fut.await,
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("timed out after {} ms", limit.as_millis()),
            )),
        },
    }
}
