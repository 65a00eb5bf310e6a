//! Session state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Define the per-iteration session state machine
//! - Count live sessions and remember the peak concurrency

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global atomic counter for session IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub(crate) fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Where one serving iteration currently stands.
///
/// ```text
/// Idle → SessionCreated → Accepted → HandshakeAttempted
///     → HandshakeFailed → Idle
///     → Established → Sending → Reading → Closed → Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    SessionCreated,
    Accepted,
    HandshakeAttempted,
    HandshakeFailed,
    Established,
    Sending,
    Reading,
    Closed,
}

impl SessionState {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// `Sending → Closed` covers a failed greeting write, which skips the
    /// read loop and goes straight to teardown.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, SessionCreated)
                | (SessionCreated, Accepted)
                | (SessionCreated, Idle)
                | (Accepted, HandshakeAttempted)
                | (HandshakeAttempted, HandshakeFailed)
                | (HandshakeAttempted, Established)
                | (HandshakeFailed, Idle)
                | (Established, Sending)
                | (Sending, Reading)
                | (Sending, Closed)
                | (Reading, Closed)
                | (Closed, Idle)
        )
    }
}

/// Tracks live sessions.
///
/// The responder serves one client at a time, so `peak_active` staying at
/// one is the observable proof of that.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    inner: Arc<TrackerCounts>,
}

#[derive(Debug, Default)]
struct TrackerCounts {
    active: AtomicU64,
    peak: AtomicU64,
    total: AtomicU64,
}

impl SessionTracker {
    /// Create a new session tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new live session. Returns a guard that decrements on drop.
    pub fn track(&self) -> SessionGuard {
        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(active, Ordering::SeqCst);
        self.inner.total.fetch_add(1, Ordering::SeqCst);
        SessionGuard {
            inner: Arc::clone(&self.inner),
            id: SessionId::new(),
        }
    }

    /// Get current live session count.
    pub fn active_count(&self) -> u64 {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Highest number of sessions ever live at once.
    pub fn peak_active(&self) -> u64 {
        self.inner.peak.load(Ordering::SeqCst)
    }

    /// Sessions created since startup.
    pub fn total(&self) -> u64 {
        self.inner.total.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a session's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    inner: Arc<TrackerCounts>,
    id: SessionId,
}

impl SessionGuard {
    /// Get this session's ID.
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(session_id = %self.id, "Session released");
    }
}
