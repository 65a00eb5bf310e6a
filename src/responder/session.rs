//! One client session: greeting out, text in, until the peer stops.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::error::ResponderError;
use crate::net::connection::{SessionGuard, SessionId, SessionState, SessionTracker};
use crate::responder::payload;

/// What happened on an established session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// The ping request reached the transport.
    pub greeting_sent: bool,
    /// Bytes read from the client across the whole session.
    pub bytes_received: u64,
    /// Number of successful reads.
    pub reads: u32,
    /// Largest single read.
    pub largest_read: usize,
}

impl SessionSummary {
    fn record_read(&mut self, n: usize) {
        self.bytes_received += n as u64;
        self.reads += 1;
        self.largest_read = self.largest_read.max(n);
    }
}

/// Per-iteration session resources.
///
/// Owns the receive buffer and a live-session guard. Dropping the session
/// releases both.
#[derive(Debug)]
pub struct Session {
    guard: SessionGuard,
    state: SessionState,
    recv_buf: Vec<u8>,
}

impl Session {
    /// Allocate a session with a `recv_buffer_len`-byte receive buffer.
    ///
    /// Allocation failure is reported rather than aborting the process.
    pub fn allocate(recv_buffer_len: usize, tracker: &SessionTracker) -> Result<Self, ResponderError> {
        let mut recv_buf = Vec::new();
        recv_buf
            .try_reserve_exact(recv_buffer_len)
            .map_err(|source| ResponderError::SessionAlloc {
                len: recv_buffer_len,
                source,
            })?;
        recv_buf.resize(recv_buffer_len, 0);

        let mut session = Self {
            guard: tracker.track(),
            state: SessionState::Idle,
            recv_buf,
        };
        session.advance(SessionState::SessionCreated);
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.guard.id()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal session transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::trace!(session_id = %self.id(), from = ?self.state, to = ?next, "Session state");
        self.state = next;
    }

    /// Attach the accepted peer.
    pub fn bind_peer(&mut self, peer_addr: SocketAddr) {
        tracing::debug!(session_id = %self.id(), peer_addr = %peer_addr, "Session bound");
        self.advance(SessionState::Accepted);
    }

    /// Send the ping request, then read until the peer closes or errors.
    ///
    /// Reads fill at most `capacity - 1` bytes. A failed send skips the read
    /// loop entirely; either way the caller proceeds to teardown.
    pub async fn exchange<S>(&mut self, stream: &mut S) -> SessionSummary
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let id = self.id();
        let mut summary = SessionSummary::default();

        self.advance(SessionState::Sending);
        match payload::send_ping_request(stream).await {
            Ok(bytes) => {
                tracing::info!(session_id = %id, bytes, "Ping request sent");
                summary.greeting_sent = true;
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Failed to send ping request");
                return summary;
            }
        }

        self.advance(SessionState::Reading);
        let read_cap = self.recv_buf.len().saturating_sub(1);
        loop {
            let n = match stream.read(&mut self.recv_buf[..read_cap]).await {
                Ok(0) => {
                    tracing::debug!(session_id = %id, "Peer closed");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(session_id = %id, error = %e, "Read ended");
                    break;
                }
            };

            summary.record_read(n);
            let text = String::from_utf8_lossy(&self.recv_buf[..n]);
            tracing::info!(session_id = %id, bytes = n, data = %text, "Received");
        }

        tracing::info!(
            session_id = %id,
            bytes_received = summary.bytes_received,
            reads = summary.reads,
            "Session read loop finished"
        );
        summary
    }

    /// Return the iteration to idle and release the session.
    pub fn finish(mut self) {
        self.advance(SessionState::Idle);
    }
}
