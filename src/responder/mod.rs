//! The TLS ping responder.
//!
//! # Data Flow
//! ```text
//! bind():   TLS context → CA → key → server cert (matched to key) → verify mode
//!           → fragment size → socket/bind/listen
//! run():    loop {
//!               allocate session        (fatal on failure)
//!               accept                  (retry on failure)
//!               handshake               (drop client on failure)
//!               send ping request → read until close
//!               close_notify, close, release session
//!           }
//! ```
//!
//! # Design Decisions
//! - One client at a time; the next accept waits for teardown
//! - Setup failures return early, and drop order releases the resources
//!   acquired so far, newest first
//! - Outcomes are logged and also broadcast as [`SessionEvent`]s

pub mod payload;
pub mod session;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_rustls::TlsAcceptor;

use crate::config::ResponderConfig;
use crate::error::ResponderError;
use crate::identity::ServerIdentity;
use crate::net::connection::{SessionId, SessionState, SessionTracker};
use crate::net::listener::Listener;
use crate::net::tls;
use crate::resilience::backoff::AcceptBackoff;
use crate::resilience::timeouts::with_timeout;

pub use payload::PING_REQUEST;
pub use session::{Session, SessionSummary};

pub(crate) const EVENT_CAPACITY: usize = 64;

/// Observable outcome of one serving iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A TCP connection was accepted and bound to a session.
    Accepted {
        session_id: SessionId,
        peer_addr: SocketAddr,
    },
    /// The handshake failed; nothing was sent to the client.
    HandshakeFailed {
        session_id: SessionId,
        peer_addr: SocketAddr,
        reason: String,
    },
    /// An established session was torn down.
    Closed {
        session_id: SessionId,
        peer_addr: SocketAddr,
        summary: SessionSummary,
    },
}

/// A bound responder, ready to serve.
pub struct Responder {
    // Declaration order is drop order: the listener goes before the TLS
    // context it was created after.
    listener: Listener,
    acceptor: TlsAcceptor,
    recv_buffer_len: usize,
    handshake_timeout: Option<Duration>,
    backoff: AcceptBackoff,
    tracker: SessionTracker,
    events: broadcast::Sender<SessionEvent>,
}

impl Responder {
    /// Run the setup phase: build the TLS context, then the listening socket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &ResponderConfig, identity: &ServerIdentity) -> Result<Self, ResponderError> {
        let server_config = tls::build_server_config(identity, config.tls.fragment_size)?;
        let acceptor = tls::acceptor(server_config);
        let listener = Listener::bind(&config.listener)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            listener,
            acceptor,
            recv_buffer_len: config.session.recv_buffer_len,
            handshake_timeout: config.tls.handshake_timeout_ms.map(Duration::from_millis),
            backoff: AcceptBackoff::new(config.accept_backoff.clone()),
            tracker: SessionTracker::new(),
            events,
        })
    }

    /// Publish session events on `events` instead of a private channel.
    pub fn with_event_sender(mut self, events: broadcast::Sender<SessionEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Receive events for every iteration from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Handle onto the live-session counters.
    pub fn tracker(&self) -> SessionTracker {
        self.tracker.clone()
    }

    /// Serve clients until `shutdown` fires.
    ///
    /// Returns an error only when a session cannot be allocated; the
    /// listener and TLS context are released when `self` drops.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ResponderError> {
        tracing::info!(
            address = ?self.local_addr().ok(),
            backlog = self.listener.backlog(),
            "Responder serving"
        );

        loop {
            let mut session = match Session::allocate(self.recv_buffer_len, &self.tracker) {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!(error = %e, "Session allocation failed, stopping responder");
                    return Err(e);
                }
            };

            let accepted = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested, responder stopping");
                    return Ok(());
                }
                res = self.listener.accept() => res,
            };

            let (stream, peer_addr) = match accepted {
                Ok(accepted) => {
                    self.backoff.reset();
                    accepted
                }
                Err(e) => {
                    if let Some(delay) = self.on_accept_error(session, e) {
                        tokio::select! {
                            _ = shutdown.recv() => return Ok(()),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    continue;
                }
            };

            session.bind_peer(peer_addr);
            let _ = self.events.send(SessionEvent::Accepted {
                session_id: session.id(),
                peer_addr,
            });

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!(peer_addr = %peer_addr, "Shutdown requested, abandoning session");
                    return Ok(());
                }
                _ = self.serve(&mut session, stream, peer_addr) => {}
            }
            session.finish();
        }
    }

    /// Release the session reserved for a failed accept and return how long
    /// to wait before the next attempt.
    fn on_accept_error(&mut self, session: Session, e: std::io::Error) -> Option<Duration> {
        let delay = self.backoff.record_failure();
        tracing::warn!(
            session_id = %session.id(),
            error = %e,
            consecutive_failures = self.backoff.consecutive_failures(),
            retry_in_ms = delay.map(|d| d.as_millis() as u64),
            "Accept failed"
        );
        drop(session);
        delay
    }

    /// Handshake, exchange and teardown for one accepted client.
    async fn serve(&self, session: &mut Session, stream: TcpStream, peer_addr: SocketAddr) {
        let session_id = session.id();

        session.advance(SessionState::HandshakeAttempted);
        let handshake = with_timeout(self.handshake_timeout, self.acceptor.accept(stream)).await;
        let mut tls_stream = match handshake {
            Ok(tls_stream) => tls_stream,
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    peer_addr = %peer_addr,
                    error = %e,
                    "TLS handshake failed"
                );
                session.advance(SessionState::HandshakeFailed);
                let _ = self.events.send(SessionEvent::HandshakeFailed {
                    session_id,
                    peer_addr,
                    reason: e.to_string(),
                });
                return;
            }
        };

        session.advance(SessionState::Established);
        let (_, connection) = tls_stream.get_ref();
        tracing::info!(
            session_id = %session_id,
            peer_addr = %peer_addr,
            client_certs = connection.peer_certificates().map_or(0, |certs| certs.len()),
            "TLS handshake complete"
        );

        let summary = session.exchange(&mut tls_stream).await;

        if let Err(e) = tls_stream.shutdown().await {
            tracing::debug!(session_id = %session_id, error = %e, "TLS shutdown incomplete");
        }
        drop(tls_stream);
        session.advance(SessionState::Closed);

        tracing::info!(
            session_id = %session_id,
            peer_addr = %peer_addr,
            bytes_received = summary.bytes_received,
            "Session closed"
        );
        let _ = self.events.send(SessionEvent::Closed {
            session_id,
            peer_addr,
            summary,
        });
    }
}
