//! TCP listener with an explicit backlog.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Put the socket into listening state with the configured backlog
//! - Accept incoming TCP connections one at a time

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::config::ListenerConfig;
use crate::error::ResponderError;

/// The listening socket shared by every serving iteration.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Configured pending-connection queue length.
    backlog: u32,
}

impl Listener {
    /// Create, bind and listen, in that order.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(config: &ListenerConfig) -> Result<Self, ResponderError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|_| ResponderError::Address(config.bind_address.clone()))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(ResponderError::Socket)?;
        tracing::debug!("Socket created");

        socket.set_reuseaddr(true).map_err(ResponderError::Socket)?;
        socket
            .bind(addr)
            .map_err(|source| ResponderError::Bind { addr, source })?;
        tracing::debug!(address = %addr, "Socket bound");

        let inner = socket
            .listen(config.backlog)
            .map_err(ResponderError::Listen)?;

        let local_addr = inner.local_addr().map_err(ResponderError::Listen)?;
        tracing::info!(
            address = %local_addr,
            backlog = config.backlog,
            "Listener bound"
        );

        Ok(Self {
            inner,
            backlog: config.backlog,
        })
    }

    /// Wait for the next incoming connection.
    pub async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        let (stream, addr) = self.inner.accept().await?;
        tracing::debug!(peer_addr = %addr, "Connection accepted");
        Ok((stream, addr))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Get configured backlog.
    pub fn backlog(&self) -> u32 {
        self.backlog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback(backlog: u32) -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
            backlog,
        }
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let listener = Listener::bind(&loopback(32)).unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(listener.backlog(), 32);
    }

    #[tokio::test]
    async fn accepts_connection() {
        let listener = Listener::bind(&loopback(1)).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (_stream, peer) = listener.accept().await.unwrap();
        let client = client.await.unwrap();
        assert_eq!(peer, client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn unparseable_address_is_rejected() {
        let config = ListenerConfig {
            bind_address: "localhost:https".into(),
            backlog: 32,
        };
        assert!(matches!(
            Listener::bind(&config),
            Err(ResponderError::Address(_))
        ));
    }

    #[tokio::test]
    async fn address_in_use_is_bind_error() {
        let holder = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let occupied = holder.local_addr().unwrap();

        let config = ListenerConfig {
            bind_address: occupied.to_string(),
            backlog: 32,
        };
        let err = Listener::bind(&config).map(|_| ()).unwrap_err();
        assert!(matches!(err, ResponderError::Bind { addr, .. } if addr == occupied));
    }
}
