//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use tls_ping_responder::identity::EMBEDDED_CA_CERT;
use tls_ping_responder::net::connection::SessionTracker;
use tls_ping_responder::{Responder, ResponderConfig, ResponderError, ServerIdentity, SessionEvent, Shutdown};

const CLIENT_CERT: &[u8] = include_bytes!("../fixtures/client.der");
const CLIENT_KEY: &[u8] = include_bytes!("../fixtures/client.key.der");
const ROGUE_CERT: &[u8] = include_bytes!("../fixtures/rogue_client.der");
const ROGUE_KEY: &[u8] = include_bytes!("../fixtures/rogue_client.key.der");

/// How long any single test step may wait on the server.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Which certificate a test client presents.
#[derive(Debug, Clone, Copy)]
pub enum ClientCert {
    /// Signed by the responder's CA.
    Trusted,
    /// Signed by a CA the responder does not know.
    Rogue,
    /// No certificate at all.
    Anonymous,
}

/// A responder running on a loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub events: broadcast::Receiver<SessionEvent>,
    pub tracker: SessionTracker,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ResponderError>>,
}

/// Loopback configuration with an ephemeral port.
pub fn loopback_config() -> ResponderConfig {
    let mut config = ResponderConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// Bind and start a responder with the embedded identity.
pub async fn start_responder(config: ResponderConfig) -> TestServer {
    let responder = Responder::bind(&config, &ServerIdentity::embedded()).unwrap();
    let addr = responder.local_addr().unwrap();
    let events = responder.subscribe();
    let tracker = responder.tracker();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(responder.run(shutdown.subscribe()));

    TestServer {
        addr,
        events,
        tracker,
        shutdown,
        handle,
    }
}

/// Build a TLS 1.2 connector presenting `cert`.
pub fn connector(cert: ClientCert) -> TlsConnector {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut roots = RootCertStore::empty();
    roots.add(CertificateDer::from(EMBEDDED_CA_CERT)).unwrap();

    let builder = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS12])
        .unwrap()
        .with_root_certificates(roots);

    let config = match cert {
        ClientCert::Trusted => builder
            .with_client_auth_cert(vec![CertificateDer::from(CLIENT_CERT)], key(CLIENT_KEY))
            .unwrap(),
        ClientCert::Rogue => builder
            .with_client_auth_cert(vec![CertificateDer::from(ROGUE_CERT)], key(ROGUE_KEY))
            .unwrap(),
        ClientCert::Anonymous => builder.with_no_client_auth(),
    };
    TlsConnector::from(Arc::new(config))
}

fn key(der: &'static [u8]) -> PrivateKeyDer<'static> {
    PrivateKeyDer::try_from(der).unwrap()
}

/// Open a TCP connection and run the client handshake.
pub async fn connect(addr: SocketAddr, cert: ClientCert) -> std::io::Result<TlsStream<TcpStream>> {
    let tcp = TcpStream::connect(addr).await?;
    let server_name = ServerName::try_from("localhost").unwrap();
    connector(cert).connect(server_name, tcp).await
}

/// Next session event, failing the test if none arrives in time.
pub async fn next_event(events: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(STEP_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}
