//! TLS context construction.
//!
//! Builds the one `ServerConfig` shared by every session: TLS 1.2 only,
//! client certificates required and verified against the configured CA, and
//! a fixed maximum record fragment size.

use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::server::WebPkiClientVerifier;
use rustls::sign::CertifiedKey;
use rustls::{RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;

use crate::error::ResponderError;
use crate::identity::ServerIdentity;

/// Build the server TLS context, failing at the first stage that rejects
/// its input.
pub fn build_server_config(
    identity: &ServerIdentity,
    fragment_size: usize,
) -> Result<Arc<ServerConfig>, ResponderError> {
    let provider: Arc<CryptoProvider> = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

    let builder = ServerConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(&[&rustls::version::TLS12])
        .map_err(ResponderError::Context)?;
    tracing::info!(protocol = "TLSv1.2", "TLS context created");

    let mut roots = RootCertStore::empty();
    roots
        .add(identity.ca_cert().clone())
        .map_err(|e| ResponderError::CaCertificate(e.to_string()))?;
    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
        .build()
        .map_err(|e| ResponderError::CaCertificate(e.to_string()))?;
    tracing::info!("CA certificate loaded");

    let cert_chain = identity.cert_chain().to_vec();
    if cert_chain.is_empty() {
        return Err(ResponderError::ServerCertificate(
            "certificate chain is empty".to_string(),
        ));
    }

    let key = identity
        .private_key()
        .map_err(|e| ResponderError::PrivateKey(e.to_string()))?;
    let signing_key = provider
        .key_provider
        .load_private_key(key.clone_key())
        .map_err(|e| ResponderError::PrivateKey(e.to_string()))?;
    tracing::info!("Server private key loaded");

    // Parses the end-entity certificate and checks it against the key.
    CertifiedKey::new(cert_chain.clone(), signing_key)
        .keys_match()
        .map_err(|e| ResponderError::ServerCertificate(e.to_string()))?;
    tracing::info!(chain_len = cert_chain.len(), "Server certificate loaded");

    let mut config = builder
        .with_client_cert_verifier(verifier)
        .with_single_cert(cert_chain, key)
        .map_err(|e| ResponderError::ServerCertificate(e.to_string()))?;
    tracing::info!("Verify mode set: client certificate required");

    config.max_fragment_size = Some(fragment_size);
    tracing::info!(fragment_size, "Record fragment size set");

    Ok(Arc::new(config))
}

/// Wrap a finished context in an acceptor.
pub fn acceptor(config: Arc<ServerConfig>) -> TlsAcceptor {
    TlsAcceptor::from(config)
}
