//! Server identity: CA certificate, server certificate and private key.
//!
//! The default identity is compiled into the binary from `certs/`. A
//! deployment may instead point the configuration at files on disk; those
//! may be PEM or raw DER and are detected by content.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;

use crate::config::{IdentityFiles, TlsConfig};

/// CA certificate that client certificates must chain to (DER).
pub const EMBEDDED_CA_CERT: &[u8] = include_bytes!("../certs/ca.der");

/// Server certificate (DER).
pub const EMBEDDED_SERVER_CERT: &[u8] = include_bytes!("../certs/server.der");

/// Server private key, RSA 2048 in PKCS#8 (DER).
pub const EMBEDDED_SERVER_KEY: &[u8] = include_bytes!("../certs/server.key.der");

const PEM_PREAMBLE: &[u8] = b"-----BEGIN";

/// Error reading certificate material from disk.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse PEM in {path}: {source}")]
    Pem {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("no {kind} found in {path}")]
    Missing { kind: &'static str, path: String },
}

/// Immutable certificate material for the TLS context.
///
/// Bytes are kept as loaded; parsing happens when the TLS context is built so
/// each setup stage can fail on its own.
#[derive(Clone)]
pub struct ServerIdentity {
    ca_cert: CertificateDer<'static>,
    cert_chain: Vec<CertificateDer<'static>>,
    private_key: Cow<'static, [u8]>,
}

impl ServerIdentity {
    /// The identity compiled into the binary.
    pub fn embedded() -> Self {
        Self::from_static_der(EMBEDDED_CA_CERT, EMBEDDED_SERVER_CERT, EMBEDDED_SERVER_KEY)
    }

    /// Build an identity from static DER buffers.
    pub fn from_static_der(ca_cert: &'static [u8], cert: &'static [u8], key: &'static [u8]) -> Self {
        Self {
            ca_cert: CertificateDer::from(ca_cert),
            cert_chain: vec![CertificateDer::from(cert)],
            private_key: Cow::Borrowed(key),
        }
    }

    /// Build an identity from owned DER buffers.
    pub fn from_der(ca_cert: Vec<u8>, cert_chain: Vec<Vec<u8>>, key: Vec<u8>) -> Self {
        Self {
            ca_cert: CertificateDer::from(ca_cert),
            cert_chain: cert_chain.into_iter().map(CertificateDer::from).collect(),
            private_key: Cow::Owned(key),
        }
    }

    /// Load the identity from the files named in `files`.
    pub fn from_files(files: &IdentityFiles) -> Result<Self, IdentityError> {
        let ca_cert = load_certs(Path::new(&files.ca_cert_path))?
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::Missing {
                kind: "CA certificate",
                path: files.ca_cert_path.clone(),
            })?;
        let cert_chain = load_certs(Path::new(&files.cert_path))?;
        let private_key = load_key(Path::new(&files.key_path))?;

        tracing::debug!(
            ca_cert = %files.ca_cert_path,
            cert = %files.cert_path,
            chain_len = cert_chain.len(),
            "Identity read from disk"
        );

        Ok(Self {
            ca_cert,
            cert_chain,
            private_key: Cow::Owned(private_key),
        })
    }

    /// Files named in the TLS configuration, or the embedded identity.
    pub fn from_config(config: &TlsConfig) -> Result<Self, IdentityError> {
        match &config.identity {
            Some(files) => Self::from_files(files),
            None => Ok(Self::embedded()),
        }
    }

    /// The CA certificate accepted for client verification.
    pub fn ca_cert(&self) -> &CertificateDer<'static> {
        &self.ca_cert
    }

    /// The server certificate chain, end-entity first.
    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    /// Decode the private key, detecting PKCS#8, SEC1 or PKCS#1 encoding.
    pub fn private_key(&self) -> Result<PrivateKeyDer<'static>, &'static str> {
        PrivateKeyDer::try_from(self.private_key.as_ref()).map(|key| key.clone_key())
    }
}

impl std::fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerIdentity")
            .field("ca_cert_len", &self.ca_cert.len())
            .field("cert_chain_len", &self.cert_chain.len())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, IdentityError> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut file| file.read_to_end(&mut bytes))
        .map_err(|source| IdentityError::Read {
            path: path.display().to_string(),
            source,
        })?;
    Ok(bytes)
}

fn is_pem(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(PEM_PREAMBLE)
}

/// Loads certificates from a PEM bundle or a single DER certificate.
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, IdentityError> {
    let bytes = read_file(path)?;
    if !is_pem(&bytes) {
        return Ok(vec![CertificateDer::from(bytes)]);
    }

    let mut reader = BufReader::new(bytes.as_slice());
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| IdentityError::Pem {
            path: path.display().to_string(),
            source,
        })?;
    if certs.is_empty() {
        return Err(IdentityError::Missing {
            kind: "certificate",
            path: path.display().to_string(),
        });
    }
    Ok(certs)
}

/// Loads a private key from PEM or DER, returning its raw DER bytes.
fn load_key(path: &Path) -> Result<Vec<u8>, IdentityError> {
    let bytes = read_file(path)?;
    if !is_pem(&bytes) {
        return Ok(bytes);
    }

    let mut reader = BufReader::new(bytes.as_slice());
    let key = rustls_pemfile::private_key(&mut reader)
        .map_err(|source| IdentityError::Pem {
            path: path.display().to_string(),
            source,
        })?
        .ok_or_else(|| IdentityError::Missing {
            kind: "private key",
            path: path.display().to_string(),
        })?;
    Ok(key.secret_der().to_vec())
}
