//! Loading PEM material for mutual TLS.
//!
//! The CA file becomes the only trust anchor for the server; the client
//! certificate chain and key are presented during the handshake.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use tracing::{debug, warn};
use ureq::tls::{parse_pem, Certificate, PemItem, PrivateKey};
use zeroize::Zeroizing;

use crate::errors::{FetchError, Result};

/// The three PEM paths given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    pub ca_file: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Parsed TLS material, held only until the HTTPS client is built.
pub struct ClientCredentials {
    ca_certs: Vec<Certificate<'static>>,
    cert_chain: Vec<Certificate<'static>>,
    key: PrivateKey<'static>,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("ca_certs", &self.ca_certs.len())
            .field("cert_chain", &self.cert_chain.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

impl ClientCredentials {
    /// Read and parse the client pair and the CA bundle.
    ///
    /// The pair must parse and the key must belong to the leaf
    /// certificate. A CA file with no usable certificates only logs a
    /// warning and yields an empty trust pool, so every server
    /// certificate is rejected later at request time.
    pub fn load(paths: &CredentialPaths) -> Result<Self> {
        let cert_chain = load_cert_chain(&paths.cert_file)?;
        let key = load_private_key(&paths.key_file)?;
        check_key_matches(&cert_chain, &key, paths)?;
        let ca_certs = load_ca_bundle(&paths.ca_file)?;

        debug!(
            chain = cert_chain.len(),
            roots = ca_certs.len(),
            "loaded TLS credentials"
        );

        Ok(Self {
            ca_certs,
            cert_chain,
            key,
        })
    }

    pub fn ca_certs(&self) -> &[Certificate<'static>] {
        &self.ca_certs
    }

    pub fn cert_chain(&self) -> &[Certificate<'static>] {
        &self.cert_chain
    }

    /// Split into CA roots, client chain and key, consuming the material.
    pub fn into_parts(
        self,
    ) -> (
        Vec<Certificate<'static>>,
        Vec<Certificate<'static>>,
        PrivateKey<'static>,
    ) {
        (self.ca_certs, self.cert_chain, self.key)
    }
}

fn read_pem(kind: &'static str, path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    fs::read(path)
        .map(Zeroizing::new)
        .map_err(|e| credentials_error(kind, path, e.to_string()))
}

fn credentials_error(kind: &'static str, path: &Path, reason: String) -> FetchError {
    FetchError::Credentials {
        kind,
        path: path.to_path_buf(),
        reason,
    }
}

fn load_cert_chain(path: &Path) -> Result<Vec<Certificate<'static>>> {
    const KIND: &str = "client certificate";
    let pem = read_pem(KIND, path)?;

    let mut chain = Vec::new();
    for item in parse_pem(&pem) {
        match item {
            Ok(PemItem::Certificate(cert)) => chain.push(cert.to_owned()),
            Ok(_) => {}
            Err(e) => return Err(credentials_error(KIND, path, e.to_string())),
        }
    }

    if chain.is_empty() {
        return Err(credentials_error(
            KIND,
            path,
            "no PEM certificate found".into(),
        ));
    }

    Ok(chain)
}

fn load_private_key(path: &Path) -> Result<PrivateKey<'static>> {
    const KIND: &str = "client key";
    let pem = read_pem(KIND, path)?;

    PrivateKey::from_pem(&pem).map_err(|e| credentials_error(KIND, path, e.to_string()))
}

/// Reject a key that does not belong to the leaf certificate.
fn check_key_matches(
    chain: &[Certificate<'static>],
    key: &PrivateKey<'static>,
    paths: &CredentialPaths,
) -> Result<()> {
    const KIND: &str = "client key";
    let mismatch = |reason: String| {
        credentials_error(
            KIND,
            &paths.key_file,
            format!("{reason} (certificate '{}')", paths.cert_file.display()),
        )
    };

    let key_der = PrivateKeyDer::try_from(key.der())
        .map_err(|e| mismatch(e.to_string()))?
        .clone_key();
    let signing_key = ring::default_provider()
        .key_provider
        .load_private_key(key_der)
        .map_err(|e| mismatch(e.to_string()))?;

    let chain_der = chain
        .iter()
        .map(|cert| CertificateDer::from(cert.der().to_vec()))
        .collect();

    CertifiedKey::new(chain_der, signing_key)
        .keys_match()
        .map_err(|e| mismatch(format!("key does not match certificate: {e}")))
}

fn load_ca_bundle(path: &Path) -> Result<Vec<Certificate<'static>>> {
    const KIND: &str = "CA certificate";
    let pem = read_pem(KIND, path)?;

    let mut roots = Vec::new();
    for item in parse_pem(&pem) {
        match item {
            Ok(PemItem::Certificate(cert)) => roots.push(cert.to_owned()),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable PEM block"),
        }
    }

    if roots.is_empty() {
        warn!(
            path = %path.display(),
            "CA file contains no certificates; server verification will fail"
        );
    }

    Ok(roots)
}
