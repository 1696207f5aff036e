//! Mutual TLS for the Consul HTTPS client.
//!
//! This module provides:
//! - PEM loading for the CA bundle and client pair (`credentials`)
//! - Construction of a `ureq::Agent` that presents the client pair and
//!   trusts only the loaded CA certificates

pub mod credentials;

use std::sync::Arc;
use std::time::Duration;

use ureq::tls::{ClientCert, RootCerts, TlsConfig};
use ureq::Agent;

pub use credentials::{ClientCredentials, CredentialPaths};

/// Build a blocking HTTPS agent configured for mutual TLS.
///
/// Consumes the credentials; they live on only inside the agent.
/// `timeout` bounds the whole request; `None` keeps ureq's defaults.
pub fn build_agent(credentials: ClientCredentials, timeout: Option<Duration>) -> Agent {
    let (ca_certs, cert_chain, key) = credentials.into_parts();
    let client_cert = ClientCert::new_with_certs(&cert_chain, key);
    let roots = RootCerts::Specific(Arc::new(ca_certs));

    let tls = TlsConfig::builder()
        .client_cert(Some(client_cert))
        .root_certs(roots)
        .build();

    let config = Agent::config_builder()
        .tls_config(tls)
        .timeout_global(timeout)
        .build();

    Agent::new_with_config(config)
}
