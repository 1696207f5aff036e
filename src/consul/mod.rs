//! Consul KV access.
//!
//! This module provides:
//! - Request and pair types plus JSON decoding (`kv`)
//! - The `KvSource` trait the materialize step reads through
//! - `ConsulClient`, the mutual-TLS HTTPS implementation

pub mod kv;

use tracing::debug;
use ureq::Agent;
use zeroize::Zeroizing;

pub use kv::{decode_kv_response, FetchRequest, KvPair};

use crate::errors::{FetchError, Result};

/// Anything that can answer a single-key read.
pub trait KvSource {
    /// Read one key. `Ok(None)` means the key does not exist.
    fn get(&self, request: &FetchRequest) -> Result<Option<KvPair>>;
}

/// Blocking Consul client over a preconfigured HTTPS agent.
pub struct ConsulClient {
    agent: Agent,
    token: Option<Zeroizing<String>>,
    datacenter: Option<String>,
    scheme: &'static str,
}

impl ConsulClient {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            token: None,
            datacenter: None,
            scheme: "https",
        }
    }

    /// ACL token sent as `X-Consul-Token`.
    pub fn with_token(mut self, token: Option<Zeroizing<String>>) -> Self {
        self.token = token;
        self
    }

    /// Datacenter to query instead of the agent's own.
    pub fn with_datacenter(mut self, datacenter: Option<String>) -> Self {
        self.datacenter = datacenter;
        self
    }
}

impl KvSource for ConsulClient {
    fn get(&self, request: &FetchRequest) -> Result<Option<KvPair>> {
        let url = request.url_with_scheme(self.scheme);
        debug!(%url, dc = ?self.datacenter, "reading key");

        let mut req = self.agent.get(&url);
        if let Some(dc) = &self.datacenter {
            req = req.query("dc", dc);
        }
        if let Some(token) = &self.token {
            req = req.header("X-Consul-Token", token.as_str());
        }

        match req.call() {
            Ok(mut response) => {
                let body = response
                    .body_mut()
                    .read_to_vec()
                    .map_err(|source| FetchError::Transport {
                        url: url.clone(),
                        source,
                    })?;
                debug!(bytes = body.len(), "received KV response");
                decode_kv_response(&body)
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(ureq::Error::StatusCode(status)) => Err(FetchError::Http { url, status }),
            Err(source) => Err(FetchError::Transport { url, source }),
        }
    }
}
