//! Fetch-and-materialize, the one operation this tool performs.
//!
//! This module provides:
//! - `OutputTarget`, the directory/file/mode a value is written to (`target`)
//! - `fetch_and_materialize`, which reads one key through any `KvSource`
//! - `run`, which wires up mutual TLS and the Consul client first

pub mod target;

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

pub use target::{safe_key_path, OutputTarget, CONFIG_FILE_NAME};

use crate::config::{FetchConfig, PathSource};
use crate::consul::{ConsulClient, KvSource};
use crate::errors::{FetchError, Result};
use crate::tls::{build_agent, ClientCredentials};

/// Load credentials, build the HTTPS client, then fetch and write.
///
/// Credentials are read before any network traffic, so a missing PEM
/// file fails without contacting Consul.
pub fn run(config: &FetchConfig) -> Result<PathBuf> {
    let credentials = ClientCredentials::load(&config.credentials)?;
    let timeout = config.settings.timeout_secs.map(Duration::from_secs);
    let agent = build_agent(credentials, timeout);

    let client = ConsulClient::new(agent)
        .with_token(config.token.clone())
        .with_datacenter(config.settings.datacenter.clone());

    fetch_and_materialize(config, &client)
}

/// Read the configured key from `source` and write it below `base_dir`.
///
/// Nothing is written when the key is missing. The directory name comes
/// from the returned pair or from the request, per `settings.path_from`.
pub fn fetch_and_materialize(config: &FetchConfig, source: &dyn KvSource) -> Result<PathBuf> {
    let request = &config.request;

    // Fail on an unusable requested key before going to the network.
    if config.settings.path_from == PathSource::Requested {
        safe_key_path(&request.key)?;
    }

    let pair = source
        .get(request)?
        .ok_or_else(|| FetchError::KeyNotFound(request.key.clone()))?;

    info!(
        key = %pair.key,
        bytes = pair.value.len(),
        modify_index = pair.modify_index,
        "fetched key"
    );

    let dir_key = match config.settings.path_from {
        PathSource::Returned => {
            if pair.key.trim_matches('/') != request.key_path().trim_end_matches('/') {
                warn!(
                    requested = %request.key,
                    returned = %pair.key,
                    "Consul returned a different key name; using the returned one for the output path"
                );
            }
            pair.key.as_str()
        }
        PathSource::Requested => request.key.as_str(),
    };

    let target = OutputTarget::new(&config.base_dir, dir_key, config.mode)?;
    target.write(&pair.value)
}
