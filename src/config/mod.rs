//! Run configuration: the resolved settings for one fetch.
//!
//! This module provides:
//! - Optional TOML settings with defaults (`settings`)
//! - `FetchConfig`, the value handed from argument resolution to the fetch
//! - Permission and host parsing shared by the resolver

pub mod settings;

use std::fmt;
use std::path::PathBuf;

use zeroize::Zeroizing;

pub use settings::{PathSource, Settings};

use crate::consul::FetchRequest;
use crate::errors::{FetchError, Result};
use crate::tls::CredentialPaths;

/// Mode applied when no permissions argument is given.
pub const DEFAULT_PERMISSIONS: &str = "0744";

/// Largest mode accepted: permission, setuid, setgid and sticky bits.
const MAX_MODE: u32 = 0o7777;

/// Everything one run needs, resolved from arguments and settings.
pub struct FetchConfig {
    pub credentials: CredentialPaths,
    pub request: FetchRequest,
    pub base_dir: PathBuf,
    pub mode: u32,
    pub token: Option<Zeroizing<String>>,
    pub settings: Settings,
    /// Raise log output to debug level.
    pub verbose: bool,
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("credentials", &self.credentials)
            .field("request", &self.request)
            .field("base_dir", &self.base_dir)
            .field("mode", &format_args!("{:#o}", self.mode))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("settings", &self.settings)
            .field("verbose", &self.verbose)
            .finish()
    }
}

/// Parse an octal permission string such as `0744` into a mode.
///
/// Only octal digits are accepted (no sign, no `0o` prefix) and the
/// value must fit in the permission bits.
pub fn parse_permissions(raw: &str) -> Result<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return Err(FetchError::InvalidPermissions(raw.to_string()));
    }

    let mode = u32::from_str_radix(raw, 8)
        .map_err(|_| FetchError::InvalidPermissions(raw.to_string()))?;

    if mode > MAX_MODE {
        return Err(FetchError::InvalidPermissions(raw.to_string()));
    }

    Ok(mode)
}

/// Check that a host is a bare `host[:port]` without a scheme or path.
pub fn validate_host(host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(FetchError::InvalidArgument("host cannot be empty".into()));
    }

    if host.contains("://") {
        return Err(FetchError::InvalidArgument(format!(
            "host '{host}' must not include a protocol (https is implied)"
        )));
    }

    if host.contains(['/', '?', '#']) || host.chars().any(char::is_whitespace) {
        return Err(FetchError::InvalidArgument(format!(
            "host '{host}' must be a bare hostname, optionally with a port"
        )));
    }

    Ok(())
}
