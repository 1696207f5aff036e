use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur while fetching and materializing a key.
#[derive(Debug, Error)]
pub enum FetchError {
    // --- Argument errors ---
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid permissions '{0}': expected an octal mode such as 0744")]
    InvalidPermissions(String),

    // --- Credential errors ---
    #[error("Unable to load {kind} '{}': {reason}", path.display())]
    Credentials {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },

    // --- Network errors ---
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error("Consul returned HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Key '{0}' not found in Consul")]
    KeyNotFound(String),

    #[error("Invalid response from Consul: {0}")]
    InvalidResponse(String),

    // --- Output errors ---
    #[error("Key '{0}' cannot be used as an output path")]
    UnsafeKeyPath(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Attach the path an IO error happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience type alias for consul-fetch results.
pub type Result<T> = std::result::Result<T, FetchError>;
