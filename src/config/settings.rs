use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{FetchError, Result};

/// Which key name decides the output directory under `baseDir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PathSource {
    /// The key name Consul returned with the pair.
    #[default]
    Returned,
    /// The key exactly as given on the command line.
    Requested,
}

/// Optional settings, loaded from a TOML file passed with `--config`.
///
/// Every field has a default so the tool works without any config file.
/// Command-line flags take precedence over values read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Key name used for the output directory.
    #[serde(default)]
    pub path_from: PathSource,

    /// Overall request timeout. `None` keeps the HTTP client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Consul datacenter to query (`?dc=`).
    #[serde(default)]
    pub datacenter: Option<String>,
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            path_from: PathSource::default(),
            timeout_secs: None,
            datacenter: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// Unlike the optional `--config` flag itself, a path that was given
    /// must exist and parse.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FetchError::Config(format!("cannot read {}: {e}", path.display()))
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            FetchError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path` when given, otherwise return the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == Some(0) {
            return Err(FetchError::Config(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
