//! CLI module: Clap argument parser, output helpers, and argument resolution.

pub mod output;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::{
    parse_permissions, validate_host, FetchConfig, PathSource, Settings, DEFAULT_PERMISSIONS,
};
use crate::consul::FetchRequest;
use crate::errors::Result;
use crate::tls::CredentialPaths;

/// consul-fetch: write one Consul KV value to a local file.
#[derive(Parser, Debug)]
#[command(
    name = "consul-fetch",
    about = "Fetch a Consul KV value over mutual TLS and write it to disk",
    version
)]
pub struct Cli {
    /// The file holding the CA certificate
    #[arg(long = "caFile", value_name = "PATH")]
    pub ca_file: PathBuf,

    /// The file holding the client certificate
    #[arg(long = "certFile", value_name = "PATH")]
    pub cert_file: PathBuf,

    /// The file holding the client key
    #[arg(long = "keyFile", value_name = "PATH")]
    pub key_file: PathBuf,

    /// Consul ACL token (sent as X-Consul-Token)
    #[arg(long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Consul datacenter to query
    #[arg(long)]
    pub datacenter: Option<String>,

    /// Which key name decides the output directory
    #[arg(long, value_enum)]
    pub path_from: Option<PathSource>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// TOML settings file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log each step to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Consul host to talk to, without the protocol (https)
    pub host: String,

    /// Name of the key that contains the config
    pub key: String,

    /// Directory where config files should be written
    #[arg(value_name = "BASE_DIR")]
    pub base_dir: PathBuf,

    /// File and directory permissions, in octal
    #[arg(default_value = DEFAULT_PERMISSIONS)]
    pub permissions: String,
}

impl Cli {
    /// Turn parsed arguments into a run configuration.
    ///
    /// The permission string is checked first so a bad mode fails before
    /// any file, including the settings file, is touched.
    pub fn into_config(self) -> Result<FetchConfig> {
        let mode = parse_permissions(&self.permissions)?;
        validate_host(&self.host)?;

        let mut settings = Settings::load_or_default(self.config.as_deref())?;
        if let Some(path_from) = self.path_from {
            settings.path_from = path_from;
        }
        if let Some(secs) = self.timeout {
            settings.timeout_secs = Some(secs);
        }
        if self.datacenter.is_some() {
            settings.datacenter = self.datacenter;
        }

        Ok(FetchConfig {
            credentials: CredentialPaths {
                ca_file: self.ca_file,
                cert_file: self.cert_file,
                key_file: self.key_file,
            },
            request: FetchRequest {
                host: self.host,
                key: self.key,
            },
            base_dir: self.base_dir,
            mode,
            token: self.token.filter(|t| !t.is_empty()).map(Zeroizing::new),
            settings,
            verbose: self.verbose,
        })
    }
}

/// Resolve an argument list (program name first) into a run configuration.
///
/// Clap failures, including `--help` and `--version`, come back as
/// `FetchError::Usage` so the caller decides how to print and exit.
pub fn resolve<I, T>(args: I) -> Result<FetchConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args)?.into_config()
}
