pub mod cli;
pub mod config;
pub mod consul;
pub mod errors;
pub mod logging;
pub mod materialize;
pub mod tls;
