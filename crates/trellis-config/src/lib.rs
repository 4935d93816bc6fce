//! Declarative configuration shared by the Trellis daemon.
//!
//! Configuration resolves from command-line flags with environment
//! variable fallbacks and platform-derived defaults: the reply socket
//! endpoint, the logging filter and format, and the SQLite engine path
//! backing hook transactions.

mod defaults;
mod logging;
mod socket;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;

pub use crate::defaults::{DEFAULT_LOG_FILTER, DEFAULT_TCP_PORT};
pub use crate::logging::LogFormat;
pub use crate::socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "trellisd", version, about = "Trellis plugin dispatch daemon")]
pub struct Config {
    /// Reply socket endpoint, e.g. `unix:///run/trellis/trellisd.sock` or
    /// `tcp://127.0.0.1:9787`.
    #[arg(
        long = "socket",
        env = "TRELLISD_SOCKET",
        default_value_t = defaults::default_socket_endpoint()
    )]
    pub socket: SocketEndpoint,

    /// Log filter expression in `tracing` `EnvFilter` syntax.
    #[arg(
        long = "log-filter",
        env = "TRELLISD_LOG_FILTER",
        default_value = DEFAULT_LOG_FILTER
    )]
    pub log_filter: String,

    /// Log output format.
    #[arg(
        long = "log-format",
        env = "TRELLISD_LOG_FORMAT",
        default_value_t = LogFormat::default()
    )]
    pub log_format: LogFormat,

    /// Path of the SQLite database handed to hook transactions.
    #[arg(
        long = "engine-path",
        env = "TRELLISD_ENGINE_PATH",
        default_value_t = defaults::default_engine_path()
    )]
    pub engine_path: Utf8PathBuf,
}

impl Config {
    /// Loads configuration from process arguments and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an argument fails to parse.
    pub fn load() -> Result<Self, ConfigError> {
        Self::try_parse().map_err(ConfigError::from)
    }

    /// Loads configuration from an explicit argument list, mainly for
    /// tests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an argument fails to parse.
    pub fn load_from<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(ConfigError::from)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: defaults::default_socket_endpoint(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
            engine_path: defaults::default_engine_path(),
        }
    }
}

/// Errors surfaced while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Command-line or environment value failed to parse.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] clap::Error),
}
