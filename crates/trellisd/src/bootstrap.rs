//! Daemon bootstrap orchestration.
//!
//! Bootstrap wires the resolved configuration, telemetry, the SQLite
//! engine, and the caller-supplied plugin registry into a [`Daemon`]
//! ready to serve its socket. The registry is sealed here: plugins
//! register before bootstrap and the set never changes while serving.

use std::fs;
use std::io;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use trellis_config::{Config, ConfigError, SocketPreparationError};
use trellis_plugins::PluginRegistry;

use crate::dispatch::Dispatcher;
use crate::engine::{EngineError, SqliteEngine};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ReplyListener, ReplyListenerHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the environment or command line
    /// cannot be parsed.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that returns a pre-resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap and serving.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The engine database directory could not be created.
    #[error("failed to create engine directory '{path}': {source}")]
    EngineDirectory {
        /// Directory that was attempted.
        path: String,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// The engine database could not be opened.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The reply listener failed to bind or run.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Binds the configured endpoint and starts serving requests.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Listener`] when the endpoint cannot be
    /// bound or the serve thread cannot start.
    pub fn serve(&self) -> Result<ReplyListenerHandle, BootstrapError> {
        let listener = ReplyListener::bind(&self.config.socket)?;
        info!(
            target: BOOTSTRAP_TARGET,
            endpoint = %self.config.socket,
            "daemon serving"
        );
        let dispatcher = Arc::clone(&self.dispatcher);
        let handler: Arc<dyn crate::transport::RequestHandler> = dispatcher;
        Ok(listener.start(handler)?)
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered while loading
/// configuration, installing telemetry, preparing the socket path, or
/// opening the engine database.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    registry: PluginRegistry,
) -> Result<Daemon, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;

    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    config
        .socket
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;

    if let Some(parent) = config.engine_path.parent() {
        fs::create_dir_all(parent).map_err(|source| BootstrapError::EngineDirectory {
            path: parent.to_string(),
            source,
        })?;
    }
    let engine = SqliteEngine::open(&config.engine_path)?;

    info!(
        target: BOOTSTRAP_TARGET,
        plugins = registry.len(),
        engine = %config.engine_path,
        "bootstrap complete"
    );

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), Arc::new(engine)));
    Ok(Daemon {
        config,
        dispatcher,
        telemetry,
    })
}

/// Bootstraps from the process environment and serves until the listener
/// thread exits.
///
/// # Errors
///
/// Propagates any [`BootstrapError`] from bootstrap or the listener.
pub fn run(registry: PluginRegistry) -> Result<(), BootstrapError> {
    let daemon = bootstrap_with(&SystemConfigLoader, registry)?;
    let handle = daemon.serve()?;
    Ok(handle.join()?)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use trellis_config::SocketEndpoint;
    use trellis_plugins::PluginError;

    use super::*;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        let base = camino::Utf8Path::from_path(dir.path()).expect("utf8 temp dir");
        Config {
            socket: SocketEndpoint::tcp("127.0.0.1", 0),
            log_filter: "info".to_owned(),
            log_format: trellis_config::LogFormat::Compact,
            engine_path: base.join("store").join("engine.db"),
        }
    }

    #[test]
    fn bootstrap_creates_the_engine_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = test_config(&dir);
        let loader = StaticConfigLoader::new(config);
        let daemon =
            bootstrap_with(&loader, PluginRegistry::new()).expect("bootstrap succeeds");
        assert!(daemon.config().engine_path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn bootstrapped_daemon_serves_requests() {
        use std::io::{BufRead, BufReader, Write as _};
        use std::os::unix::net::UnixStream;

        let dir = tempfile::tempdir().expect("temp dir");
        let socket_path = dir.path().join("trellisd.sock");
        let mut registry = PluginRegistry::new();
        registry
            .register_handler("ping", || -> Result<Value, PluginError> {
                Ok(json!("pong"))
            })
            .expect("register handler");

        let mut config = test_config(&dir);
        config.socket =
            SocketEndpoint::unix(socket_path.to_str().expect("utf8 path").to_string());
        let loader = StaticConfigLoader::new(config);
        let daemon = bootstrap_with(&loader, registry).expect("bootstrap succeeds");
        let handle = daemon.serve().expect("serve starts");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        let mut client = loop {
            match UnixStream::connect(&socket_path) {
                Ok(stream) => break stream,
                Err(_) if std::time::Instant::now() < deadline => {
                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
                Err(error) => panic!("connect to daemon socket: {error}"),
            }
        };
        client
            .write_all(b"{\"kind\":\"handler\",\"name\":\"ping\"}\n")
            .expect("write request");
        let mut response = String::new();
        BufReader::new(&client)
            .read_line(&mut response)
            .expect("read response");
        assert_eq!(response, "{\"result\":\"pong\"}\n");

        // The serve loop blocks on this connection until it closes.
        drop(client);
        handle.shutdown();
        handle.join().expect("join listener");
    }

    #[test]
    fn static_loader_round_trips_the_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = test_config(&dir);
        let loader = StaticConfigLoader::new(config.clone());
        let loaded = loader.load().expect("load static config");
        assert_eq!(loaded.socket, config.socket);
        assert_eq!(loaded.engine_path, config.engine_path);
    }
}
