//! The Trellis plugin dispatch daemon.
//!
//! `trellisd` sits between a reply-style socket and a [`trellis_plugins`]
//! registry. Each inbound frame names a dispatch kind, a plugin, and a
//! kind-dependent payload; the [`Dispatcher`] resolves the plugin, invokes
//! it with the matching calling convention, and answers with exactly one
//! response frame carrying either a result or a structured error.
//!
//! The daemon is deliberately sequential: the transport serves one request
//! at a time and the dispatcher holds no state between calls. Hook
//! invocations additionally run inside a scoped SQLite transaction that
//! commits on success and rolls back on failure.

mod bootstrap;
mod dispatch;
mod engine;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
    run,
};
pub use dispatch::{DispatchError, Dispatcher};
pub use engine::{EngineError, SqliteEngine};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ListenerError, ReplyListener, ReplyListenerHandle, RequestHandler};
