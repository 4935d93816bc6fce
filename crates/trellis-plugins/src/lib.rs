//! Plugin registry and invocation interfaces for Trellis.
//!
//! The `trellis-plugins` crate defines the contract between the dispatch
//! daemon and registered plugin code. Each plugin kind has its own calling
//! convention, captured by a dedicated trait: `op` functions receive
//! normalized arguments, `handler` and `timer` entries take no arguments,
//! `hook` entries receive a mutable record plus a scoped transaction, and
//! `provider` entries receive an action tag with the full parameter
//! payload.
//!
//! The [`PluginRegistry`] stores invocables keyed by kind and name (hooks
//! additionally by record type) and enumerates the registered pairs as the
//! manifest returned to `init` requests. Blanket implementations let plain
//! closures stand in for the traits, which keeps registration lightweight
//! for embedders and tests alike.

pub mod args;
pub mod error;
pub mod invocable;
pub mod kind;
pub mod registry;
pub mod transaction;

pub use self::args::CallArgs;
pub use self::error::PluginError;
pub use self::invocable::{ActionProvider, Handler, OpFunction, RecordHook, TimerTask};
pub use self::kind::PluginKind;
pub use self::registry::{ManifestEntry, PluginRegistry};
pub use self::transaction::{PluginTransaction, TransactionSource, TransactionWork};
