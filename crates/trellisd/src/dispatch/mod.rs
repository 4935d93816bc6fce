//! Request dispatch: envelope decoding, kind routing, and invocation.
//!
//! The submodules split the pipeline along its seams: [`args`] decides
//! the calling convention for `op` payloads, [`errors`] owns the capture
//! and wire translation of failures, and [`dispatcher`] drives one
//! request from raw frame to raw frame.

pub(crate) mod args;
mod dispatcher;
mod errors;

pub use dispatcher::Dispatcher;
pub use errors::DispatchError;

/// Tracing target for dispatch events.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
