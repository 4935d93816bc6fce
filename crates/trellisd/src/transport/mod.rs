//! Reply-socket transport for the daemon.
//!
//! The transport binds the configured endpoint and serves connections
//! strictly one at a time, answering each newline-delimited request
//! frame with exactly one response frame before reading the next.

mod connection;
mod errors;
mod listener;

pub use self::errors::ListenerError;
pub use self::listener::{ReplyListener, ReplyListenerHandle};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Produces one response frame for one request frame.
///
/// Implementations must not panic; a response is owed for every frame.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handles one raw frame and returns the reply, without the trailing
    /// newline.
    fn handle_request(&self, frame: &[u8]) -> Vec<u8>;
}

impl RequestHandler for crate::dispatch::Dispatcher {
    fn handle_request(&self, frame: &[u8]) -> Vec<u8> {
        self.handle(frame)
    }
}
