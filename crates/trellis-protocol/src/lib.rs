//! Wire protocol types and codec for the Trellis plugin transport.
//!
//! Requests and responses cross the reply socket as single UTF-8 JSON
//! frames. This crate owns the envelope types on both sides of that
//! boundary, the structured error descriptor embedded in failure
//! responses, and the record model exchanged with `hook` plugins.
//!
//! The crate performs no I/O: decoding and encoding operate on byte
//! slices so the transport layer stays a thin shim around the codec.

mod envelope;
mod error;
mod record;

pub use self::envelope::{ErrorDescriptor, RequestEnvelope, ResponseEnvelope};
pub use self::error::CodecError;
pub use self::record::{Record, RecordId};
