//! Error types for wire encoding and decoding.

use thiserror::Error;

/// Errors surfaced while translating between wire frames and protocol types.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Inbound frame could not be decoded as a request envelope.
    #[error("malformed request frame: {message}")]
    MalformedRequest {
        /// Human-readable description of the decode failure.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Outbound response envelope could not be serialized.
    #[error("failed to encode response frame: {0}")]
    EncodeResponse(#[source] serde_json::Error),

    /// A record value did not match the expected wire shape.
    #[error("malformed record: {message}")]
    MalformedRecord {
        /// Description of the shape violation.
        message: String,
    },
}

impl CodecError {
    /// Creates a malformed request error from a serde failure.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedRequest {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a malformed record error.
    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }
}
