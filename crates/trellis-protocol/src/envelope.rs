//! Request and response envelopes exchanged over the reply socket.
//!
//! A request frame carries a `kind` tag selecting the calling convention,
//! an optional plugin `name`, and an optional `param` payload whose shape
//! depends on the kind. A response frame carries exactly one of `result`
//! or `error`; the externally tagged enum makes the exclusivity structural
//! rather than a runtime invariant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CodecError;

/// Parsed invocation request from a connected engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RequestEnvelope {
    /// Dispatch kind tag (`init`, `op`, `handler`, `hook`, `timer`,
    /// `provider`).
    pub kind: String,
    /// Plugin name; required for every kind except `init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Kind-dependent payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<Value>,
}

impl RequestEnvelope {
    /// Builds a request envelope from its parts.
    #[must_use]
    pub fn new(kind: impl Into<String>, name: Option<String>, param: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            name,
            param,
        }
    }

    /// Decodes a single UTF-8 JSON frame into a request envelope.
    ///
    /// Trailing ASCII whitespace (including the newline delimiter used by
    /// the transport framing) is trimmed before parsing.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedRequest`] when the frame is empty or
    /// is not valid JSON matching the envelope schema.
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        let trimmed = trim_trailing_whitespace(raw);
        if trimmed.is_empty() {
            return Err(CodecError::malformed_request("empty request frame"));
        }
        serde_json::from_slice(trimmed).map_err(CodecError::from_json_error)
    }

    /// Encodes the envelope as a JSON frame, mainly useful to clients and
    /// tests.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodeResponse`] when serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::EncodeResponse)
    }
}

/// Outcome of one dispatched request.
///
/// Serializes as `{"result": ...}` on success or `{"error": {...}}` on
/// failure; never both, never neither.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// Successful invocation payload.
    Result(Value),
    /// Structured failure description.
    Error(ErrorDescriptor),
}

impl ResponseEnvelope {
    /// Wraps a success payload.
    #[must_use]
    pub fn result(value: Value) -> Self {
        Self::Result(value)
    }

    /// Wraps a failure descriptor.
    #[must_use]
    pub fn error(descriptor: ErrorDescriptor) -> Self {
        Self::Error(descriptor)
    }

    /// Returns `true` when the envelope carries an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Encodes the envelope as a single JSON frame.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodeResponse`] when serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::EncodeResponse)
    }

    /// Decodes a response frame, the inverse of [`ResponseEnvelope::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedRequest`] when the frame does not
    /// match the response schema.
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        let trimmed = trim_trailing_whitespace(raw);
        serde_json::from_slice(trimmed).map_err(CodecError::from_json_error)
    }
}

/// Wire representation of a captured failure.
///
/// The schema is deliberately minimal and stable: a snake_case `type` tag
/// for programmatic matching, a human-readable `message`, and optional
/// structured `detail` context.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorDescriptor {
    /// Stable failure category tag.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable failure description.
    pub message: String,
    /// Optional structured context (offending kind, plugin name, etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ErrorDescriptor {
    /// Creates a descriptor without detail context.
    #[must_use]
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches structured detail context.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Trims trailing ASCII whitespace from a byte slice.
fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}
