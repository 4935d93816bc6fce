//! Error types for request dispatch failures.
//!
//! Every non-fatal failure during dispatch is captured into a
//! [`DispatchError`] and translated into the wire [`ErrorDescriptor`]
//! embedded in the response envelope. The descriptor's `type` tag is the
//! stable programmatic surface; messages are for humans.

use serde_json::json;
use thiserror::Error;

use trellis_plugins::PluginError;
use trellis_protocol::{CodecError, ErrorDescriptor};

/// Errors surfaced while parsing, resolving, or invoking a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Frame or record could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Request kind tag is not a recognised dispatch kind.
    #[error("unknown kind '{kind}'")]
    UnknownKind {
        /// Offending kind tag.
        kind: String,
    },

    /// Request omitted the plugin name required by its kind.
    #[error("request kind '{kind}' requires a name")]
    MissingName {
        /// Kind that was requested.
        kind: String,
    },

    /// An `op` request carried `args` that are neither array nor object.
    #[error("unsupported args type '{found}'")]
    UnsupportedArgs {
        /// JSON type name of the offending value.
        found: &'static str,
    },

    /// A `provider` request omitted the required `action` field.
    #[error("provider request requires a string 'param.action'")]
    MissingAction,

    /// Registry resolution, invocation, or transaction failure.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl DispatchError {
    /// Creates an unknown-kind error.
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind { kind: kind.into() }
    }

    /// Creates a missing-name error.
    pub fn missing_name(kind: impl Into<String>) -> Self {
        Self::MissingName { kind: kind.into() }
    }

    /// Translates the failure into its wire descriptor.
    ///
    /// This is the codec's failure translation: each variant maps to a
    /// stable `type` tag, the display message, and optional structured
    /// detail naming the offending kind or plugin.
    #[must_use]
    pub fn descriptor(&self) -> ErrorDescriptor {
        match self {
            Self::Codec(_) => ErrorDescriptor::new("malformed_request", self.to_string()),
            Self::UnknownKind { kind } => {
                ErrorDescriptor::new("unknown_kind", self.to_string())
                    .with_detail(json!({"kind": kind}))
            }
            Self::MissingName { kind } => {
                ErrorDescriptor::new("malformed_request", self.to_string())
                    .with_detail(json!({"kind": kind}))
            }
            Self::UnsupportedArgs { .. } | Self::MissingAction => {
                ErrorDescriptor::new("malformed_request", self.to_string())
            }
            Self::Plugin(error) => descriptor_for_plugin(error),
        }
    }
}

fn descriptor_for_plugin(error: &PluginError) -> ErrorDescriptor {
    match error {
        PluginError::NotFound { kind, name } => {
            ErrorDescriptor::new("plugin_not_found", error.to_string())
                .with_detail(json!({"kind": kind.as_str(), "name": name}))
        }
        PluginError::Invocation { message, detail } => {
            let descriptor = ErrorDescriptor::new("invocation_error", message.clone());
            match detail {
                Some(context) => descriptor.with_detail(context.clone()),
                None => descriptor,
            }
        }
        PluginError::Transaction { .. } => {
            ErrorDescriptor::new("transaction_error", error.to_string())
        }
        // Registration-time failure; only reachable through dispatch if an
        // invoked plugin mutates a registry, which the API forbids.
        PluginError::Duplicate { .. } => {
            ErrorDescriptor::new("internal_error", error.to_string())
        }
    }
}
