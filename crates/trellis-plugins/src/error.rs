//! Domain errors raised by registry lookups and plugin invocations.

use serde_json::Value;
use thiserror::Error;

use crate::kind::PluginKind;

/// Errors arising from plugin registration, resolution, and invocation.
#[derive(Debug, Error)]
pub enum PluginError {
    /// No plugin is registered under the requested key.
    #[error("{kind} plugin '{name}' not found in registry")]
    NotFound {
        /// Kind namespace that was searched.
        kind: PluginKind,
        /// Name that was looked up.
        name: String,
    },

    /// A plugin is already registered under the same key.
    #[error("{kind} plugin '{name}' is already registered")]
    Duplicate {
        /// Kind namespace of the collision.
        kind: PluginKind,
        /// Colliding name.
        name: String,
    },

    /// The invoked plugin reported a failure.
    #[error("plugin invocation failed: {message}")]
    Invocation {
        /// Failure description supplied by the plugin.
        message: String,
        /// Optional structured context supplied by the plugin.
        detail: Option<Value>,
    },

    /// The transactional engine failed while serving a hook.
    #[error("transaction failed: {message}")]
    Transaction {
        /// Description of the engine failure.
        message: String,
    },
}

impl PluginError {
    /// Creates a not-found error for the given key.
    pub fn not_found(kind: PluginKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a duplicate-registration error for the given key.
    pub fn duplicate(kind: PluginKind, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            name: name.into(),
        }
    }

    /// Creates an invocation failure without structured context.
    pub fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation {
            message: message.into(),
            detail: None,
        }
    }

    /// Creates an invocation failure carrying structured context.
    pub fn invocation_with_detail(message: impl Into<String>, detail: Value) -> Self {
        Self::Invocation {
            message: message.into(),
            detail: Some(detail),
        }
    }

    /// Creates a transaction failure.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_kind_and_plugin() {
        let error = PluginError::not_found(PluginKind::Op, "greet");
        assert_eq!(error.to_string(), "op plugin 'greet' not found in registry");
    }

    #[test]
    fn invocation_detail_is_preserved() {
        let error = PluginError::invocation_with_detail("boom", serde_json::json!({"at": 3}));
        let PluginError::Invocation { detail, .. } = error else {
            panic!("expected invocation error");
        };
        assert_eq!(detail, Some(serde_json::json!({"at": 3})));
    }
}
