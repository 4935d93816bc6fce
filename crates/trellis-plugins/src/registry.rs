//! Plugin registry for invocable storage, lookup, and the manifest.
//!
//! The registry keeps one namespace per plugin kind. Lookups resolve the
//! invocable for a `(kind, name)` pair; hooks use `(name, record_type)`
//! because the same hook name can be registered against several record
//! types. Duplicate registrations for the same key are rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::invocable::{ActionProvider, Handler, OpFunction, RecordHook, TimerTask};
use crate::kind::PluginKind;

/// One `(kind, name)` pair in the registry manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
pub struct ManifestEntry {
    /// Kind namespace of the entry.
    pub kind: PluginKind,
    /// Registered plugin name.
    pub name: String,
    /// Record type the entry is bound to; hooks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

impl ManifestEntry {
    fn new(kind: PluginKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            record_type: None,
        }
    }

    fn for_hook(name: &str, record_type: &str) -> Self {
        Self {
            kind: PluginKind::Hook,
            name: name.to_owned(),
            record_type: Some(record_type.to_owned()),
        }
    }
}

/// Hook registrations are keyed by name and record type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct HookKey {
    name: String,
    record_type: String,
}

/// Registry of invocable plugin objects, one namespace per kind.
#[derive(Default)]
pub struct PluginRegistry {
    ops: BTreeMap<String, Box<dyn OpFunction>>,
    handlers: BTreeMap<String, Box<dyn Handler>>,
    hooks: BTreeMap<HookKey, Box<dyn RecordHook>>,
    timers: BTreeMap<String, Box<dyn TimerTask>>,
    providers: BTreeMap<String, Box<dyn ActionProvider>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an `op` function under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Duplicate`] when `name` is already taken.
    pub fn register_op(
        &mut self,
        name: impl Into<String>,
        op: impl OpFunction + 'static,
    ) -> Result<(), PluginError> {
        let name = name.into();
        if self.ops.contains_key(&name) {
            return Err(PluginError::duplicate(PluginKind::Op, name));
        }
        self.ops.insert(name, Box::new(op));
        Ok(())
    }

    /// Registers a `handler` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Duplicate`] when `name` is already taken.
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Result<(), PluginError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(PluginError::duplicate(PluginKind::Handler, name));
        }
        self.handlers.insert(name, Box::new(handler));
        Ok(())
    }

    /// Registers a `hook` under `name` for records of `record_type`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Duplicate`] when the `(name, record_type)`
    /// pair is already taken.
    pub fn register_hook(
        &mut self,
        name: impl Into<String>,
        record_type: impl Into<String>,
        hook: impl RecordHook + 'static,
    ) -> Result<(), PluginError> {
        let key = HookKey {
            name: name.into(),
            record_type: record_type.into(),
        };
        if self.hooks.contains_key(&key) {
            return Err(PluginError::duplicate(PluginKind::Hook, key.name));
        }
        self.hooks.insert(key, Box::new(hook));
        Ok(())
    }

    /// Registers a `timer` task under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Duplicate`] when `name` is already taken.
    pub fn register_timer(
        &mut self,
        name: impl Into<String>,
        timer: impl TimerTask + 'static,
    ) -> Result<(), PluginError> {
        let name = name.into();
        if self.timers.contains_key(&name) {
            return Err(PluginError::duplicate(PluginKind::Timer, name));
        }
        self.timers.insert(name, Box::new(timer));
        Ok(())
    }

    /// Registers a `provider` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Duplicate`] when `name` is already taken.
    pub fn register_provider(
        &mut self,
        name: impl Into<String>,
        provider: impl ActionProvider + 'static,
    ) -> Result<(), PluginError> {
        let name = name.into();
        if self.providers.contains_key(&name) {
            return Err(PluginError::duplicate(PluginKind::Provider, name));
        }
        self.providers.insert(name, Box::new(provider));
        Ok(())
    }

    /// Resolves an `op` function by name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when no `op` uses `name`.
    pub fn op(&self, name: &str) -> Result<&dyn OpFunction, PluginError> {
        self.ops
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| PluginError::not_found(PluginKind::Op, name))
    }

    /// Resolves a `handler` by name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when no `handler` uses `name`.
    pub fn handler(&self, name: &str) -> Result<&dyn Handler, PluginError> {
        self.handlers
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| PluginError::not_found(PluginKind::Handler, name))
    }

    /// Resolves a `hook` by name and record type.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when the pair is unregistered.
    pub fn hook(&self, name: &str, record_type: &str) -> Result<&dyn RecordHook, PluginError> {
        let key = HookKey {
            name: name.to_owned(),
            record_type: record_type.to_owned(),
        };
        self.hooks
            .get(&key)
            .map(AsRef::as_ref)
            .ok_or_else(|| PluginError::not_found(PluginKind::Hook, name))
    }

    /// Resolves a `timer` task by name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when no `timer` uses `name`.
    pub fn timer(&self, name: &str) -> Result<&dyn TimerTask, PluginError> {
        self.timers
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| PluginError::not_found(PluginKind::Timer, name))
    }

    /// Resolves a `provider` by name.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] when no `provider` uses `name`.
    pub fn provider(&self, name: &str) -> Result<&dyn ActionProvider, PluginError> {
        self.providers
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| PluginError::not_found(PluginKind::Provider, name))
    }

    /// Enumerates every registered `(kind, name)` pair in kind order.
    #[must_use]
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        let mut entries = Vec::with_capacity(self.len());
        entries.extend(
            self.ops
                .keys()
                .map(|name| ManifestEntry::new(PluginKind::Op, name)),
        );
        entries.extend(
            self.handlers
                .keys()
                .map(|name| ManifestEntry::new(PluginKind::Handler, name)),
        );
        entries.extend(
            self.hooks
                .keys()
                .map(|key| ManifestEntry::for_hook(&key.name, &key.record_type)),
        );
        entries.extend(
            self.timers
                .keys()
                .map(|name| ManifestEntry::new(PluginKind::Timer, name)),
        );
        entries.extend(
            self.providers
                .keys()
                .map(|name| ManifestEntry::new(PluginKind::Provider, name)),
        );
        entries.sort();
        entries
    }

    /// Number of registered plugins across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
            + self.handlers.len()
            + self.hooks.len()
            + self.timers.len()
            + self.providers.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PluginRegistry")
            .field("ops", &self.ops.len())
            .field("handlers", &self.handlers.len())
            .field("hooks", &self.hooks.len())
            .field("timers", &self.timers.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use trellis_protocol::Record;

    use crate::args::CallArgs;
    use crate::error::PluginError;
    use crate::transaction::PluginTransaction;

    use super::*;

    fn noop_hook(
        _record: &mut Record,
        _original: Option<&Record>,
        _tx: &mut dyn PluginTransaction,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    fn sample_registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry
            .register_op("math:add", |args: CallArgs| -> Result<Value, PluginError> { Ok(json!(args.len())) })
            .expect("register op");
        registry
            .register_handler("sendEmail", || -> Result<Value, PluginError> { Ok(json!("ok")) })
            .expect("register handler");
        registry
            .register_hook("audit", "Note", noop_hook)
            .expect("register hook");
        registry
            .register_provider("oauth", |_: &str, _: &Value| -> Result<Value, PluginError> { Ok(json!(true)) })
            .expect("register provider");
        registry
    }

    #[test]
    fn resolves_registered_plugins() {
        let registry = sample_registry();
        assert!(registry.op("math:add").is_ok());
        assert!(registry.handler("sendEmail").is_ok());
        assert!(registry.hook("audit", "Note").is_ok());
        assert!(registry.provider("oauth").is_ok());
    }

    #[test]
    fn missing_lookup_reports_not_found() {
        let registry = sample_registry();
        let Err(error) = registry.op("missing") else {
            panic!("op should be missing");
        };
        assert!(matches!(
            error,
            PluginError::NotFound {
                kind: PluginKind::Op,
                ..
            }
        ));
    }

    #[test]
    fn hook_resolution_is_record_type_scoped() {
        let registry = sample_registry();
        let Err(error) = registry.hook("audit", "Task") else {
            panic!("hook is only bound to Note");
        };
        assert!(matches!(error, PluginError::NotFound { .. }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = sample_registry();
        let error = registry
            .register_handler("sendEmail", || -> Result<Value, PluginError> { Ok(json!("again")) })
            .expect_err("duplicate handler");
        assert!(matches!(
            error,
            PluginError::Duplicate {
                kind: PluginKind::Handler,
                ..
            }
        ));
    }

    #[test]
    fn same_hook_name_can_bind_multiple_record_types() {
        let mut registry = sample_registry();
        registry
            .register_hook("audit", "Task", noop_hook)
            .expect("second record type binds");
        assert!(registry.hook("audit", "Task").is_ok());
    }

    #[test]
    fn manifest_enumerates_sorted_pairs() {
        let registry = sample_registry();
        let manifest = registry.manifest();
        assert_eq!(manifest.len(), 4);
        assert_eq!(
            manifest[0],
            ManifestEntry {
                kind: PluginKind::Op,
                name: "math:add".to_owned(),
                record_type: None,
            }
        );
        assert!(manifest.iter().any(|entry| {
            entry.kind == PluginKind::Hook && entry.record_type.as_deref() == Some("Note")
        }));
        let mut sorted = manifest.clone();
        sorted.sort();
        assert_eq!(manifest, sorted);
    }

    #[test]
    fn manifest_serializes_kind_tags() {
        let registry = sample_registry();
        let value = serde_json::to_value(registry.manifest()).expect("serialize manifest");
        let entries = value.as_array().expect("manifest array");
        assert!(entries.iter().any(|entry| entry["kind"] == "handler"
            && entry["name"] == "sendEmail"));
    }
}
