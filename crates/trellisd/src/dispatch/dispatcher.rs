//! The request dispatcher, core of the daemon.
//!
//! `handle` owns the full request state machine: decode the envelope,
//! short-circuit `init` to the registry manifest, select the calling
//! convention for the declared kind, normalize arguments, invoke the
//! resolved plugin, and assemble the response envelope. Every captured
//! failure becomes an `error` descriptor; nothing escapes as a panic or
//! a missing reply.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use trellis_plugins::{PluginKind, PluginRegistry, TransactionSource};
use trellis_protocol::{Record, RecordId, RequestEnvelope, ResponseEnvelope};

use super::args::normalize_args;
use super::errors::DispatchError;
use super::DISPATCH_TARGET;

/// Request kind that bypasses resolution and returns the manifest.
const INIT_KIND: &str = "init";

/// Emergency frame used when response encoding itself fails.
const INTERNAL_ERROR_FRAME: &[u8] =
    br#"{"error":{"type":"internal_error","message":"failed to encode response"}}"#;

/// Stateless per-request dispatcher over an injected registry and engine.
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    engine: Arc<dyn TransactionSource>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given collaborators.
    #[must_use]
    pub fn new(registry: Arc<PluginRegistry>, engine: Arc<dyn TransactionSource>) -> Self {
        Self { registry, engine }
    }

    /// Handles one raw request frame, returning exactly one response frame.
    ///
    /// This method never fails outward: decode faults answer with a
    /// `malformed_request` envelope, captured dispatch failures answer
    /// with their descriptor, and an encoding fault falls back to a
    /// static `internal_error` frame.
    #[must_use]
    pub fn handle(&self, raw: &[u8]) -> Vec<u8> {
        let response = match RequestEnvelope::decode(raw) {
            Ok(request) => self.respond(&request),
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "undecodable request frame");
                ResponseEnvelope::error(DispatchError::from(error).descriptor())
            }
        };

        match response.encode() {
            Ok(frame) => frame,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to encode response");
                INTERNAL_ERROR_FRAME.to_vec()
            }
        }
    }

    /// Produces the response envelope for a decoded request.
    fn respond(&self, request: &RequestEnvelope) -> ResponseEnvelope {
        match self.invoke(request) {
            Ok(result) => ResponseEnvelope::result(result),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    kind = %request.kind,
                    name = request.name.as_deref().unwrap_or(""),
                    %error,
                    "dispatch failed"
                );
                ResponseEnvelope::error(error.descriptor())
            }
        }
    }

    /// Resolves and invokes the plugin named by the request.
    fn invoke(&self, request: &RequestEnvelope) -> Result<Value, DispatchError> {
        if request.kind == INIT_KIND {
            return self.manifest();
        }

        let kind = PluginKind::parse(&request.kind)
            .ok_or_else(|| DispatchError::unknown_kind(&request.kind))?;
        let name = request
            .name
            .as_deref()
            .ok_or_else(|| DispatchError::missing_name(&request.kind))?;
        let empty = Value::Object(Map::new());
        let param = request.param.as_ref().unwrap_or(&empty);

        debug!(
            target: DISPATCH_TARGET,
            kind = %kind,
            name,
            "dispatching request"
        );

        match kind {
            PluginKind::Op => self.invoke_op(name, param),
            PluginKind::Handler => Ok(self.registry.handler(name)?.handle()?),
            PluginKind::Hook => self.invoke_hook(name, param),
            PluginKind::Timer => Ok(self.registry.timer(name)?.fire()?),
            PluginKind::Provider => self.invoke_provider(name, param),
        }
    }

    /// `init` bypasses the registry lookup and returns the manifest.
    fn manifest(&self) -> Result<Value, DispatchError> {
        serde_json::to_value(self.registry.manifest())
            .map_err(|error| trellis_protocol::CodecError::EncodeResponse(error).into())
    }

    /// `op`: normalize `param.args` and call the resolved function.
    fn invoke_op(&self, name: &str, param: &Value) -> Result<Value, DispatchError> {
        let args = normalize_args(param.get("args"))?;
        let op = self.registry.op(name)?;
        Ok(op.call(args)?)
    }

    /// `hook`: derive the record type, decode the records, and run the
    /// hook inside a scoped transaction. The mutated record becomes the
    /// result.
    fn invoke_hook(&self, name: &str, param: &Value) -> Result<Value, DispatchError> {
        let record_value = param.get("record").ok_or_else(|| {
            trellis_protocol::CodecError::malformed_record("hook request is missing 'param.record'")
        })?;
        let raw_id = match record_value.get("_id") {
            Some(Value::String(raw)) => raw,
            Some(_) => {
                return Err(trellis_protocol::CodecError::malformed_record(
                    "record '_id' must be a string",
                )
                .into());
            }
            None => {
                return Err(trellis_protocol::CodecError::malformed_record(
                    "record is missing the '_id' field",
                )
                .into());
            }
        };
        let record_type = RecordId::parse(raw_id)?.record_type().to_owned();

        let hook = self.registry.hook(name, &record_type)?;
        let original = Record::from_value_or_none(param.get("original"))?;
        let mut record = Record::from_value(record_value)?;

        self.engine
            .with_transaction(&mut |tx| hook.on_record(&mut record, original.as_ref(), tx))?;

        Ok(record.to_value())
    }

    /// `provider`: extract the action tag and call the provider's action
    /// entry point with the full `param` payload.
    fn invoke_provider(&self, name: &str, param: &Value) -> Result<Value, DispatchError> {
        let action = param
            .get("action")
            .and_then(Value::as_str)
            .ok_or(DispatchError::MissingAction)?;
        let provider = self.registry.provider(name)?;
        Ok(provider.handle_action(action, param)?)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
