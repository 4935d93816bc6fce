//! Argument-shape normalization for `op` requests.

use serde_json::Value;

use trellis_plugins::CallArgs;

use super::errors::DispatchError;

/// Normalizes an `op` request's `param.args` payload.
///
/// The shape is decided exactly once here: arrays become positional
/// arguments, objects become keyword arguments, and an absent value
/// defaults to empty keyword arguments. Anything else is a client error
/// naming the offending JSON type.
///
/// # Errors
///
/// Returns [`DispatchError::UnsupportedArgs`] for scalar shapes.
pub fn normalize_args(args: Option<&Value>) -> Result<CallArgs, DispatchError> {
    match args {
        None => Ok(CallArgs::empty()),
        Some(Value::Array(values)) => Ok(CallArgs::Positional(values.clone())),
        Some(Value::Object(values)) => Ok(CallArgs::Keyword(values.clone())),
        Some(other) => Err(DispatchError::UnsupportedArgs {
            found: json_type_name(other),
        }),
    }
}

/// Human-readable JSON type name used in error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
