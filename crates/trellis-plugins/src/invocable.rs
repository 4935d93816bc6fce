//! Calling-convention traits implemented by registered plugins.
//!
//! One trait per plugin kind, each mirroring the wire calling convention.
//! Blanket implementations over plain closures keep registration terse;
//! a struct implementing the trait directly works just as well for
//! stateful plugins.

use serde_json::Value;

use crate::args::CallArgs;
use crate::error::PluginError;
use crate::transaction::PluginTransaction;
use trellis_protocol::Record;

/// An `op` function invoked with normalized positional or keyword
/// arguments.
pub trait OpFunction: Send + Sync {
    /// Invokes the function with the extracted arguments.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Invocation`] when the plugin fails.
    fn call(&self, args: CallArgs) -> Result<Value, PluginError>;
}

impl<F> OpFunction for F
where
    F: Fn(CallArgs) -> Result<Value, PluginError> + Send + Sync,
{
    fn call(&self, args: CallArgs) -> Result<Value, PluginError> {
        self(args)
    }
}

/// A `handler` entry invoked with no arguments.
pub trait Handler: Send + Sync {
    /// Invokes the handler.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Invocation`] when the plugin fails.
    fn handle(&self) -> Result<Value, PluginError>;
}

impl<F> Handler for F
where
    F: Fn() -> Result<Value, PluginError> + Send + Sync,
{
    fn handle(&self) -> Result<Value, PluginError> {
        self()
    }
}

/// A `timer` task invoked with no arguments.
pub trait TimerTask: Send + Sync {
    /// Fires the task.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Invocation`] when the plugin fails.
    fn fire(&self) -> Result<Value, PluginError>;
}

impl<F> TimerTask for F
where
    F: Fn() -> Result<Value, PluginError> + Send + Sync,
{
    fn fire(&self) -> Result<Value, PluginError> {
        self()
    }
}

/// A `hook` invoked with the mutable record, the pre-change original, and
/// a scoped transaction.
pub trait RecordHook: Send + Sync {
    /// Invokes the hook; mutations to `record` flow into the response.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Invocation`] when the plugin fails; the
    /// surrounding transaction rolls back in that case.
    fn on_record(
        &self,
        record: &mut Record,
        original: Option<&Record>,
        tx: &mut dyn PluginTransaction,
    ) -> Result<(), PluginError>;
}

impl<F> RecordHook for F
where
    F: Fn(&mut Record, Option<&Record>, &mut dyn PluginTransaction) -> Result<(), PluginError>
        + Send
        + Sync,
{
    fn on_record(
        &self,
        record: &mut Record,
        original: Option<&Record>,
        tx: &mut dyn PluginTransaction,
    ) -> Result<(), PluginError> {
        self(record, original, tx)
    }
}

/// A `provider` with a single action-handling entry point.
pub trait ActionProvider: Send + Sync {
    /// Handles `action` with the full request `param` payload.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Invocation`] when the plugin fails.
    fn handle_action(&self, action: &str, param: &Value) -> Result<Value, PluginError>;
}

impl<F> ActionProvider for F
where
    F: Fn(&str, &Value) -> Result<Value, PluginError> + Send + Sync,
{
    fn handle_action(&self, action: &str, param: &Value) -> Result<Value, PluginError> {
        self(action, param)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn closure_implements_op_function() {
        let op = |args: CallArgs| -> Result<Value, PluginError> { Ok(json!(args.len())) };
        let result = op.call(CallArgs::Positional(vec![json!(1), json!(2)]));
        assert_eq!(result.expect("op succeeds"), json!(2));
    }

    #[test]
    fn closure_implements_handler() {
        let handler = || -> Result<Value, PluginError> { Ok(json!("ok")) };
        assert_eq!(handler.handle().expect("handler succeeds"), json!("ok"));
    }

    #[test]
    fn closure_implements_timer_task() {
        let timer = || -> Result<Value, PluginError> { Ok(json!("fired")) };
        assert_eq!(TimerTask::fire(&timer).expect("timer succeeds"), json!("fired"));
    }

    #[test]
    fn closure_implements_action_provider() {
        let provider = |action: &str, param: &Value| -> Result<Value, PluginError> {
            Ok(json!({"action": action, "param": param.clone()}))
        };
        let result = provider
            .handle_action("login", &json!({"action": "login"}))
            .expect("provider succeeds");
        assert_eq!(result["action"], "login");
    }
}
