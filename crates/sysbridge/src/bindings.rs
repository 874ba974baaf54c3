//! Native callbacks exposed to the host: `init`, `log`, `setMask`, `close`.
//!
//! Each callback decodes its arguments through the compatibility layer,
//! runs the operation against the module's [`Channel`], and leaves through
//! exactly one exit of its [`ReturnableHandleScope`].

use std::rc::Rc;

use sysbridge_compat::{
    ArgumentType, FunctionCallback, Local, Persistent, ReturnType, ReturnableHandleScope, kind,
    low_memory_notification, register_callable,
};
use sysbridge_host::{External, Isolate, Object, Value};
use tracing::debug;

use crate::channel::Channel;
use crate::error::{BridgeError, BridgeResult};
use crate::mask::SeverityMask;
use crate::request::{LogRequest, copy_message};

/// Names and callbacks registered on the module's target object.
pub const OPERATIONS: [(&str, FunctionCallback); 4] = [
    ("init", init),
    ("log", log),
    ("setMask", set_mask),
    ("close", close),
];

/// Expose the four operations on `target`, all sharing `channel`.
pub fn register(isolate: &Isolate, target: &Object, channel: Rc<Channel>) {
    let data = Value::External(External::new(channel));
    for (name, callback) in OPERATIONS {
        register_callable(isolate, target, name, callback, data.clone());
    }
}

fn channel_of(scope: &ReturnableHandleScope<'_>) -> BridgeResult<Rc<Channel>> {
    scope
        .data()
        .as_external()
        .and_then(External::downcast::<Channel>)
        .ok_or_else(|| BridgeError::State("module state is missing".to_owned()))
}

fn finish(
    scope: ReturnableHandleScope<'_>,
    operation: &str,
    result: BridgeResult<Value>,
) -> ReturnType {
    match result {
        Ok(value) => scope.ret_value(value),
        Err(error) => {
            debug!(operation, code = error.code(), %error, "operation failed");
            scope.throw(error.to_exception())
        },
    }
}

fn init(args: &ArgumentType) -> ReturnType {
    let scope = ReturnableHandleScope::new(args);
    let result = channel_of(&scope).and_then(|channel| init_channel(&scope, &channel));
    finish(scope, "init", result)
}

fn init_channel(scope: &ReturnableHandleScope<'_>, channel: &Channel) -> BridgeResult<Value> {
    let raw = scope.arg(0);
    let Some(raw) = raw.as_str() else {
        return Err(BridgeError::Argument(
            "must give daemon name string as argument".to_owned(),
        ));
    };
    if scope.len() < 3 {
        return Err(BridgeError::Argument(
            "must have at least 3 params as argument".to_owned(),
        ));
    }
    let name = channel.daemon_name_from(raw)?;
    let option = scope.arg(1).to_int32();
    let facility = scope.arg(2).to_int32();
    channel.open(name, option, facility);
    Ok(Value::Undefined)
}

fn log(args: &ArgumentType) -> ReturnType {
    let scope = ReturnableHandleScope::new(args);
    let result = channel_of(&scope).and_then(|channel| log_message(&scope, &channel));
    finish(scope, "log", result)
}

fn log_message(scope: &ReturnableHandleScope<'_>, channel: &Channel) -> BridgeResult<Value> {
    channel.ensure_open("log")?;
    let callback = scope.arg(3);
    if !callback.is_function() {
        return Err(BridgeError::Argument(
            "log requires a completion callback function as fourth argument".to_owned(),
        ));
    }

    let isolate = scope.isolate();
    let priority = scope.arg(0).to_int32();
    let message = copy_message(&scope.arg(1).to_display_string())
        .map_err(|error| memory_exhausted(isolate, error))?;

    let callback: Local<kind::Function> = isolate.local(callback);
    let request = LogRequest::new(
        channel.next_request_id(),
        priority,
        message,
        Persistent::new(isolate, callback),
    );
    debug!(id = request.id(), priority, "log request accepted");
    channel.submit(isolate, request)?;
    Ok(Value::Undefined)
}

/// Tell the host memory is short before surfacing an allocation failure.
fn memory_exhausted(isolate: &Isolate, error: BridgeError) -> BridgeError {
    if matches!(error, BridgeError::Resource(_)) {
        low_memory_notification(isolate);
    }
    error
}

fn set_mask(args: &ArgumentType) -> ReturnType {
    let scope = ReturnableHandleScope::new(args);
    let result = channel_of(&scope).and_then(|channel| set_channel_mask(&scope, &channel));
    finish(scope, "setMask", result)
}

fn set_channel_mask(scope: &ReturnableHandleScope<'_>, channel: &Channel) -> BridgeResult<Value> {
    if scope.is_empty() {
        return Err(BridgeError::Argument("you must provide a mask".to_owned()));
    }
    let level = scope.arg(0);
    if !level.is_number() {
        return Err(BridgeError::Type(
            "first parameter (mask) should be numeric".to_owned(),
        ));
    }
    let up_to = if scope.len() >= 2 {
        let up_to = scope.arg(1);
        if !up_to.is_boolean() {
            return Err(BridgeError::Type(
                "second parameter (upTo) should be boolean".to_owned(),
            ));
        }
        up_to.to_boolean()
    } else {
        false
    };

    let level = level.to_int32();
    let mask = if up_to {
        SeverityMask::up_to(level)?
    } else {
        SeverityMask::exactly(level)?
    };
    channel.set_mask(mask).map(Value::Integer)
}

fn close(args: &ArgumentType) -> ReturnType {
    let scope = ReturnableHandleScope::new(args);
    let result = channel_of(&scope).map(|channel| {
        channel.close();
        Value::Undefined
    });
    finish(scope, "close", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingSyslog;
    use crate::config::BridgeConfig;
    use std::sync::Arc;

    fn module() -> (Isolate, Object, Arc<RecordingSyslog>) {
        let isolate = Isolate::new().unwrap();
        let backend = Arc::new(RecordingSyslog::new());
        let channel = Channel::new(BridgeConfig::default(), backend.clone()).unwrap();
        let target = Object::new();
        register(&isolate, &target, Rc::new(channel));
        (isolate, target, backend)
    }

    fn code_of(error: &Value) -> Option<String> {
        error
            .as_object()
            .and_then(|object| object.get("code").as_str().map(str::to_owned))
    }

    #[test]
    fn registers_all_four_operations() {
        let (_isolate, target, _) = module();
        assert_eq!(target.keys(), vec!["close", "init", "log", "setMask"]);
        for key in target.keys() {
            assert!(target.get(&key).as_function().unwrap().is_native());
        }
    }

    #[test]
    fn callbacks_without_module_data_fail_with_state_error() {
        let isolate = Isolate::new().unwrap();
        let target = Object::new();
        register_callable(&isolate, &target, "close", close, Value::Undefined);
        let err = isolate.call_function(&target.get("close"), &[]).unwrap_err();
        assert_eq!(code_of(&err).as_deref(), Some("ERR_STATE"));
    }

    #[test]
    fn memory_exhaustion_notifies_the_host() {
        let isolate = Isolate::new().unwrap();
        let error = memory_exhausted(&isolate, BridgeError::Resource("oom".into()));
        assert!(matches!(error, BridgeError::Resource(_)));
        assert_eq!(isolate.low_memory_notifications(), 1);

        let error = memory_exhausted(&isolate, BridgeError::Argument("bad".into()));
        assert!(matches!(error, BridgeError::Argument(_)));
        assert_eq!(isolate.low_memory_notifications(), 1);
    }

    #[test]
    fn set_mask_validates_before_touching_state() {
        let (isolate, target, backend) = module();
        let set_mask = target.get("setMask");
        let init = target.get("init");

        let err = isolate.call_function(&set_mask, &[]).unwrap_err();
        assert_eq!(code_of(&err).as_deref(), Some("ERR_ARGUMENT"));
        let err = isolate
            .call_function(&set_mask, &[Value::string("5")])
            .unwrap_err();
        assert_eq!(code_of(&err).as_deref(), Some("ERR_TYPE"));

        isolate
            .call_function(&init, &[Value::string("app"), Value::Integer(0), Value::Integer(8)])
            .unwrap();
        let err = isolate
            .call_function(&set_mask, &[Value::Integer(5), Value::Integer(1)])
            .unwrap_err();
        assert_eq!(code_of(&err).as_deref(), Some("ERR_TYPE"));
        let err = isolate
            .call_function(&set_mask, &[Value::Integer(9)])
            .unwrap_err();
        assert_eq!(code_of(&err).as_deref(), Some("ERR_ARGUMENT"));
        assert_eq!(backend.mask(), RecordingSyslog::INITIAL_MASK);
    }

    #[test]
    fn set_mask_false_selects_exactly_one_level() {
        let (isolate, target, backend) = module();
        isolate
            .call_function(
                &target.get("init"),
                &[Value::string("app"), Value::Integer(0), Value::Integer(8)],
            )
            .unwrap();
        isolate
            .call_function(
                &target.get("setMask"),
                &[Value::Integer(4), Value::Boolean(false)],
            )
            .unwrap();
        assert_eq!(backend.mask(), 0b1_0000);
    }
}
