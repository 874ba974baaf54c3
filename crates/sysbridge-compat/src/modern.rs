//! Bindings onto the modern API generation.

use sysbridge_host::modern::{self, FunctionCallbackInfo, FunctionTemplate};
use sysbridge_host::{Isolate, Local, Object, Value, kind};

/// Name of the API generation this build targets.
pub const API_GENERATION: &str = "modern";

/// What a native callback receives.
pub type ArgumentType = FunctionCallbackInfo;
/// What a native callback returns; the result travels through the slot.
pub type ReturnType = ();
/// Native callback signature.
pub type FunctionCallback = modern::FunctionCallback;

/// A boolean handle in the current scope.
#[must_use]
pub fn new_boolean(isolate: &Isolate, value: bool) -> Local<kind::Boolean> {
    modern::Boolean::new(isolate, value)
}

/// An integer handle in the current scope.
#[must_use]
pub fn new_integer(isolate: &Isolate, value: i32) -> Local<kind::Integer> {
    modern::Integer::new(isolate, value)
}

/// A string handle holding a copy of `value`.
#[must_use]
pub fn new_string(isolate: &Isolate, value: &str) -> Local<kind::String> {
    modern::String::new_from_utf8(isolate, value)
}

/// The `undefined` handle.
#[must_use]
pub fn undefined(isolate: &Isolate) -> Local {
    modern::undefined(isolate)
}

/// A handle scope; every handle created while it is alive is released when
/// it drops.
pub struct HandleScope<'i> {
    _inner: modern::HandleScope<'i>,
}

/// Open a handle scope on `isolate`.
#[must_use]
pub fn new_scope(isolate: &Isolate) -> HandleScope<'_> {
    HandleScope {
        _inner: modern::HandleScope::new(isolate),
    }
}

/// Expose `callback` as `name` on `target`, with `data` handed back to every
/// invocation.
pub fn register_callable(
    isolate: &Isolate,
    target: &Object,
    name: &str,
    callback: FunctionCallback,
    data: Value,
) {
    let _scope = modern::HandleScope::new(isolate);
    let template = FunctionTemplate::new(isolate, callback, isolate.local(data));
    target.set(name, isolate.value(template.get_function(isolate)));
}

/// Ask the host to reclaim memory now.
pub fn low_memory_notification(isolate: &Isolate) {
    isolate.low_memory_notification();
}

/// A handle scope bound to one native call. Every way out of the call goes
/// through one of its consuming exits.
pub struct ReturnableHandleScope<'a> {
    args: &'a FunctionCallbackInfo,
    _scope: modern::HandleScope<'a>,
}

impl<'a> ReturnableHandleScope<'a> {
    /// Open the scope for the call described by `args`.
    #[must_use]
    pub fn new(args: &'a ArgumentType) -> Self {
        Self {
            args,
            _scope: modern::HandleScope::new(args.get_isolate()),
        }
    }

    /// Number of arguments passed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.length()
    }

    /// Whether the call had no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Argument `index`; `undefined` when absent.
    #[must_use]
    pub fn arg(&self, index: usize) -> Value {
        self.isolate().value(self.args.get(index))
    }

    /// Isolate the call runs in.
    #[must_use]
    pub fn isolate(&self) -> &Isolate {
        self.args.get_isolate()
    }

    /// Data attached when the callable was registered.
    #[must_use]
    pub fn data(&self) -> Value {
        self.isolate().value(self.args.data())
    }

    /// Return `undefined`.
    pub fn ret(self) -> ReturnType {
        self.args.get_return_value().set_undefined();
    }

    /// Return a boolean.
    pub fn ret_bool(self, value: bool) -> ReturnType {
        self.args.get_return_value().set_bool(value);
    }

    /// Return an integer.
    pub fn ret_int(self, value: i32) -> ReturnType {
        self.args.get_return_value().set_int32(value);
    }

    /// Return a copy of `value` as a string.
    pub fn ret_str(self, value: &str) -> ReturnType {
        let handle = modern::String::new_from_utf8(self.isolate(), value);
        self.args.get_return_value().set(handle);
    }

    /// Return `value` unchanged.
    pub fn ret_value(self, value: Value) -> ReturnType {
        let handle: Local = self.isolate().local(value);
        self.args.get_return_value().set(handle);
    }

    /// Throw `exception` out of the call.
    pub fn throw(self, exception: Value) -> ReturnType {
        let _ = self.isolate().throw_exception(exception);
    }
}
