//! Bindings onto the legacy API generation.
//!
//! The legacy API works on the isolate entered on the current thread, so
//! every adapter that is handed an explicit isolate enters it for the
//! duration of the call.

use sysbridge_host::legacy::{self, Arguments, FunctionTemplate};
use sysbridge_host::{Isolate, Local, Object, Value, kind};

/// Name of the API generation this build targets.
pub const API_GENERATION: &str = "legacy";

/// What a native callback receives.
pub type ArgumentType = Arguments;
/// What a native callback returns: the handle holding its result.
pub type ReturnType = legacy::Handle;
/// Native callback signature.
pub type FunctionCallback = legacy::InvocationCallback;

fn entered<R>(isolate: &Isolate, f: impl FnOnce() -> R) -> R {
    let _entered = isolate.enter();
    f()
}

/// A boolean handle in the current scope.
#[must_use]
pub fn new_boolean(isolate: &Isolate, value: bool) -> Local<kind::Boolean> {
    entered(isolate, || legacy::Boolean::new(value))
}

/// An integer handle in the current scope.
#[must_use]
pub fn new_integer(isolate: &Isolate, value: i32) -> Local<kind::Integer> {
    entered(isolate, || legacy::Integer::new(value))
}

/// A string handle holding a copy of `value`.
#[must_use]
pub fn new_string(isolate: &Isolate, value: &str) -> Local<kind::String> {
    entered(isolate, || legacy::String::new(value))
}

/// The `undefined` handle.
#[must_use]
pub fn undefined(isolate: &Isolate) -> Local {
    entered(isolate, legacy::undefined)
}

/// A handle scope; every handle created while it is alive is released when
/// it drops.
pub struct HandleScope<'i> {
    _inner: legacy::HandleScope,
    _isolate: std::marker::PhantomData<&'i Isolate>,
}

/// Open a handle scope on `isolate`.
#[must_use]
pub fn new_scope(isolate: &Isolate) -> HandleScope<'_> {
    HandleScope {
        _inner: entered(isolate, legacy::HandleScope::new),
        _isolate: std::marker::PhantomData,
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
    entered(isolate, || {
        let _scope = legacy::HandleScope::new();
        let template = FunctionTemplate::new(callback, isolate.local(data));
        target.set(name, isolate.value(template.get_function()));
    });
}

/// Ask the host to reclaim memory now.
pub fn low_memory_notification(isolate: &Isolate) {
    entered(isolate, legacy::low_memory_notification);
}

/// A handle scope bound to one native call. Every way out of the call goes
/// through one of its consuming exits, which escape the result handle.
pub struct ReturnableHandleScope<'a> {
    args: &'a Arguments,
    isolate: Isolate,
    scope: legacy::HandleScope,
}

impl<'a> ReturnableHandleScope<'a> {
    /// Open the scope for the call described by `args`.
    #[must_use]
    pub fn new(args: &'a ArgumentType) -> Self {
        Self {
            args,
            isolate: legacy::current_isolate(),
            scope: legacy::HandleScope::new(),
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
        self.isolate.value(self.args.get(index))
    }

    /// Isolate the call runs in.
    #[must_use]
    pub fn isolate(&self) -> &Isolate {
        &self.isolate
    }

    /// Data attached when the callable was registered.
    #[must_use]
    pub fn data(&self) -> Value {
        self.isolate.value(self.args.data())
    }

    /// Return `undefined`.
    #[must_use]
    pub fn ret(self) -> ReturnType {
        self.scope.close(legacy::undefined())
    }

    /// Return a boolean.
    #[must_use]
    pub fn ret_bool(self, value: bool) -> ReturnType {
        self.scope.close(legacy::Boolean::new(value).as_any())
    }

    /// Return an integer.
    #[must_use]
    pub fn ret_int(self, value: i32) -> ReturnType {
        self.scope.close(legacy::Integer::new(value).as_any())
    }

    /// Return a copy of `value` as a string.
    #[must_use]
    pub fn ret_str(self, value: &str) -> ReturnType {
        self.scope.close(legacy::String::new(value).as_any())
    }

    /// Return `value` unchanged.
    #[must_use]
    pub fn ret_value(self, value: Value) -> ReturnType {
        let handle = self.isolate.local(value);
        self.scope.close(handle)
    }

    /// Throw `exception` out of the call.
    #[must_use]
    pub fn throw(self, exception: Value) -> ReturnType {
        self.scope.close(legacy::throw_exception(exception))
    }
}
